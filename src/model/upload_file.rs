use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};

const DATA_URI_PREFIX: &str = "data:image/png;base64,";

/// Binary attachment owned by a single user (profile image).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadFile {
    pub file_name: String,
    pub original_file_name: String,
    pub content_type: String,
    #[serde(with = "serde_bytes")]
    pub content: Vec<u8>,
}

impl UploadFile {
    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    /// Overwrites every field with the incoming upload, keeping no trace of the old file.
    pub fn replace_with(&mut self, incoming: UploadFile) {
        *self = incoming;
    }

    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.content)
    }

    /// Inline `data:` URI for `<img src>`.
    pub fn to_data_uri(&self) -> String {
        let mut uri = String::with_capacity(DATA_URI_PREFIX.len() + self.content.len() * 4 / 3 + 4);
        uri.push_str(DATA_URI_PREFIX);
        uri.push_str(&self.to_base64());
        uri
    }
}
