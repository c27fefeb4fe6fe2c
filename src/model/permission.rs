use serde::{Deserialize, Serialize};

use crate::model::id::Id;
use crate::model::staff::Staff;

pub const ADMIN_ROLE: &str = "ADMIN";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<Id<Permission>>,
    pub staff_id: Id<Staff>,
    pub role_key: String,
    pub permission_key: String,
    pub permission_name: String,
}
