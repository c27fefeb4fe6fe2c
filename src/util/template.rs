use axum::response::Html;
use tera::{Context, Tera};
use tracing::error;

use crate::util::error::HandlerError;

const TEMPLATES: [(&str, &str); 7] = [
    ("base.html", include_str!("../templates/base.html")),
    ("login.html", include_str!("../templates/login.html")),
    ("users/_form.html", include_str!("../templates/users/_form.html")),
    ("users/new.html", include_str!("../templates/users/new.html")),
    ("users/edit.html", include_str!("../templates/users/edit.html")),
    ("users/find.html", include_str!("../templates/users/find.html")),
    ("users/show.html", include_str!("../templates/users/show.html")),
];

/// Page templates compiled into the binary.
pub struct Templates {
    tera: Tera,
}

impl Templates {
    pub fn new() -> Result<Self, tera::Error> {
        let mut tera = Tera::default();
        tera.add_raw_templates(TEMPLATES)?;
        Ok(Templates { tera })
    }

    pub fn render(&self, name: &str, context: &Context) -> Result<Html<String>, HandlerError> {
        self.tera.render(name, context).map(Html).map_err(|e| {
            error!("Failed to render template {}: {:?}", name, e);
            HandlerError::internal(format!("Failed to render {}", name))
        })
    }
}
