//! HTML rendering for controller views

use std::sync::Arc;

use handlebars::Handlebars;
use serde_json::json;

use crate::controller::View;
use crate::error::Result;

/// Page title shown in the browser tab and as the heading.
pub const TITLE: &str = "🔐 Login com Auth0";

const PAGE_TEMPLATE: &str = "page";

/// Compiled page template. Cheap to clone.
#[derive(Clone)]
pub struct Renderer {
    registry: Arc<Handlebars<'static>>,
}

impl Renderer {
    pub fn new() -> Result<Self> {
        let mut registry = Handlebars::new();
        registry.set_strict_mode(false);
        registry
            .register_template_string(PAGE_TEMPLATE, include_str!("../templates/page.hbs"))
            .map_err(Box::new)?;
        Ok(Self {
            registry: Arc::new(registry),
        })
    }

    /// Render a full HTML page for `view`. Interpolated values are HTML-escaped.
    pub fn render(&self, view: &View) -> Result<String> {
        let data = match view {
            View::Login { authorize_url } => json!({
                "title": TITLE,
                "login": { "authorize_url": authorize_url },
            }),
            View::Welcome { user } => json!({
                "title": TITLE,
                "welcome": {
                    "name": user.display_name(),
                    "claims": user.to_pretty_json(),
                },
            }),
            View::Error { message } => json!({
                "title": TITLE,
                "error": { "message": message },
            }),
        };
        Ok(self.registry.render(PAGE_TEMPLATE, &data)?)
    }
}
