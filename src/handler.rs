use std::sync::Arc;

use log::debug;

use crate::{
    assets::AssetServer,
    exception::Exception,
    request::Request,
    response::Response,
    template::{RenderContext, TemplateStore},
    util::escape_html,
};

/// Parameters extracted by the router while matching a route.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RouteParams {
    tail: Option<String>,
}

impl RouteParams {
    pub fn with_tail(tail: impl Into<String>) -> Self {
        Self {
            tail: Some(tail.into()),
        }
    }

    /// Remainder of the path after a wildcard route's prefix.
    pub fn tail(&self) -> Option<&str> {
        self.tail.as_deref()
    }
}

/// Produces the response for one matched route.
#[cfg_attr(test, mockall::automock)]
pub trait Handler: Send + Sync {
    fn handle(&self, request: &Request, params: &RouteParams) -> Result<Response, Exception>;
}

/// Renders one template with no variables. Serves `/` and `/form`.
pub struct TemplateHandler {
    store: Arc<TemplateStore>,
    template_id: String,
}

impl TemplateHandler {
    pub fn new(store: Arc<TemplateStore>, template_id: &str) -> Self {
        Self {
            store,
            template_id: template_id.to_string(),
        }
    }
}

impl Handler for TemplateHandler {
    fn handle(&self, request: &Request, _params: &RouteParams) -> Result<Response, Exception> {
        debug!("[ID{}]rendering template {}", request.id(), self.template_id);
        let html = self.store.render(&self.template_id, &RenderContext::new())?;
        Ok(Response::from_html(html))
    }
}

/// Echoes the submitted dinosaur back as a page. Serves `/dino`.
pub struct DinoHandler {
    escape_user_input: bool,
}

impl DinoHandler {
    pub fn new(escape_user_input: bool) -> Self {
        Self { escape_user_input }
    }

    fn field(&self, request: &Request, name: &str) -> String {
        let value = request.query_param_or_empty(name);
        if self.escape_user_input {
            escape_html(value)
        } else {
            value.to_string()
        }
    }

    fn page(image: &str, name: &str, age: &str) -> String {
        format!(
            r#"<!doctype html>
<html>
  <head>
    <title>Meet {name}</title>
    <link rel="stylesheet" href="/static/main.css">
  </head>
  <body>
    <main>
      <img src="/static/images/{image}" alt="dinosaur"/>
      <h1>This is {name}. He's {age} years old.</h1>
      <a href="/form">Create another dinosaur.</a>
    </main>
  </body>
</html>
"#
        )
    }
}

impl Handler for DinoHandler {
    fn handle(&self, request: &Request, _params: &RouteParams) -> Result<Response, Exception> {
        let image = self.field(request, "dino-pic");
        let name = self.field(request, "dino-name");
        let age = self.field(request, "age");
        Ok(Response::from_html(Self::page(&image, &name, &age)))
    }
}

/// Serves files below the asset root. Serves `/static/*path`.
pub struct StaticHandler {
    assets: Arc<AssetServer>,
}

impl StaticHandler {
    pub fn new(assets: Arc<AssetServer>) -> Self {
        Self { assets }
    }
}

impl Handler for StaticHandler {
    fn handle(&self, request: &Request, params: &RouteParams) -> Result<Response, Exception> {
        let relative = params.tail().unwrap_or("");
        let asset = self.assets.load(relative, request.id())?;
        Ok(Response::from_bytes(asset.content, asset.content_type))
    }
}
