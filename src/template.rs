//! # Template renderer
//!
//! Templates are plain HTML files with `{{ name }}` placeholders. They are read
//! once at startup into a [`TemplateStore`]; rendering never touches the disk.

use std::{collections::HashMap, fs, path::Path};

use lazy_static::lazy_static;
use log::{debug, error, info};
use regex::{Captures, Regex};

use crate::exception::Exception;

lazy_static! {
    static ref PLACEHOLDER: Regex =
        Regex::new(r"\{\{\s*([A-Za-z_][A-Za-z0-9_-]*)\s*\}\}").unwrap();
}

/// Values substituted into a template during one render call.
#[derive(Debug, Default, Clone)]
pub struct RenderContext {
    values: HashMap<String, String>,
}

impl RenderContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: &str, value: impl Into<String>) {
        self.values.insert(name.to_string(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }
}

#[derive(Debug, Default)]
pub struct TemplateStore {
    templates: HashMap<String, String>,
}

impl TemplateStore {
    /// Read `<dir>/<id>.html` for every id.
    pub fn load(dir: &Path, ids: &[&str]) -> Result<Self, Exception> {
        let mut templates = HashMap::new();
        for id in ids {
            let path = dir.join(format!("{}.html", id));
            match fs::read_to_string(&path) {
                Ok(source) => {
                    debug!("loaded template {} from {}", id, path.display());
                    templates.insert(id.to_string(), source);
                }
                Err(e) => {
                    error!("cannot read template {}: {}", path.display(), e);
                    return Err(Exception::TemplateNotFound);
                }
            }
        }
        info!("{} template(s) loaded from {}", templates.len(), dir.display());
        Ok(Self { templates })
    }

    pub fn from_sources<'a>(sources: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let templates = sources
            .into_iter()
            .map(|(id, source)| (id.to_string(), source.to_string()))
            .collect();
        Self { templates }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.templates.contains_key(id)
    }

    /// Substitute every placeholder in template `id`. Placeholders with no
    /// value in `context` become empty.
    pub fn render(&self, id: &str, context: &RenderContext) -> Result<String, Exception> {
        let source = self.templates.get(id).ok_or(Exception::TemplateNotFound)?;
        let rendered = PLACEHOLDER.replace_all(source, |caps: &Captures| {
            context.get(&caps[1]).unwrap_or("").to_string()
        });
        Ok(rendered.into_owned())
    }
}
