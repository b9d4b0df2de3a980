//! Templates embedded in the binary
//!
//! Rendered with tera; autoescaping is off as none of the output is html.
use anyhow::{Context as _, Result};
use rust_embed::Embed;

#[derive(Embed)]
#[folder = "src/templates"]
pub struct Templates;

impl Templates {
    pub fn get_template(name: &str) -> Result<String> {
        let file = Self::get(name).with_context(|| format!("Template {name} not found"))?;

        String::from_utf8(file.data.into_owned())
            .with_context(|| format!("Template {name} is not valid utf-8"))
    }

    pub fn render(name: &str, context: &tera::Context) -> Result<String> {
        let template = Self::get_template(name)?;

        tera::Tera::one_off(&template, context, false)
            .with_context(|| format!("Failed to render template {name}"))
    }
}
