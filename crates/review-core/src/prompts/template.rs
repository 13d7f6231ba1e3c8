//! Bilingual MiniJinja templates

use super::Language;
use crate::error::Result;
use minijinja::{Environment, UndefinedBehavior};
use serde::Serialize;

/// A named template with a Chinese and an English body
#[derive(Debug, Clone, Copy)]
pub struct BilingualTemplate {
    name: &'static str,
    chinese: &'static str,
    english: &'static str,
}

impl BilingualTemplate {
    /// Create a template from its two bodies
    pub const fn new(name: &'static str, chinese: &'static str, english: &'static str) -> Self {
        Self {
            name,
            chinese,
            english,
        }
    }

    /// Template name, used in error messages
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Raw template body for a language
    pub fn raw(&self, lang: Language) -> &'static str {
        match lang {
            Language::Chinese => self.chinese,
            Language::English => self.english,
        }
    }

    /// Render with the given context
    ///
    /// Undefined variables are an error so a renamed field cannot silently
    /// disappear from a prompt.
    pub fn render<S: Serialize>(&self, lang: Language, context: &S) -> Result<String> {
        let mut env = Environment::new();
        env.set_undefined_behavior(UndefinedBehavior::Strict);
        env.set_keep_trailing_newline(true);
        env.add_template(self.name, self.raw(lang))?;
        let template = env.get_template(self.name)?;
        Ok(template.render(context)?)
    }
}
