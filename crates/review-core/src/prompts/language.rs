//! Report language selection

use serde::{Deserialize, Serialize};
use std::fmt;

/// Language used for prompts and template reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    /// Chinese (Simplified)
    #[default]
    Chinese,
    /// English
    English,
}

impl Language {
    /// Get ISO 639-1 language code
    pub fn code(&self) -> &'static str {
        match self {
            Language::Chinese => "zh",
            Language::English => "en",
        }
    }

    /// Parse from ISO 639-1 code or common name
    ///
    /// Anything unrecognised falls back to Chinese.
    pub fn from_code(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "en" | "english" | "en-us" | "en-gb" => Language::English,
            _ => Language::Chinese,
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}
