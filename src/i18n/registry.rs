//! Language registry: the set of languages metadata is maintained in.
//!
//! Unlike a compiled-in table, the registry is built from configuration so
//! that each deployment decides which languages editors work with. Exactly
//! one language is the default; it backs every lookup that misses in the
//! requested language.

use crate::error::{Result, SeoError};

/// Configuration for a supported language.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageConfig {
    /// ISO 639-1 language code (e.g., "en", "es")
    pub code: String,

    /// Display name of the language (e.g., "English", "Spanish")
    pub name: String,
}

impl LanguageConfig {
    pub fn new(code: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
        }
    }
}

/// Ordered list of configured languages plus the default language code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageRegistry {
    languages: Vec<LanguageConfig>,
    default_code: String,
}

impl LanguageRegistry {
    /// Build a registry, validating that the default language is configured.
    ///
    /// # Errors
    /// `SeoError::Configuration` if `languages` is empty, contains a
    /// duplicate code, or does not contain `default_code`.
    pub fn new(languages: Vec<LanguageConfig>, default_code: &str) -> Result<Self> {
        if languages.is_empty() {
            return Err(SeoError::Configuration(
                "at least one language must be configured".to_string(),
            ));
        }

        for (i, lang) in languages.iter().enumerate() {
            if languages[..i].iter().any(|other| other.code == lang.code) {
                return Err(SeoError::Configuration(format!(
                    "language '{}' is configured twice",
                    lang.code
                )));
            }
        }

        if !languages.iter().any(|lang| lang.code == default_code) {
            return Err(SeoError::Configuration(format!(
                "default language '{}' is not among the configured languages",
                default_code
            )));
        }

        Ok(Self {
            languages,
            default_code: default_code.to_string(),
        })
    }

    /// Get a language configuration by its code.
    pub fn get_by_code(&self, code: &str) -> Option<&LanguageConfig> {
        self.languages.iter().find(|lang| lang.code == code)
    }

    /// All configured languages in configuration order.
    pub fn list(&self) -> &[LanguageConfig] {
        &self.languages
    }

    /// Iterate over the configured language codes.
    pub fn codes(&self) -> impl Iterator<Item = &str> {
        self.languages.iter().map(|lang| lang.code.as_str())
    }

    /// The default language code.
    pub fn default_code(&self) -> &str {
        &self.default_code
    }

    /// Check if a language code is configured.
    pub fn is_supported(&self, code: &str) -> bool {
        self.get_by_code(code).is_some()
    }
}
