use crate::i18n::{LanguageConfig, LanguageRegistry};
use crate::resolver::PathIndex;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;

/// Fallback text for pages without any matching metadata.
///
/// Either one string for every language, or a per-language mapping whose
/// values are a single string or a list to pick from by path hash.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum FallbackText {
    Plain(String),
    PerLanguage(BTreeMap<String, LocalizedText>),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum LocalizedText {
    One(String),
    Many(Vec<String>),
}

impl FallbackText {
    /// Parse an environment value: a JSON object is a per-language mapping,
    /// anything else is used verbatim.
    pub fn parse(raw: &str) -> Result<Self> {
        if raw.trim_start().starts_with('{') {
            serde_json::from_str(raw).context("Failed to parse per-language fallback JSON")
        } else {
            Ok(FallbackText::Plain(raw.to_string()))
        }
    }

    /// Text for `lang`, using the default language's entry when `lang` has
    /// none and an empty string when neither exists.
    pub fn select(&self, lang: &str, default_lang: &str, index: &PathIndex) -> String {
        match self {
            FallbackText::Plain(text) => text.clone(),
            FallbackText::PerLanguage(by_lang) => {
                let entry = by_lang.get(lang).or_else(|| by_lang.get(default_lang));
                match entry {
                    Some(LocalizedText::One(text)) => text.clone(),
                    Some(LocalizedText::Many(options)) if !options.is_empty() => {
                        options[index.pick(options.len())].clone()
                    }
                    _ => String::new(),
                }
            }
        }
    }
}

impl Default for FallbackText {
    fn default() -> Self {
        FallbackText::Plain(String::new())
    }
}

/// Process-wide metadata settings, read-only at request time.
#[derive(Debug, Clone)]
pub struct SeoConfig {
    pub languages: LanguageRegistry,
    pub fallback_title: FallbackText,
    pub fallback_description: FallbackText,
    /// Record fields exposed in resolved metadata.
    pub seo_fields: Vec<String>,
    /// Entity type tags whose lifecycle events keep metadata in sync.
    pub seo_models: Vec<String>,
}

impl SeoConfig {
    pub fn from_env() -> Result<Self> {
        let languages = parse_languages(
            &std::env::var("SEO_LANGUAGES").unwrap_or_else(|_| "en:English".to_string()),
        );
        let default_lang = std::env::var("SEO_DEFAULT_LANG")
            .ok()
            .or_else(|| languages.first().map(|lang| lang.code.clone()))
            .unwrap_or_else(|| "en".to_string());
        let languages = LanguageRegistry::new(languages, &default_lang)
            .context("Invalid SEO_LANGUAGES / SEO_DEFAULT_LANG")?;

        let fallback_title = match std::env::var("SEO_FALLBACK_TITLE") {
            Ok(raw) => FallbackText::parse(&raw).context("Invalid SEO_FALLBACK_TITLE")?,
            Err(_) => FallbackText::default(),
        };
        let fallback_description = match std::env::var("SEO_FALLBACK_DESCRIPTION") {
            Ok(raw) => FallbackText::parse(&raw).context("Invalid SEO_FALLBACK_DESCRIPTION")?,
            Err(_) => FallbackText::default(),
        };

        let seo_fields = std::env::var("SEO_FIELDS")
            .map(|raw| split_list(&raw, ','))
            .unwrap_or_else(|_| vec!["title".to_string(), "description".to_string()]);

        let seo_models = std::env::var("SEO_MODELS")
            .map(|raw| raw.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default();

        Ok(Self {
            languages,
            fallback_title,
            fallback_description,
            seo_fields,
            seo_models,
        })
    }

    pub fn default_lang(&self) -> &str {
        self.languages.default_code()
    }
}

/// Service configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub seo: SeoConfig,

    // Storage
    pub database_path: String,

    // HTTP
    pub port: u16,
    pub api_key: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            seo: SeoConfig::from_env()?,
            database_path: std::env::var("DATABASE_PATH")
                .unwrap_or_else(|_| "data/seo.db".to_string()),
            port: std::env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(8080),
            api_key: std::env::var("API_KEY").ok().filter(|key| !key.is_empty()),
        })
    }
}

/// Parse `code:Name` pairs separated by commas; a bare code is its own name.
fn parse_languages(raw: &str) -> Vec<LanguageConfig> {
    split_list(raw, ',')
        .into_iter()
        .map(|entry| match entry.split_once(':') {
            Some((code, name)) => LanguageConfig::new(code.trim(), name.trim()),
            None => LanguageConfig::new(entry.clone(), entry),
        })
        .collect()
}

fn split_list(raw: &str, separator: char) -> Vec<String> {
    raw.split(separator)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
