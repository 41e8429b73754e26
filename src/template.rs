//! Placeholder interpolation for metadata templates.
//!
//! Templates contain `{name}` tokens (inner whitespace allowed). Each field
//! value is formatted in two passes, always in this order:
//!
//! 1. tokens naming an attribute path of the bound entity (`{name}`,
//!    `{category.name}`), preferring `<attr>_<lang>` over `<attr>` at every
//!    hop;
//! 2. tokens naming a context key, where positional path captures are
//!    added under `"0"`, `"1"`, ... and values are de-slugified.
//!
//! Unresolved tokens are left verbatim. Nothing here fails: incomplete data
//! must never stop a page from rendering.

use crate::entity::{Entity, FieldValue};
use crate::models::Metadata;
use regex::{Captures, Regex};
use std::collections::BTreeMap;
use std::sync::OnceLock;

static TOKEN_REGEX: OnceLock<Regex> = OnceLock::new();

fn token_regex() -> &'static Regex {
    TOKEN_REGEX.get_or_init(|| Regex::new(r"\{\s*([^\}\s]+)\s*\}").unwrap())
}

/// A dotted attribute path such as `category.name`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldPath {
    steps: Vec<String>,
}

impl FieldPath {
    pub fn parse(expr: &str) -> Self {
        Self {
            steps: expr.split('.').map(str::to_string).collect(),
        }
    }

    /// Walk the path from `entity`.
    ///
    /// Returns `None` when an attribute along the path does not exist, and
    /// an empty string when a hop holds nothing (null, unset relation, empty
    /// collection or empty text).
    pub fn resolve(&self, entity: &dyn Entity, lang: &str) -> Option<String> {
        walk(entity, &self.steps, lang)
    }
}

fn walk(entity: &dyn Entity, steps: &[String], lang: &str) -> Option<String> {
    let (name, rest) = steps.split_first()?;
    let value = entity
        .field(&format!("{}_{}", name, lang))
        .or_else(|| entity.field(name))?;

    let next = match value {
        FieldValue::Null | FieldValue::Related(None) => return Some(String::new()),
        FieldValue::Text(text) if text.is_empty() => return Some(text),
        FieldValue::Text(text) => {
            return if rest.is_empty() { Some(text) } else { None };
        }
        FieldValue::Related(Some(next)) => next,
        FieldValue::Collection(items) => match items.into_iter().next() {
            Some(first) => first,
            None => return Some(String::new()),
        },
    };

    if rest.is_empty() {
        Some(next.display_name())
    } else {
        walk(next.as_ref(), rest, lang)
    }
}

/// Replace tokens naming attribute paths of `entity`.
pub fn format_from_entity(template: &str, entity: &dyn Entity, lang: &str) -> String {
    token_regex()
        .replace_all(template, |caps: &Captures<'_>| {
            FieldPath::parse(&caps[1])
                .resolve(entity, lang)
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

/// Replace tokens naming keys of `context` with their de-slugified values.
pub fn format_from_context(template: &str, context: &BTreeMap<String, String>) -> String {
    if context.is_empty() {
        return template.to_string();
    }
    token_regex()
        .replace_all(template, |caps: &Captures<'_>| match context.get(&caps[1]) {
            Some(value) => deslugify(value),
            None => caps[0].to_string(),
        })
        .into_owned()
}

/// `"red-leather-sofa"` becomes `"Red Leather Sofa"`.
///
/// Hyphens become spaces, then every cased letter that follows an uncased
/// character is uppercased and every other cased letter lowercased.
/// Uncased characters (digits, CJK, ...) start a new word.
pub fn deslugify(value: &str) -> String {
    let mut result = String::with_capacity(value.len());
    let mut previous_is_cased = false;
    for ch in value.chars() {
        let ch = if ch == '-' { ' ' } else { ch };
        if is_cased(ch) {
            if previous_is_cased {
                result.extend(ch.to_lowercase());
            } else {
                result.extend(ch.to_uppercase());
            }
            previous_is_cased = true;
        } else {
            result.push(ch);
            previous_is_cased = false;
        }
    }
    result
}

fn is_cased(ch: char) -> bool {
    ch.is_lowercase() || ch.is_uppercase()
}

/// Format every field of `fields`.
///
/// Entity attributes are consulted only when both an entity and a language
/// are given. Positional captures are exposed to the context pass as
/// `"0"`, `"1"`, ... and take precedence over same-named context keys.
pub fn interpolate(
    fields: &Metadata,
    entity: Option<&dyn Entity>,
    lang: Option<&str>,
    positional: &[String],
    context: &BTreeMap<String, String>,
) -> Metadata {
    let mut merged = context.clone();
    for (index, value) in positional.iter().enumerate() {
        merged.insert(index.to_string(), value.clone());
    }

    fields
        .iter()
        .map(|(key, template)| {
            let from_entity = match (entity, lang) {
                (Some(entity), Some(lang)) => format_from_entity(template, entity, lang),
                _ => template.clone(),
            };
            (key.clone(), format_from_context(&from_entity, &merged))
        })
        .collect()
}
