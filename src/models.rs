use crate::entity::EntityRef;
use std::collections::BTreeMap;

/// Resolved metadata handed to callers, keyed by field name.
pub type Metadata = BTreeMap<String, String>;

/// A language-scoped SEO entry for a static view, a bound entity, or a
/// family of paths (when `has_parameters` is set and `path` holds `{N}`
/// placeholders).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataRecord {
    pub id: i64,
    pub view_name: Option<String>,
    pub entity: Option<EntityRef>,
    pub lang_code: String,
    pub has_parameters: bool,
    pub path: String,
    pub title: String,
    pub description: String,
    /// Higher wins among abstract paths.
    pub priority: i64,
}

impl MetadataRecord {
    /// Value of a named record field, as exposed through `SEO_FIELDS`.
    pub fn field(&self, name: &str) -> Option<String> {
        match name {
            "title" => Some(self.title.clone()),
            "description" => Some(self.description.clone()),
            "path" => Some(self.path.clone()),
            "view_name" => Some(self.view_name.clone().unwrap_or_default()),
            "lang_code" => Some(self.lang_code.clone()),
            _ => None,
        }
    }

    /// The raw (uninterpolated) metadata this record contributes.
    /// Unknown field names are skipped.
    pub fn metadata(&self, fields: &[String]) -> Metadata {
        fields
            .iter()
            .filter_map(|name| self.field(name).map(|value| (name.clone(), value)))
            .collect()
    }
}

/// Field values for a record that does not exist yet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewMetadataRecord {
    pub view_name: Option<String>,
    pub entity: Option<EntityRef>,
    pub lang_code: String,
    pub has_parameters: bool,
    pub path: String,
    pub title: String,
    pub description: String,
    pub priority: i64,
}

impl NewMetadataRecord {
    /// Same content as `record`, in another language.
    pub fn translated_from(record: &MetadataRecord, lang_code: &str) -> Self {
        Self {
            view_name: record.view_name.clone(),
            entity: record.entity.clone(),
            lang_code: lang_code.to_string(),
            has_parameters: record.has_parameters,
            path: record.path.clone(),
            title: record.title.clone(),
            description: record.description.clone(),
            priority: record.priority,
        }
    }
}

/// Default title/description for every entity of a type, per language.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisteredModelDefault {
    pub id: i64,
    pub type_tag: String,
    pub lang_code: String,
    pub title: String,
    pub description: String,
}

impl RegisteredModelDefault {
    pub fn metadata(&self) -> Metadata {
        Metadata::from([
            ("title".to_string(), self.title.clone()),
            ("description".to_string(), self.description.clone()),
        ])
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewRegisteredDefault {
    pub type_tag: String,
    pub lang_code: String,
    pub title: String,
    pub description: String,
}
