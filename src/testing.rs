//! In-memory entities shared by unit tests.

use crate::config::{FallbackText, SeoConfig};
use crate::db::Database;
use crate::entity::{Entity, EntityKind, EntityRef, FieldValue};
use crate::error::{Result, SeoError};
use crate::i18n::{current_language, LanguageConfig, LanguageRegistry};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

#[derive(Clone)]
pub struct MemoryEntity {
    entity_ref: EntityRef,
    fields: BTreeMap<String, FieldValue>,
    paths: BTreeMap<String, String>,
}

impl MemoryEntity {
    pub fn new(type_tag: &str, id: i64) -> Self {
        Self {
            entity_ref: EntityRef::new(type_tag, id),
            fields: BTreeMap::new(),
            paths: BTreeMap::new(),
        }
    }

    pub fn with_text(self, name: &str, value: &str) -> Self {
        self.with_field(name, FieldValue::text(value))
    }

    pub fn with_field(mut self, name: &str, value: FieldValue) -> Self {
        self.fields.insert(name.to_string(), value);
        self
    }

    pub fn with_path(mut self, lang: &str, path: &str) -> Self {
        self.paths.insert(lang.to_string(), path.to_string());
        self
    }
}

impl Entity for MemoryEntity {
    fn entity_ref(&self) -> EntityRef {
        self.entity_ref.clone()
    }

    fn field(&self, name: &str) -> Option<FieldValue> {
        self.fields.get(name).cloned()
    }

    fn absolute_path(&self) -> Option<String> {
        current_language().and_then(|lang| self.paths.get(&lang).cloned())
    }
}

pub struct MemoryKind {
    type_tag: String,
    has_absolute_path: bool,
    failing: bool,
    entities: Mutex<BTreeMap<i64, Arc<MemoryEntity>>>,
}

impl MemoryKind {
    pub fn new(type_tag: &str) -> Self {
        Self {
            type_tag: type_tag.to_string(),
            has_absolute_path: true,
            failing: false,
            entities: Mutex::new(BTreeMap::new()),
        }
    }

    pub fn without_absolute_path(mut self) -> Self {
        self.has_absolute_path = false;
        self
    }

    /// Every lookup fails, as if the backing storage were down.
    pub fn failing(mut self) -> Self {
        self.failing = true;
        self
    }

    fn check_available(&self) -> Result<()> {
        if self.failing {
            return Err(SeoError::EntityLookup(format!(
                "{} storage unavailable",
                self.type_tag
            )));
        }
        Ok(())
    }

    pub fn insert(&self, entity: MemoryEntity) {
        let id = entity.entity_ref.id;
        self.entities.lock().unwrap().insert(id, Arc::new(entity));
    }
}

impl EntityKind for MemoryKind {
    fn type_tag(&self) -> &str {
        &self.type_tag
    }

    fn has_absolute_path(&self) -> bool {
        self.has_absolute_path
    }

    fn load(&self, id: i64) -> Result<Option<Arc<dyn Entity>>> {
        self.check_available()?;
        let entities = self.entities.lock().unwrap();
        Ok(entities
            .get(&id)
            .map(|entity| Arc::clone(entity) as Arc<dyn Entity>))
    }

    fn all(&self) -> Result<Vec<Arc<dyn Entity>>> {
        self.check_available()?;
        let entities = self.entities.lock().unwrap();
        Ok(entities
            .values()
            .map(|entity| Arc::clone(entity) as Arc<dyn Entity>)
            .collect())
    }
}

/// English (default) and Spanish, scalar fallbacks.
pub fn test_config() -> SeoConfig {
    SeoConfig {
        languages: LanguageRegistry::new(
            vec![
                LanguageConfig::new("en", "English"),
                LanguageConfig::new("es", "Spanish"),
            ],
            "en",
        )
        .unwrap(),
        fallback_title: FallbackText::Plain("Default title".to_string()),
        fallback_description: FallbackText::Plain("Default description".to_string()),
        seo_fields: vec!["title".to_string(), "description".to_string()],
        seo_models: Vec::new(),
    }
}

pub fn test_db() -> Database {
    Database::open_in_memory().expect("Failed to create in-memory database")
}
