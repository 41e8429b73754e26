//! Editor-facing operations over metadata records and registered defaults.
//!
//! These are the checks an editing UI relies on: languages must be
//! configured, paths must be present, and an entity gets at most one record
//! per language. Listing goes through [`RecordFilter`].

use crate::config::SeoConfig;
use crate::entity::{Entity, EntityRef, EntityRegistry};
use crate::error::{Result, SeoError};
use crate::i18n;
use crate::matcher::PathPattern;
use crate::models::{
    MetadataRecord, NewMetadataRecord, NewRegisteredDefault, RegisteredModelDefault,
};
use crate::store::{MetadataStore, RecordFilter};
use tracing::info;

pub struct MetadataAdmin<'a, S: MetadataStore + ?Sized> {
    store: &'a S,
    config: &'a SeoConfig,
    entities: &'a EntityRegistry,
}

impl<'a, S: MetadataStore + ?Sized> MetadataAdmin<'a, S> {
    pub fn new(store: &'a S, config: &'a SeoConfig, entities: &'a EntityRegistry) -> Self {
        Self {
            store,
            config,
            entities,
        }
    }

    fn check_language(&self, lang_code: &str) -> Result<()> {
        if self.config.languages.is_supported(lang_code) {
            Ok(())
        } else {
            Err(SeoError::Validation(format!(
                "language '{}' is not configured",
                lang_code
            )))
        }
    }

    fn check_path(path: &str, has_parameters: bool) -> Result<()> {
        if path.trim().is_empty() {
            return Err(SeoError::Validation("path must not be empty".to_string()));
        }
        if has_parameters {
            PathPattern::compile(path).map_err(|e| {
                SeoError::Validation(format!("path '{}' is not a valid template: {}", path, e))
            })?;
        }
        Ok(())
    }

    /// Create a view-level or abstract record.
    pub fn create_record(&self, record: &NewMetadataRecord) -> Result<MetadataRecord> {
        self.check_language(&record.lang_code)?;
        Self::check_path(&record.path, record.has_parameters)?;
        if let Some(entity_ref) = &record.entity {
            if !self
                .store
                .records_for_entity(entity_ref, Some(&record.lang_code))?
                .is_empty()
            {
                return Err(duplicate(entity_ref, &record.lang_code));
            }
        }
        let created = self.store.create_record(record)?;
        info!("Created metadata record {} for {}", created.id, created.path);
        Ok(created)
    }

    /// Create the record of `entity` in `lang_code`, taking its path from
    /// the entity with that language active.
    ///
    /// # Errors
    /// `SeoError::Validation` if the entity already has a record in that
    /// language or yields no path.
    pub fn create_entity_record(
        &self,
        entity: &dyn Entity,
        lang_code: &str,
        title: &str,
        description: &str,
    ) -> Result<MetadataRecord> {
        self.check_language(lang_code)?;
        let entity_ref = entity.entity_ref();
        if !self
            .store
            .records_for_entity(&entity_ref, Some(lang_code))?
            .is_empty()
        {
            return Err(duplicate(&entity_ref, lang_code));
        }

        let path = entity_path(entity, lang_code)?;

        self.store.create_record(&NewMetadataRecord {
            entity: Some(entity_ref),
            lang_code: lang_code.to_string(),
            path,
            title: title.to_string(),
            description: description.to_string(),
            ..Default::default()
        })
    }

    /// Save an edited record and return it as stored.
    ///
    /// The path of an entity-bound record is not editable: it is recomputed
    /// from the entity in the record's language. Moving a bound record into
    /// a language where the entity already has a record is rejected.
    pub fn update_record(&self, record: &MetadataRecord) -> Result<MetadataRecord> {
        self.check_language(&record.lang_code)?;
        let mut record = record.clone();

        if let Some(entity_ref) = record.entity.clone() {
            let taken = self
                .store
                .records_for_entity(&entity_ref, Some(&record.lang_code))?
                .iter()
                .any(|other| other.id != record.id);
            if taken {
                return Err(duplicate(&entity_ref, &record.lang_code));
            }
            let entity = self.entities.load(&entity_ref)?.ok_or_else(|| {
                SeoError::Validation(format!("{} no longer exists", entity_ref))
            })?;
            record.path = entity_path(entity.as_ref(), &record.lang_code)?;
        }

        Self::check_path(&record.path, record.has_parameters)?;
        if self.store.update_record(&record)? {
            Ok(record)
        } else {
            Err(SeoError::Validation(format!(
                "metadata record {} does not exist",
                record.id
            )))
        }
    }

    pub fn delete_record(&self, id: i64) -> Result<bool> {
        self.store.delete_record(id)
    }

    pub fn list_records(&self, filter: &RecordFilter) -> Result<Vec<MetadataRecord>> {
        self.store.list_records(filter)
    }

    /// View names available for filtering.
    pub fn view_names(&self) -> Result<Vec<String>> {
        self.store.view_names()
    }

    pub fn create_registered_default(
        &self,
        default: &NewRegisteredDefault,
    ) -> Result<RegisteredModelDefault> {
        self.check_language(&default.lang_code)?;
        if !self.entities.is_registered(&default.type_tag) {
            return Err(SeoError::Validation(format!(
                "entity type '{}' is not registered",
                default.type_tag
            )));
        }
        self.store.create_registered_default(default)
    }

    pub fn update_registered_default(&self, default: &RegisteredModelDefault) -> Result<()> {
        self.check_language(&default.lang_code)?;
        if self.store.update_registered_default(default)? {
            Ok(())
        } else {
            Err(SeoError::Validation(format!(
                "registered default {} does not exist",
                default.id
            )))
        }
    }

    pub fn delete_registered_default(&self, id: i64) -> Result<bool> {
        self.store.delete_registered_default(id)
    }

    /// Registered defaults, optionally narrowed to one type and/or language,
    /// grouped by type tag.
    pub fn list_registered_defaults(
        &self,
        type_tag: Option<&str>,
        lang_code: Option<&str>,
    ) -> Result<Vec<RegisteredModelDefault>> {
        let type_tags = match type_tag {
            Some(tag) => vec![tag.to_string()],
            None => self.store.registered_types()?,
        };
        let mut defaults = Vec::new();
        for tag in type_tags {
            defaults.extend(self.store.registered_defaults(&tag, lang_code)?);
        }
        Ok(defaults)
    }

    /// Type tags that have registered defaults.
    pub fn registered_types(&self) -> Result<Vec<String>> {
        self.store.registered_types()
    }
}

/// Path of `entity` with `lang_code` active.
fn entity_path(entity: &dyn Entity, lang_code: &str) -> Result<String> {
    let path = {
        let _active = i18n::activate(lang_code);
        entity.absolute_path()
    };
    path.filter(|p| !p.is_empty()).ok_or_else(|| {
        SeoError::Validation(format!(
            "{} has no path in '{}'",
            entity.entity_ref(),
            lang_code
        ))
    })
}

fn duplicate(entity_ref: &EntityRef, lang_code: &str) -> SeoError {
    SeoError::Validation(format!(
        "a metadata record for {} in '{}' already exists",
        entity_ref, lang_code
    ))
}
