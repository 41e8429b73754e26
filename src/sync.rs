//! Keeping metadata records aligned with the entities they describe.
//!
//! The host forwards entity lifecycle events to [`SeoSignals::dispatch`]:
//! a save refreshes the stored path of every bound record (per language),
//! a delete removes the entity's records in every language. The batch pass
//! [`SeoSignals::sync_content`] fills in languages that are missing
//! metadata altogether.

use crate::config::SeoConfig;
use crate::entity::{Entity, EntityRegistry};
use crate::error::{Result, SeoError};
use crate::i18n;
use crate::models::{NewMetadataRecord, NewRegisteredDefault};
use crate::resolver::{fallback_metadata, registered_default, PathIndex};
use crate::store::MetadataStore;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

/// Lifecycle event of a host entity.
#[derive(Clone)]
pub enum EntityEvent {
    Saved(Arc<dyn Entity>),
    Deleted(Arc<dyn Entity>),
}

/// What a save reaction changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SaveOutcome {
    pub updated: usize,
    pub created: usize,
}

/// Records created by [`SeoSignals::sync_content`], per category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    /// View-level records cloned into missing languages.
    pub metadata_created: usize,
    /// Registered defaults cloned into missing languages.
    pub defaults_created: usize,
    /// Records created for entities lacking one in a requested language.
    pub entity_metadata_created: usize,
}

pub struct SeoSignals<'a, S: MetadataStore + ?Sized> {
    store: &'a S,
    config: &'a SeoConfig,
    entities: &'a EntityRegistry,
}

impl<'a, S: MetadataStore + ?Sized> SeoSignals<'a, S> {
    /// Wire the handler for every type in `config.seo_models`.
    ///
    /// # Errors
    /// `SeoError::Configuration` if a configured type is not registered in
    /// `entities` (registration itself rejects types without an absolute
    /// path).
    pub fn connect(
        store: &'a S,
        config: &'a SeoConfig,
        entities: &'a EntityRegistry,
    ) -> Result<Self> {
        for type_tag in &config.seo_models {
            if !entities.is_registered(type_tag) {
                return Err(SeoError::Configuration(format!(
                    "entity type '{}' is configured for SEO but not registered",
                    type_tag
                )));
            }
        }
        Ok(Self {
            store,
            config,
            entities,
        })
    }

    fn is_tracked(&self, entity: &dyn Entity) -> bool {
        let type_tag = entity.entity_ref().type_tag;
        self.config.seo_models.contains(&type_tag)
    }

    /// React to an entity event. Events for untracked types are ignored.
    pub fn dispatch(&self, event: &EntityEvent) -> Result<()> {
        match event {
            EntityEvent::Saved(entity) if self.is_tracked(entity.as_ref()) => {
                self.on_save(entity.as_ref(), &[])?;
            }
            EntityEvent::Deleted(entity) if self.is_tracked(entity.as_ref()) => {
                self.on_delete(entity.as_ref())?;
            }
            _ => {}
        }
        Ok(())
    }

    /// Refresh the paths of `entity`'s records in every configured language,
    /// creating a record for languages in `auto_languages` that have none.
    ///
    /// The entity's path is computed with each language active in turn; the
    /// previously active language is restored afterwards, also on error.
    pub fn on_save(&self, entity: &dyn Entity, auto_languages: &[&str]) -> Result<SaveOutcome> {
        let entity_ref = entity.entity_ref();
        let mut outcome = SaveOutcome::default();

        for lang in self.config.languages.codes() {
            let _active = i18n::activate(lang);
            let records = self.store.records_for_entity(&entity_ref, Some(lang))?;

            if !records.is_empty() {
                let Some(path) = entity.absolute_path().filter(|path| !path.is_empty()) else {
                    continue;
                };
                for mut record in records {
                    if record.path != path {
                        debug!("Path of {} ({}) changed to {}", entity_ref, lang, path);
                        record.path = path.clone();
                        self.store.update_record(&record)?;
                        outcome.updated += 1;
                    }
                }
            } else if auto_languages.contains(&lang) {
                let Some(path) = entity.absolute_path().filter(|path| !path.is_empty()) else {
                    continue;
                };
                let metadata = match registered_default(self.store, &entity_ref.type_tag, lang)? {
                    Some(metadata) => metadata,
                    None => fallback_metadata(self.config, lang, &PathIndex::first()),
                };
                self.store.create_record(&NewMetadataRecord {
                    entity: Some(entity_ref.clone()),
                    lang_code: lang.to_string(),
                    path,
                    title: metadata.get("title").cloned().unwrap_or_default(),
                    description: metadata.get("description").cloned().unwrap_or_default(),
                    ..Default::default()
                })?;
                outcome.created += 1;
            }
        }

        Ok(outcome)
    }

    /// Remove every record bound to `entity`.
    pub fn on_delete(&self, entity: &dyn Entity) -> Result<usize> {
        let entity_ref = entity.entity_ref();
        let deleted = self.store.delete_records_for_entity(&entity_ref)?;
        debug!("Deleted {} metadata records of {}", deleted, entity_ref);
        Ok(deleted)
    }

    /// Fill in missing languages.
    ///
    /// Clones default-language view records and the registered defaults of
    /// `type_tags` into every configured language that lacks them, then
    /// runs the save reaction for every entity of `type_tags` with
    /// `languages` as the auto-create set. Running it twice creates nothing
    /// the second time.
    pub fn sync_content(
        &self,
        type_tags: &[String],
        languages: &[String],
    ) -> Result<SyncReport> {
        let mut report = SyncReport::default();
        let default_lang = self.config.default_lang();

        for type_tag in type_tags {
            if !self.entities.is_registered(type_tag) {
                return Err(SeoError::Configuration(format!(
                    "cannot sync unregistered entity type '{}'",
                    type_tag
                )));
            }
        }

        for record in self.store.unbound_records(default_lang)? {
            let Some(view_name) = record.view_name.as_deref() else {
                continue;
            };
            for lang in self.config.languages.codes() {
                if !self.store.view_record_exists(view_name, lang)? {
                    self.store
                        .create_record(&NewMetadataRecord::translated_from(&record, lang))?;
                    report.metadata_created += 1;
                }
            }
        }
        info!("{} metadata records created", report.metadata_created);

        for type_tag in type_tags {
            for default in self.store.registered_defaults(type_tag, Some(default_lang))? {
                for lang in self.config.languages.codes() {
                    if self.store.registered_defaults(type_tag, Some(lang))?.is_empty() {
                        self.store.create_registered_default(&NewRegisteredDefault {
                            type_tag: type_tag.clone(),
                            lang_code: lang.to_string(),
                            title: default.title.clone(),
                            description: default.description.clone(),
                        })?;
                        report.defaults_created += 1;
                    }
                }
            }
        }
        info!("{} registered defaults created", report.defaults_created);

        let auto_languages: Vec<&str> = languages.iter().map(String::as_str).collect();
        if !auto_languages.is_empty() {
            for type_tag in type_tags {
                let Some(kind) = self.entities.get(type_tag) else {
                    continue;
                };
                for entity in kind.all()? {
                    let outcome = self.on_save(entity.as_ref(), &auto_languages)?;
                    report.entity_metadata_created += outcome.created;
                }
            }
        }
        info!(
            "{} entity metadata records created",
            report.entity_metadata_created
        );

        Ok(report)
    }
}
