//! The relational store the metadata library reads and writes.
//!
//! [`crate::db::Database`] is the SQLite implementation; hosts with their
//! own persistence implement [`MetadataStore`] over it instead. Every
//! method that returns several records documents its order so that the
//! resolver's tie-breaking stays deterministic across implementations.

use crate::entity::EntityRef;
use crate::error::Result;
use crate::models::{
    MetadataRecord, NewMetadataRecord, NewRegisteredDefault, RegisteredModelDefault,
};

/// Restriction on a record's view name in [`RecordFilter`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ViewNameFilter {
    #[default]
    Any,
    /// Records without a view name.
    Missing,
    /// Case-insensitive equality.
    Named(String),
}

/// Admin list filters; every `None` means "don't filter".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordFilter {
    pub lang_code: Option<String>,
    pub has_parameters: Option<bool>,
    pub has_entity: Option<bool>,
    pub view_name: ViewNameFilter,
    pub entity_type: Option<String>,
    /// Case-insensitive substring of path or view name.
    pub search: Option<String>,
}

pub trait MetadataStore {
    fn get_record(&self, id: i64) -> Result<Option<MetadataRecord>>;

    /// Records whose path equals `path` exactly and whose language is one
    /// of `lang_codes`, ascending by id.
    fn records_by_path(&self, path: &str, lang_codes: &[&str]) -> Result<Vec<MetadataRecord>>;

    /// Records with `has_parameters` set, in `lang_code`, with priority at
    /// least `min_priority`; highest priority first, then ascending id.
    fn abstract_records(&self, lang_code: &str, min_priority: i64)
        -> Result<Vec<MetadataRecord>>;

    /// Records bound to `entity`, optionally restricted to one language,
    /// ascending by id.
    fn records_for_entity(
        &self,
        entity: &EntityRef,
        lang_code: Option<&str>,
    ) -> Result<Vec<MetadataRecord>>;

    /// Records in `lang_code` that are not bound to an entity, ascending by id.
    fn unbound_records(&self, lang_code: &str) -> Result<Vec<MetadataRecord>>;

    fn view_record_exists(&self, view_name: &str, lang_code: &str) -> Result<bool>;

    /// Filtered listing ordered by path, language, then id.
    fn list_records(&self, filter: &RecordFilter) -> Result<Vec<MetadataRecord>>;

    /// Distinct non-null view names, sorted.
    fn view_names(&self) -> Result<Vec<String>>;

    fn create_record(&self, record: &NewMetadataRecord) -> Result<MetadataRecord>;

    /// Overwrite every column of the record with the same id. Returns
    /// whether a row was updated.
    fn update_record(&self, record: &MetadataRecord) -> Result<bool>;

    fn delete_record(&self, id: i64) -> Result<bool>;

    /// Delete every record bound to `entity`, in every language.
    fn delete_records_for_entity(&self, entity: &EntityRef) -> Result<usize>;

    /// Defaults for a type, optionally in one language, ascending by id.
    fn registered_defaults(
        &self,
        type_tag: &str,
        lang_code: Option<&str>,
    ) -> Result<Vec<RegisteredModelDefault>>;

    /// Distinct type tags that have at least one default, sorted.
    fn registered_types(&self) -> Result<Vec<String>>;

    fn create_registered_default(
        &self,
        default: &NewRegisteredDefault,
    ) -> Result<RegisteredModelDefault>;

    fn update_registered_default(&self, default: &RegisteredModelDefault) -> Result<bool>;

    fn delete_registered_default(&self, id: i64) -> Result<bool>;
}
