//! Metadata resolution for a request path.
//!
//! The cascade, stopping at the first branch that produces a record:
//!
//! 1. exact path match in the requested or default language;
//! 2. registered defaults for the bound entity's type, then abstract path
//!    templates (requested language first, default language second);
//! 3. the configured fallback.
//!
//! Whenever several candidates are equally eligible, the one picked is
//! derived from a hash of the path, so a page keeps its metadata from one
//! request to the next.

use crate::config::SeoConfig;
use crate::entity::{Entity, EntityRegistry};
use crate::error::Result;
use crate::matcher::PathPattern;
use crate::models::{Metadata, MetadataRecord};
use crate::store::MetadataStore;
use crate::template::interpolate;
use rand::seq::IndexedRandom;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Minimum priority abstract templates need to override a registered
/// default for the entity's type.
pub const MODEL_DEFAULT_PRIORITY: i64 = 5;

/// Stable pseudo-random index derived from a path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathIndex {
    digest: [u8; 32],
}

impl PathIndex {
    pub fn from_path(path: &str) -> Self {
        Self {
            digest: Sha256::digest(path.as_bytes()).into(),
        }
    }

    /// An index that always picks the first candidate.
    pub fn first() -> Self {
        Self { digest: [0; 32] }
    }

    /// The digest, read as a big-endian integer, modulo `len`.
    /// Always 0 when `len` is 0.
    pub fn pick(&self, len: usize) -> usize {
        if len == 0 {
            return 0;
        }
        let modulus = len as u128;
        self.digest
            .iter()
            .fold(0u128, |acc, &byte| (acc * 256 + byte as u128) % modulus) as usize
    }
}

/// Percent-decode a request path; undecodable input is used as is.
pub fn decode_path(path: &str) -> String {
    match urlencoding::decode(path) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => path.to_string(),
    }
}

/// Configured fallback title and description for `lang`.
pub fn fallback_metadata(config: &SeoConfig, lang: &str, index: &PathIndex) -> Metadata {
    let default_lang = config.default_lang();
    Metadata::from([
        (
            "title".to_string(),
            config.fallback_title.select(lang, default_lang, index),
        ),
        (
            "description".to_string(),
            config.fallback_description.select(lang, default_lang, index),
        ),
    ])
}

/// One of the registered defaults for `type_tag` in `lang`, chosen
/// uniformly at random.
pub fn registered_default<S: MetadataStore + ?Sized>(
    store: &S,
    type_tag: &str,
    lang: &str,
) -> Result<Option<Metadata>> {
    let defaults = store.registered_defaults(type_tag, Some(lang))?;
    Ok(defaults
        .choose(&mut rand::rng())
        .map(|default| default.metadata()))
}

/// Templates among `candidates` that match `path`, with their captures,
/// in candidate order.
fn abstract_matches(
    path: &str,
    candidates: Vec<MetadataRecord>,
) -> Vec<(MetadataRecord, Vec<String>)> {
    candidates
        .into_iter()
        .filter_map(|record| match PathPattern::compile(&record.path) {
            Ok(pattern) => pattern.captures(path).map(|captures| (record, captures)),
            Err(e) => {
                warn!(
                    "Skipping abstract path {:?} (record {}): {}",
                    record.path, record.id, e
                );
                None
            }
        })
        .collect()
}

pub struct Resolver<'a, S: MetadataStore + ?Sized> {
    store: &'a S,
    config: &'a SeoConfig,
    entities: &'a EntityRegistry,
}

impl<'a, S: MetadataStore + ?Sized> Resolver<'a, S> {
    pub fn new(store: &'a S, config: &'a SeoConfig, entities: &'a EntityRegistry) -> Self {
        Self {
            store,
            config,
            entities,
        }
    }

    /// Resolve the metadata for `path` in `lang`.
    ///
    /// `entity` is the object the page shows, if any; a matched record's
    /// own bound entity takes its place for interpolation. `context`
    /// supplies extra placeholder values.
    ///
    /// # Errors
    /// Only store failures. A path nothing matches resolves to the
    /// configured fallback.
    pub fn resolve(
        &self,
        path: &str,
        lang: &str,
        entity: Option<&dyn Entity>,
        context: &BTreeMap<String, String>,
    ) -> Result<Metadata> {
        let path = decode_path(path);
        let index = PathIndex::from_path(&path);
        let default_lang = self.config.default_lang();

        let mut result = fallback_metadata(self.config, lang, &index);
        let mut selected: Option<MetadataRecord> = None;
        let mut positional: Vec<String> = Vec::new();

        let lang_codes: Vec<&str> = if lang == default_lang {
            vec![lang]
        } else {
            vec![lang, default_lang]
        };
        let exact = self.store.records_by_path(&path, &lang_codes)?;

        match exact.len() {
            0 => {
                let mut min_priority = 0;
                if let Some(entity) = entity {
                    let type_tag = entity.entity_ref().type_tag;
                    if let Some(defaults) = registered_default(self.store, &type_tag, lang)? {
                        debug!("Using registered default of {} for {}", type_tag, path);
                        result = defaults;
                        min_priority = MODEL_DEFAULT_PRIORITY;
                    }
                }

                let mut matches =
                    abstract_matches(&path, self.store.abstract_records(lang, min_priority)?);
                if matches.is_empty() && lang != default_lang {
                    matches = abstract_matches(
                        &path,
                        self.store.abstract_records(default_lang, min_priority)?,
                    );
                }

                if !matches.is_empty() {
                    let pick = index.pick(matches.len());
                    debug!(
                        "{} abstract paths match {}, picked #{}",
                        matches.len(),
                        path,
                        pick
                    );
                    if let Some((record, captures)) = matches.into_iter().nth(pick) {
                        selected = Some(record);
                        positional = captures;
                    }
                }
            }
            1 => selected = exact.into_iter().next(),
            _ => {
                // Several rows for this path: only the requested language counts.
                selected = exact.into_iter().find(|record| record.lang_code == lang);
            }
        }

        let mut bound: Option<Arc<dyn Entity>> = None;
        if let Some(record) = &selected {
            debug!("Resolved {} ({}) to record {}", path, lang, record.id);
            result = record.metadata(&self.config.seo_fields);
            if let Some(entity_ref) = &record.entity {
                bound = self.entities.load(entity_ref)?;
            }
        }
        let subject = bound.as_deref().or(entity);

        Ok(interpolate(&result, subject, Some(lang), &positional, context))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FallbackText;
    use crate::db::Database;
    use crate::entity::EntityRef;
    use crate::error::SeoError;
    use crate::models::{NewMetadataRecord, NewRegisteredDefault, RegisteredModelDefault};
    use crate::store::RecordFilter;
    use crate::testing::{test_config, test_db, MemoryEntity, MemoryKind};

    // ==================== Helper Functions ====================

    fn resolve(db: &Database, path: &str, lang: &str) -> Metadata {
        let config = test_config();
        let entities = EntityRegistry::new();
        Resolver::new(db, &config, &entities)
            .resolve(path, lang, None, &BTreeMap::new())
            .expect("Should resolve")
    }

    fn exact(lang: &str, path: &str, title: &str) -> NewMetadataRecord {
        NewMetadataRecord {
            lang_code: lang.to_string(),
            path: path.to_string(),
            title: title.to_string(),
            description: format!("{} description", title),
            ..Default::default()
        }
    }

    fn abstract_path(lang: &str, path: &str, title: &str, priority: i64) -> NewMetadataRecord {
        NewMetadataRecord {
            has_parameters: true,
            priority,
            ..exact(lang, path, title)
        }
    }

    // ==================== PathIndex Tests ====================

    #[test]
    fn test_path_index_is_stable() {
        let a = PathIndex::from_path("/items/42/");
        let b = PathIndex::from_path("/items/42/");
        assert_eq!(a, b);
        assert_eq!(a.pick(7), b.pick(7));
    }

    #[test]
    fn test_path_index_in_range() {
        let index = PathIndex::from_path("/anything/");
        for len in 1..50 {
            assert!(index.pick(len) < len);
        }
        assert_eq!(index.pick(1), 0);
        assert_eq!(index.pick(0), 0);
    }

    #[test]
    fn test_path_index_matches_big_integer_mod() {
        // 256^k mod 255 == 1, so the digest mod 255 is the byte sum mod 255.
        let index = PathIndex::from_path("/x/");
        let byte_sum: u64 = index.digest.iter().map(|&b| b as u64).sum();
        assert_eq!(index.pick(255) as u64, byte_sum % 255);
    }

    #[test]
    fn test_decode_path() {
        assert_eq!(decode_path("/caf%C3%A9/"), "/café/");
        assert_eq!(decode_path("/plain/"), "/plain/");
        assert_eq!(decode_path("/bad%FF/"), "/bad%FF/");
    }

    // ==================== Fallback Tests ====================

    #[test]
    fn test_no_records_returns_fallback() {
        let db = test_db();
        let metadata = resolve(&db, "/nowhere/", "en");
        assert_eq!(metadata["title"], "Default title");
        assert_eq!(metadata["description"], "Default description");
    }

    #[test]
    fn test_fallback_list_selected_by_path_index() {
        let db = test_db();
        let mut config = test_config();
        config.fallback_title =
            FallbackText::parse(r#"{"en": ["One", "Two", "Three"]}"#).unwrap();
        let entities = EntityRegistry::new();

        let metadata = Resolver::new(&db, &config, &entities)
            .resolve("/nowhere/", "es", None, &BTreeMap::new())
            .unwrap();
        let expected = ["One", "Two", "Three"][PathIndex::from_path("/nowhere/").pick(3)];
        assert_eq!(metadata["title"], expected);
    }

    #[test]
    fn test_resolution_is_deterministic() {
        let db = test_db();
        db.create_record(&abstract_path("en", "/items/{0}/", "A {0}", 0)).unwrap();
        db.create_record(&abstract_path("en", "/items/{0}/", "B {0}", 0)).unwrap();
        db.create_record(&abstract_path("en", "/{0}/{1}/", "C {0}", 0)).unwrap();

        let first = resolve(&db, "/items/lamp/", "en");
        for _ in 0..5 {
            assert_eq!(resolve(&db, "/items/lamp/", "en"), first);
        }
    }

    // ==================== Exact Match Tests ====================

    #[test]
    fn test_exact_match_single_record() {
        let db = test_db();
        db.create_record(&exact("en", "/about/", "About us")).unwrap();

        let metadata = resolve(&db, "/about/", "en");
        assert_eq!(metadata["title"], "About us");
        assert_eq!(metadata["description"], "About us description");
    }

    #[test]
    fn test_exact_match_requested_language_wins() {
        let db = test_db();
        db.create_record(&exact("en", "/about/", "About us")).unwrap();
        db.create_record(&exact("es", "/about/", "Nosotros")).unwrap();

        assert_eq!(resolve(&db, "/about/", "es")["title"], "Nosotros");
        assert_eq!(resolve(&db, "/about/", "en")["title"], "About us");
    }

    #[test]
    fn test_exact_match_falls_back_to_default_language() {
        let db = test_db();
        db.create_record(&exact("en", "/about/", "About us")).unwrap();
        db.create_record(&exact("es", "/about/", "Nosotros")).unwrap();

        assert_eq!(resolve(&db, "/about/", "fr")["title"], "About us");
    }

    #[test]
    fn test_exact_match_duplicates_pick_first_in_requested_language() {
        let db = test_db();
        db.create_record(&exact("es", "/about/", "Primero")).unwrap();
        db.create_record(&exact("es", "/about/", "Segundo")).unwrap();

        assert_eq!(resolve(&db, "/about/", "es")["title"], "Primero");
    }

    #[test]
    fn test_exact_match_duplicates_without_requested_language_use_fallback() {
        let db = test_db();
        db.create_record(&exact("en", "/about/", "First")).unwrap();
        db.create_record(&exact("en", "/about/", "Second")).unwrap();
        db.create_record(&abstract_path("es", "/{0}/", "Abstract {0}", 0)).unwrap();

        assert_eq!(resolve(&db, "/about/", "es")["title"], "Default title");
    }

    #[test]
    fn test_exact_match_uses_decoded_path() {
        let db = test_db();
        db.create_record(&exact("en", "/café/", "Coffee")).unwrap();

        assert_eq!(resolve(&db, "/caf%C3%A9/", "en")["title"], "Coffee");
    }

    #[test]
    fn test_exact_match_exposes_configured_fields() {
        let db = test_db();
        db.create_record(&exact("en", "/about/", "About us")).unwrap();
        let mut config = test_config();
        config.seo_fields = vec!["title".to_string(), "path".to_string()];
        let entities = EntityRegistry::new();

        let metadata = Resolver::new(&db, &config, &entities)
            .resolve("/about/", "en", None, &BTreeMap::new())
            .unwrap();
        assert_eq!(metadata.len(), 2);
        assert_eq!(metadata["path"], "/about/");
    }

    #[test]
    fn test_unmatched_placeholder_stays_verbatim() {
        let db = test_db();
        db.create_record(&exact("en", "/search/", "Results for {query}")).unwrap();

        assert_eq!(resolve(&db, "/search/", "en")["title"], "Results for {query}");
    }

    #[test]
    fn test_context_fills_placeholders() {
        let db = test_db();
        db.create_record(&exact("en", "/search/", "Results for {query}")).unwrap();
        let config = test_config();
        let entities = EntityRegistry::new();
        let context = BTreeMap::from([("query".to_string(), "desk-lamps".to_string())]);

        let metadata = Resolver::new(&db, &config, &entities)
            .resolve("/search/", "en", None, &context)
            .unwrap();
        assert_eq!(metadata["title"], "Results for Desk Lamps");
    }

    // ==================== Abstract Path Tests ====================

    #[test]
    fn test_abstract_path_captures_become_positional_args() {
        let db = test_db();
        db.create_record(&abstract_path("en", "/items/{0}/{1}", "Item {0} in {1}", 0))
            .unwrap();

        assert_eq!(resolve(&db, "/items/42/red", "en")["title"], "Item 42 in Red");
    }

    #[test]
    fn test_abstract_requested_language_first() {
        let db = test_db();
        db.create_record(&abstract_path("en", "/items/{0}/", "Item {0}", 0)).unwrap();
        db.create_record(&abstract_path("es", "/items/{0}/", "Artículo {0}", 0)).unwrap();

        assert_eq!(resolve(&db, "/items/mesa/", "es")["title"], "Artículo Mesa");
    }

    #[test]
    fn test_abstract_default_language_when_requested_has_none() {
        let db = test_db();
        db.create_record(&abstract_path("en", "/items/{0}/", "Item {0}", 0)).unwrap();
        db.create_record(&abstract_path("es", "/blog/{0}/", "Blog {0}", 0)).unwrap();

        assert_eq!(resolve(&db, "/items/desk/", "es")["title"], "Item Desk");
    }

    #[test]
    fn test_abstract_tie_broken_by_path_index() {
        let db = test_db();
        db.create_record(&abstract_path("en", "/items/{0}/", "First", 0)).unwrap();
        db.create_record(&abstract_path("en", "/items/{0}/", "Second", 0)).unwrap();

        let expected = ["First", "Second"][PathIndex::from_path("/items/desk/").pick(2)];
        assert_eq!(resolve(&db, "/items/desk/", "en")["title"], expected);
    }

    #[test]
    fn test_abstract_candidates_ordered_by_priority() {
        let db = test_db();
        db.create_record(&abstract_path("en", "/items/{0}/", "Low", 0)).unwrap();
        db.create_record(&abstract_path("en", "/items/{0}/", "High", 9)).unwrap();

        let expected = ["High", "Low"][PathIndex::from_path("/items/desk/").pick(2)];
        assert_eq!(resolve(&db, "/items/desk/", "en")["title"], expected);
    }

    #[test]
    fn test_non_matching_abstract_keeps_fallback() {
        let db = test_db();
        db.create_record(&abstract_path("en", "/items/{0}/", "Item {0}", 0)).unwrap();

        assert_eq!(resolve(&db, "/blog/post/", "en")["title"], "Default title");
    }

    // ==================== Entity Tests ====================

    #[test]
    fn test_registered_default_used_for_entity() {
        let db = test_db();
        db.create_registered_default(&NewRegisteredDefault {
            type_tag: "shop.product".to_string(),
            lang_code: "es".to_string(),
            title: "Compra {name}".to_string(),
            description: "{name} barato".to_string(),
        })
        .unwrap();
        db.create_record(&abstract_path("es", "/p/{0}/", "Low priority", 0)).unwrap();

        let config = test_config();
        let entities = EntityRegistry::new();
        let product = MemoryEntity::new("shop.product", 1)
            .with_text("name", "Lamp")
            .with_text("name_es", "Lámpara");

        let metadata = Resolver::new(&db, &config, &entities)
            .resolve("/p/1/", "es", Some(&product), &BTreeMap::new())
            .unwrap();
        assert_eq!(metadata["title"], "Compra Lámpara");
        assert_eq!(metadata["description"], "Lámpara barato");
    }

    #[test]
    fn test_high_priority_abstract_beats_registered_default() {
        let db = test_db();
        db.create_registered_default(&NewRegisteredDefault {
            type_tag: "shop.product".to_string(),
            lang_code: "en".to_string(),
            title: "Default {name}".to_string(),
            description: String::new(),
        })
        .unwrap();
        db.create_record(&abstract_path("en", "/p/{0}/", "Promo {name}", 5)).unwrap();

        let config = test_config();
        let entities = EntityRegistry::new();
        let product = MemoryEntity::new("shop.product", 1).with_text("name", "Lamp");

        let metadata = Resolver::new(&db, &config, &entities)
            .resolve("/p/1/", "en", Some(&product), &BTreeMap::new())
            .unwrap();
        assert_eq!(metadata["title"], "Promo Lamp");
    }

    #[test]
    fn test_record_entity_overrides_caller_entity() {
        let db = test_db();
        db.create_record(&NewMetadataRecord {
            entity: Some(EntityRef::new("shop.product", 1)),
            ..exact("en", "/p/1/", "Buy {name}")
        })
        .unwrap();

        let kind = MemoryKind::new("shop.product");
        kind.insert(MemoryEntity::new("shop.product", 1).with_text("name", "Lamp"));
        let mut entities = EntityRegistry::new();
        entities.register(Arc::new(kind)).unwrap();
        let config = test_config();
        let other = MemoryEntity::new("shop.product", 2).with_text("name", "Desk");

        let metadata = Resolver::new(&db, &config, &entities)
            .resolve("/p/1/", "en", Some(&other), &BTreeMap::new())
            .unwrap();
        assert_eq!(metadata["title"], "Buy Lamp");
    }

    #[test]
    fn test_caller_entity_used_when_record_unbound() {
        let db = test_db();
        db.create_record(&exact("en", "/p/2/", "Buy {name}")).unwrap();
        let config = test_config();
        let entities = EntityRegistry::new();
        let desk = MemoryEntity::new("shop.product", 2).with_text("name", "Desk");

        let metadata = Resolver::new(&db, &config, &entities)
            .resolve("/p/2/", "en", Some(&desk), &BTreeMap::new())
            .unwrap();
        assert_eq!(metadata["title"], "Buy Desk");
    }

    // ==================== Store Error Tests ====================

    struct FailingStore;

    fn failure() -> SeoError {
        SeoError::Store(rusqlite::Error::InvalidQuery)
    }

    impl MetadataStore for FailingStore {
        fn get_record(&self, _: i64) -> Result<Option<MetadataRecord>> {
            Err(failure())
        }
        fn records_by_path(&self, _: &str, _: &[&str]) -> Result<Vec<MetadataRecord>> {
            Err(failure())
        }
        fn abstract_records(&self, _: &str, _: i64) -> Result<Vec<MetadataRecord>> {
            Err(failure())
        }
        fn records_for_entity(
            &self,
            _: &EntityRef,
            _: Option<&str>,
        ) -> Result<Vec<MetadataRecord>> {
            Err(failure())
        }
        fn unbound_records(&self, _: &str) -> Result<Vec<MetadataRecord>> {
            Err(failure())
        }
        fn view_record_exists(&self, _: &str, _: &str) -> Result<bool> {
            Err(failure())
        }
        fn list_records(&self, _: &RecordFilter) -> Result<Vec<MetadataRecord>> {
            Err(failure())
        }
        fn view_names(&self) -> Result<Vec<String>> {
            Err(failure())
        }
        fn create_record(&self, _: &NewMetadataRecord) -> Result<MetadataRecord> {
            Err(failure())
        }
        fn update_record(&self, _: &MetadataRecord) -> Result<bool> {
            Err(failure())
        }
        fn delete_record(&self, _: i64) -> Result<bool> {
            Err(failure())
        }
        fn delete_records_for_entity(&self, _: &EntityRef) -> Result<usize> {
            Err(failure())
        }
        fn registered_defaults(
            &self,
            _: &str,
            _: Option<&str>,
        ) -> Result<Vec<RegisteredModelDefault>> {
            Err(failure())
        }
        fn registered_types(&self) -> Result<Vec<String>> {
            Err(failure())
        }
        fn create_registered_default(
            &self,
            _: &NewRegisteredDefault,
        ) -> Result<RegisteredModelDefault> {
            Err(failure())
        }
        fn update_registered_default(&self, _: &RegisteredModelDefault) -> Result<bool> {
            Err(failure())
        }
        fn delete_registered_default(&self, _: i64) -> Result<bool> {
            Err(failure())
        }
    }

    #[test]
    fn test_store_errors_propagate() {
        let config = test_config();
        let entities = EntityRegistry::new();
        let result = Resolver::new(&FailingStore, &config, &entities).resolve(
            "/",
            "en",
            None,
            &BTreeMap::new(),
        );
        assert!(matches!(result, Err(SeoError::Store(_))));
    }

    #[test]
    fn test_bound_entity_lookup_errors_propagate() {
        let db = test_db();
        db.create_record(&NewMetadataRecord {
            entity: Some(EntityRef::new("shop.product", 1)),
            ..exact("en", "/p/1/", "Buy {name}")
        })
        .unwrap();
        let mut entities = EntityRegistry::new();
        entities
            .register(Arc::new(MemoryKind::new("shop.product").failing()))
            .unwrap();
        let config = test_config();
        let caller = MemoryEntity::new("shop.product", 2).with_text("name", "Desk");

        let result = Resolver::new(&db, &config, &entities).resolve(
            "/p/1/",
            "en",
            Some(&caller),
            &BTreeMap::new(),
        );
        assert!(matches!(result, Err(SeoError::EntityLookup(_))));
    }
}
