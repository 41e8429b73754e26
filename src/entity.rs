//! Bound entities: the host application's objects that metadata describes.
//!
//! The host implements [`Entity`] for each of its model types and registers
//! an [`EntityKind`] per type. Metadata records only hold an [`EntityRef`]
//! (type tag plus id); the registry turns that back into an entity when a
//! record's own entity must drive placeholder interpolation.

use crate::error::{Result, SeoError};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Weak reference from a metadata record to a host entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityRef {
    pub type_tag: String,
    pub id: i64,
}

impl EntityRef {
    pub fn new(type_tag: impl Into<String>, id: i64) -> Self {
        Self {
            type_tag: type_tag.into(),
            id,
        }
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.type_tag, self.id)
    }
}

/// Value of an entity attribute, as seen by placeholder interpolation.
#[derive(Clone)]
pub enum FieldValue {
    Text(String),
    /// The attribute exists but holds nothing.
    Null,
    /// A to-one relation, possibly unset.
    Related(Option<Arc<dyn Entity>>),
    /// A to-many relation; interpolation continues through its first element.
    Collection(Vec<Arc<dyn Entity>>),
}

impl FieldValue {
    pub fn text(value: impl Into<String>) -> Self {
        FieldValue::Text(value.into())
    }

    pub fn related(entity: Arc<dyn Entity>) -> Self {
        FieldValue::Related(Some(entity))
    }
}

impl fmt::Debug for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Text(text) => f.debug_tuple("Text").field(text).finish(),
            FieldValue::Null => f.write_str("Null"),
            FieldValue::Related(entity) => f
                .debug_tuple("Related")
                .field(&entity.as_ref().map(|e| e.entity_ref()))
                .finish(),
            FieldValue::Collection(items) => f
                .debug_tuple("Collection")
                .field(&items.iter().map(|e| e.entity_ref()).collect::<Vec<_>>())
                .finish(),
        }
    }
}

/// A host object that metadata can be bound to.
pub trait Entity: Send + Sync {
    /// Type tag and id of this entity.
    fn entity_ref(&self) -> EntityRef;

    /// Look up an attribute by name; `None` when no such attribute exists.
    ///
    /// Language-specific variants are plain attributes named
    /// `<name>_<lang>` (e.g. `title_es`).
    fn field(&self, name: &str) -> Option<FieldValue>;

    /// Text used when a placeholder ends on this entity itself
    /// (e.g. `{category}` rather than `{category.name}`).
    fn display_name(&self) -> String {
        self.entity_ref().to_string()
    }

    /// Canonical path of the entity's page in the active language
    /// (see [`crate::i18n::current_language`]).
    fn absolute_path(&self) -> Option<String> {
        None
    }
}

/// Per-type capabilities the host registers with an [`EntityRegistry`].
pub trait EntityKind: Send + Sync {
    fn type_tag(&self) -> &str;

    /// Whether entities of this type implement [`Entity::absolute_path`].
    fn has_absolute_path(&self) -> bool;

    /// Load one entity by id; `Ok(None)` when no such entity exists.
    ///
    /// # Errors
    /// `SeoError::EntityLookup` when the host's backing storage fails.
    fn load(&self, id: i64) -> Result<Option<Arc<dyn Entity>>>;

    /// Every entity of this type, used by the batch sync pass.
    fn all(&self) -> Result<Vec<Arc<dyn Entity>>>;
}

/// Registered entity types, keyed by type tag.
#[derive(Default, Clone)]
pub struct EntityRegistry {
    kinds: BTreeMap<String, Arc<dyn EntityKind>>,
}

impl EntityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an entity type.
    ///
    /// # Errors
    /// `SeoError::Configuration` if the type does not provide an absolute
    /// path; metadata paths could never be kept in sync for it.
    pub fn register(&mut self, kind: Arc<dyn EntityKind>) -> Result<()> {
        if !kind.has_absolute_path() {
            return Err(SeoError::Configuration(format!(
                "entity type '{}' does not provide an absolute path",
                kind.type_tag()
            )));
        }
        self.kinds.insert(kind.type_tag().to_string(), kind);
        Ok(())
    }

    pub fn get(&self, type_tag: &str) -> Option<&Arc<dyn EntityKind>> {
        self.kinds.get(type_tag)
    }

    pub fn is_registered(&self, type_tag: &str) -> bool {
        self.kinds.contains_key(type_tag)
    }

    /// Registered type tags in sorted order.
    pub fn type_tags(&self) -> impl Iterator<Item = &str> {
        self.kinds.keys().map(String::as_str)
    }

    /// Resolve a record's entity reference; unknown types and missing ids
    /// yield `Ok(None)`, host failures are propagated.
    pub fn load(&self, entity_ref: &EntityRef) -> Result<Option<Arc<dyn Entity>>> {
        match self.kinds.get(&entity_ref.type_tag) {
            Some(kind) => kind.load(entity_ref.id),
            None => Ok(None),
        }
    }
}

impl fmt::Debug for EntityRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.kinds.keys()).finish()
    }
}
