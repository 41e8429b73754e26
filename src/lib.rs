//! Per-language SEO metadata (title, description, ...) for the pages of a
//! content-managed site.
//!
//! Metadata is stored as records keyed by path and language. A record may be
//! bound to a host entity, attached to a named view, or be an abstract path
//! template like `/items/{0}/` whose captures fill placeholders in its
//! fields. [`resolver::Resolver`] picks the best record for a request and
//! interpolates it; [`sync::SeoSignals`] keeps entity-bound records in step
//! with entity saves and deletes.

pub mod admin;
pub mod config;
pub mod db;
pub mod entity;
pub mod error;
pub mod i18n;
pub mod matcher;
pub mod models;
pub mod resolver;
pub mod security;
pub mod server;
pub mod store;
pub mod sync;
pub mod template;

#[cfg(test)]
mod testing;

pub use error::{Result, SeoError};
