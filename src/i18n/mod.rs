//! Internationalization (i18n) support for metadata resolution.
//!
//! # Architecture
//!
//! - `registry`: the configured languages and the default language
//! - `language`: the thread-local active language and its scoped guard
//!
//! # Example
//!
//! ```rust,ignore
//! use seo_metadata::i18n::{activate, current_language};
//!
//! {
//!     let _guard = activate("es");
//!     assert_eq!(current_language().as_deref(), Some("es"));
//! }
//! // previous language restored here
//! ```

mod language;
mod registry;

pub use language::{activate, current_language, ActiveLanguageGuard};
pub use registry::{LanguageConfig, LanguageRegistry};
