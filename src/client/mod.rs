//! Spell-check server client and document-config cache

pub mod client;
pub mod doc_cache;

pub use client::{ConfigProvider, DiagnosticsFromServer, DocumentConfig, SpellClient};
pub use doc_cache::DocumentConfigCache;
