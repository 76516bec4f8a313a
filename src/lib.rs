//! Spellbridge - editor client for a spell-checking language server
//!
//! This crate is the client half of a spell-checker integration: it wires
//! word actions and document events to a language-server process and
//! manages the layered configuration the checks draw from (host settings
//! scopes, config files, custom dictionaries).

pub mod client;
pub mod config;
pub mod issues;
pub mod settings;
pub mod types;

pub use client::{ConfigProvider, DocumentConfig, DocumentConfigCache, SpellClient};
pub use issues::IssueTracker;
pub use settings::DictionaryHelper;
pub use types::{ClientError, Result};
