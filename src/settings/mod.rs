//! Configuration target and dictionary-write subsystem
//!
//! Layered configuration: host settings scopes (user/workspace/folder),
//! config files in several formats, and flat-file custom dictionaries. The
//! resolver picks where a word action lands; repositories and dictionary
//! targets perform the mutation; the codec persists it.

pub mod codec;
pub mod dictionary_target;
pub mod fields;
pub mod helper;
pub mod jsonc;
pub mod repository;
pub mod resolver;
pub mod target;
pub mod updater;
pub mod vs_config;
pub mod words;

pub use dictionary_target::{config_target_to_dictionary_target, DictionaryFileTarget, DictionaryTarget};
pub use fields::{DictionaryDefinition, SettingsField, SettingsPatch, SpellerSettings};
pub use helper::{DictionaryHelper, DictionaryInfo};
pub use repository::{
    config_target_to_repository, CSpellConfigRepository, ConfigRepository, VSCodeRepository,
};
pub use resolver::{MatchPattern, Resolution, TargetPicker};
pub use target::{ConfigTarget, TargetKind, TargetScope};
pub use updater::ConfigUpdater;
pub use vs_config::{ConfigurationScope, HostSettings, WorkspaceFolder};
