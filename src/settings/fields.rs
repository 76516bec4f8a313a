//! Settings document model
//!
//! `SpellerSettings` is the in-memory form of a configuration document.
//! Fields outside the known schema are collected into `extra` so a
//! read-modify-write cycle leaves them untouched.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Settings file version written into freshly created config files.
pub const SETTINGS_FILE_VERSION: &str = "0.2";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpellerSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub import: Option<Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub words: Option<Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_words: Option<Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub ignore_words: Option<Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub ignore_paths: Option<Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub dictionaries: Option<Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub dictionary_definitions: Option<Vec<DictionaryDefinition>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled_language_ids: Option<Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_filetypes: Option<Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,

    /// Fields outside the known schema, preserved verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A named custom dictionary referenced from a config document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DictionaryDefinition {
    pub name: String,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub add_words: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

/// The known settings fields, used to scope updates and remap storage names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SettingsField {
    Version,
    Import,
    Words,
    UserWords,
    IgnoreWords,
    IgnorePaths,
    Dictionaries,
    DictionaryDefinitions,
    EnabledLanguageIds,
    EnableFiletypes,
    Language,
}

impl SettingsField {
    /// The field name as it appears in configuration documents.
    pub fn key(&self) -> &'static str {
        match self {
            SettingsField::Version => "version",
            SettingsField::Import => "import",
            SettingsField::Words => "words",
            SettingsField::UserWords => "userWords",
            SettingsField::IgnoreWords => "ignoreWords",
            SettingsField::IgnorePaths => "ignorePaths",
            SettingsField::Dictionaries => "dictionaries",
            SettingsField::DictionaryDefinitions => "dictionaryDefinitions",
            SettingsField::EnabledLanguageIds => "enabledLanguageIds",
            SettingsField::EnableFiletypes => "enableFiletypes",
            SettingsField::Language => "language",
        }
    }
}

impl SpellerSettings {
    /// The template used when an update targets a file that does not exist yet.
    pub fn template() -> Self {
        SpellerSettings {
            version: Some(SETTINGS_FILE_VERSION.to_string()),
            import: Some(Vec::new()),
            words: Some(Vec::new()),
            ignore_words: Some(Vec::new()),
            ignore_paths: Some(Vec::new()),
            dictionaries: Some(Vec::new()),
            dictionary_definitions: Some(Vec::new()),
            ..Default::default()
        }
    }

    /// Copy containing only the named fields. Update functions receive this
    /// restricted view so they never observe fields they did not ask for.
    pub fn restrict_to(&self, fields: &[SettingsField]) -> Self {
        let mut r = SpellerSettings::default();
        for field in fields {
            match field {
                SettingsField::Version => r.version = self.version.clone(),
                SettingsField::Import => r.import = self.import.clone(),
                SettingsField::Words => r.words = self.words.clone(),
                SettingsField::UserWords => r.user_words = self.user_words.clone(),
                SettingsField::IgnoreWords => r.ignore_words = self.ignore_words.clone(),
                SettingsField::IgnorePaths => r.ignore_paths = self.ignore_paths.clone(),
                SettingsField::Dictionaries => r.dictionaries = self.dictionaries.clone(),
                SettingsField::DictionaryDefinitions => {
                    r.dictionary_definitions = self.dictionary_definitions.clone()
                }
                SettingsField::EnabledLanguageIds => {
                    r.enabled_language_ids = self.enabled_language_ids.clone()
                }
                SettingsField::EnableFiletypes => {
                    r.enable_filetypes = self.enable_filetypes.clone()
                }
                SettingsField::Language => r.language = self.language.clone(),
            }
        }
        r
    }
}

/// One field of a settings patch: leave alone, set, or delete.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Patch<T> {
    #[default]
    Keep,
    Set(T),
    Unset,
}

impl<T> Patch<T> {
    pub fn is_keep(&self) -> bool {
        matches!(self, Patch::Keep)
    }

    pub fn as_set(&self) -> Option<&T> {
        match self {
            Patch::Set(v) => Some(v),
            _ => None,
        }
    }

    pub fn into_set(self) -> Option<T> {
        match self {
            Patch::Set(v) => Some(v),
            _ => None,
        }
    }

    fn apply_to(self, slot: &mut Option<T>) {
        match self {
            Patch::Keep => {}
            Patch::Set(v) => *slot = Some(v),
            Patch::Unset => *slot = None,
        }
    }
}

/// A partial settings update. Untouched fields stay `Keep`; applying a patch
/// performs a top-level shallow merge (set values replace wholesale).
#[derive(Debug, Clone, Default)]
pub struct SettingsPatch {
    pub version: Patch<String>,
    pub import: Patch<Vec<String>>,
    pub words: Patch<Vec<String>>,
    pub user_words: Patch<Vec<String>>,
    pub ignore_words: Patch<Vec<String>>,
    pub ignore_paths: Patch<Vec<String>>,
    pub dictionaries: Patch<Vec<String>>,
    pub dictionary_definitions: Patch<Vec<DictionaryDefinition>>,
    pub enabled_language_ids: Patch<Vec<String>>,
    pub enable_filetypes: Patch<Vec<String>>,
    pub language: Patch<String>,
}

impl SettingsPatch {
    pub fn set_words(words: Vec<String>) -> Self {
        SettingsPatch {
            words: Patch::Set(words),
            ..Default::default()
        }
    }

    pub fn apply(self, settings: &mut SpellerSettings) {
        self.version.apply_to(&mut settings.version);
        self.import.apply_to(&mut settings.import);
        self.words.apply_to(&mut settings.words);
        self.user_words.apply_to(&mut settings.user_words);
        self.ignore_words.apply_to(&mut settings.ignore_words);
        self.ignore_paths.apply_to(&mut settings.ignore_paths);
        self.dictionaries.apply_to(&mut settings.dictionaries);
        self.dictionary_definitions
            .apply_to(&mut settings.dictionary_definitions);
        self.enabled_language_ids
            .apply_to(&mut settings.enabled_language_ids);
        self.enable_filetypes.apply_to(&mut settings.enable_filetypes);
        self.language.apply_to(&mut settings.language);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_restrict_to_keeps_only_requested_fields() {
        let settings = SpellerSettings {
            words: Some(vec!["one".into()]),
            user_words: Some(vec!["two".into()]),
            language: Some("en".into()),
            ..Default::default()
        };

        let restricted = settings.restrict_to(&[SettingsField::Words]);
        assert_eq!(restricted.words, Some(vec!["one".to_string()]));
        assert_eq!(restricted.user_words, None);
        assert_eq!(restricted.language, None);
    }

    #[test]
    fn test_patch_set_and_unset() {
        let mut settings = SpellerSettings {
            words: Some(vec!["old".into()]),
            language: Some("en".into()),
            ..Default::default()
        };

        let patch = SettingsPatch {
            words: Patch::Set(vec!["new".into()]),
            language: Patch::Unset,
            ..Default::default()
        };
        patch.apply(&mut settings);

        assert_eq!(settings.words, Some(vec!["new".to_string()]));
        assert_eq!(settings.language, None);
    }

    #[test]
    fn test_unknown_fields_round_trip() {
        let json = r#"{"words":["a"],"somethingElse":{"nested":true}}"#;
        let settings: SpellerSettings = serde_json::from_str(json).unwrap();
        assert!(settings.extra.contains_key("somethingElse"));

        let out = serde_json::to_string(&settings).unwrap();
        let reparsed: SpellerSettings = serde_json::from_str(&out).unwrap();
        assert_eq!(settings, reparsed);
    }

    #[test]
    fn test_template_fields() {
        let t = SpellerSettings::template();
        assert_eq!(t.version.as_deref(), Some(SETTINGS_FILE_VERSION));
        assert_eq!(t.words, Some(Vec::new()));
        assert_eq!(t.import, Some(Vec::new()));
        assert_eq!(t.dictionary_definitions, Some(Vec::new()));
    }
}
