//! Configuration update functions
//!
//! A `ConfigUpdater` pairs the set of fields an update needs with a pure
//! function computing the new values. The update function receives only the
//! fields named in `keys` and returns only the fields to change, so it
//! stays independent of where and how the settings are stored.

use crate::settings::fields::{Patch, SettingsField, SettingsPatch, SpellerSettings};

pub type UpdateFn = dyn Fn(&SpellerSettings) -> SettingsPatch + Send + Sync;

pub struct ConfigUpdater {
    keys: Vec<SettingsField>,
    update_fn: Box<UpdateFn>,
}

impl ConfigUpdater {
    pub fn new<F>(keys: Vec<SettingsField>, update_fn: F) -> Self
    where
        F: Fn(&SpellerSettings) -> SettingsPatch + Send + Sync + 'static,
    {
        ConfigUpdater {
            keys,
            update_fn: Box::new(update_fn),
        }
    }

    pub fn keys(&self) -> &[SettingsField] {
        &self.keys
    }

    /// Apply the update function to the (already restricted) current values.
    pub fn compute(&self, current: &SpellerSettings) -> SettingsPatch {
        (self.update_fn)(current)
    }

    /// Updater transforming the `words` list.
    pub fn update_words<F>(f: F) -> Self
    where
        F: Fn(&[String]) -> Vec<String> + Send + Sync + 'static,
    {
        Self::new(vec![SettingsField::Words], move |cfg| SettingsPatch {
            words: Patch::Set(f(cfg.words.as_deref().unwrap_or_default())),
            ..Default::default()
        })
    }

    /// Updater transforming the `ignoreWords` list.
    pub fn update_ignore_words<F>(f: F) -> Self
    where
        F: Fn(&[String]) -> Vec<String> + Send + Sync + 'static,
    {
        Self::new(vec![SettingsField::IgnoreWords], move |cfg| SettingsPatch {
            ignore_words: Patch::Set(f(cfg.ignore_words.as_deref().unwrap_or_default())),
            ..Default::default()
        })
    }

    /// Updater transforming the `enabledLanguageIds` list.
    pub fn update_enabled_language_ids<F>(f: F) -> Self
    where
        F: Fn(&[String]) -> Vec<String> + Send + Sync + 'static,
    {
        Self::new(
            vec![SettingsField::EnabledLanguageIds],
            move |cfg| SettingsPatch {
                enabled_language_ids: Patch::Set(f(cfg
                    .enabled_language_ids
                    .as_deref()
                    .unwrap_or_default())),
                ..Default::default()
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::words::merge_words;

    #[test]
    fn test_update_words_sees_current_value() {
        let updater = ConfigUpdater::update_words(|current| {
            merge_words(current, &["new".to_string()])
        });
        assert_eq!(updater.keys(), &[SettingsField::Words]);

        let current = SpellerSettings {
            words: Some(vec!["existing".to_string()]),
            ..Default::default()
        };
        let patch = updater.compute(&current);
        assert_eq!(
            patch.words.as_set(),
            Some(&vec!["existing".to_string(), "new".to_string()])
        );
    }

    #[test]
    fn test_update_words_handles_missing_field() {
        let updater = ConfigUpdater::update_words(|current| current.to_vec());
        let patch = updater.compute(&SpellerSettings::default());
        assert_eq!(patch.words.as_set(), Some(&Vec::new()));
    }
}
