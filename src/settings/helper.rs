//! Dictionary helper facade
//!
//! The entry point commands use for word actions: normalize the word input,
//! figure out which target the action applies to (directly, or by fetching
//! the document's target list from the server and matching a pattern), and
//! perform the mutation. Also owns custom dictionary creation.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::future::join_all;
use tracing::{info, warn};
use url::Url;

use crate::client::ConfigProvider;
use crate::settings::dictionary_target::{
    config_target_to_dictionary_target, DictionaryFileTarget, DictionaryTarget,
};
use crate::settings::fields::{DictionaryDefinition, Patch, SettingsField, SettingsPatch};
use crate::settings::repository::{ConfigRepository, RepositoryLocation};
use crate::settings::resolver::{resolve_target_with_picker, MatchPattern, TargetPicker};
use crate::settings::target::{ConfigTarget, TargetScope};
use crate::settings::updater::ConfigUpdater;
use crate::settings::vs_config::{
    configuration_scope_to_target_scope, ConfigurationScope, HostSettings,
};
use crate::settings::words::{merge_words, normalize_words, remove_words};
use crate::types::{ClientError, Result};

/// Directory custom dictionaries are created under, adjacent to the config
/// store they belong to.
const DICTIONARY_DIR: &str = ".cspell";
const DEFAULT_DICTIONARY_NAME: &str = "custom-dictionary";

/// Where a new custom dictionary for a repository goes.
#[derive(Debug, Clone, PartialEq)]
pub struct DictionaryInfo {
    pub name: String,
    /// Path as recorded in the config document (`./...`, `~/...`, or a
    /// `${workspaceFolder:...}` reference).
    pub rel_path: String,
    pub scope: Option<TargetScope>,
    /// Resolved filesystem location.
    pub path: PathBuf,
}

pub struct DictionaryHelper {
    client: Arc<dyn ConfigProvider>,
    host: Arc<HostSettings>,
}

impl DictionaryHelper {
    pub fn new(client: Arc<dyn ConfigProvider>, host: Arc<HostSettings>) -> Self {
        DictionaryHelper { client, host }
    }

    /// Add words to the target a pattern picks for the given document. The
    /// target list comes from the server; ambiguity goes through the
    /// picker, and a canceled pick resolves without doing anything.
    pub async fn add_words_best_match(
        &self,
        words: &[String],
        pattern: &MatchPattern,
        doc_uri: Option<&Url>,
        picker: &dyn TargetPicker,
    ) -> Result<()> {
        let Some(target) = self.resolve(pattern, doc_uri, picker).await? else {
            return Ok(());
        };
        self.add_words_to_target(words, &target).await
    }

    /// Remove words from the target a pattern picks for the given document.
    pub async fn remove_words_best_match(
        &self,
        words: &[String],
        pattern: &MatchPattern,
        doc_uri: Option<&Url>,
        picker: &dyn TargetPicker,
    ) -> Result<()> {
        let Some(target) = self.resolve(pattern, doc_uri, picker).await? else {
            return Ok(());
        };
        self.remove_words_from_target(words, &target).await
    }

    /// Add words to a concrete target.
    pub async fn add_words_to_target(&self, words: &[String], target: &ConfigTarget) -> Result<()> {
        let words = normalize_words(words);
        let dict = config_target_to_dictionary_target(target, &self.host)?;
        info!("Adding {} word(s) to \"{}\"", words.len(), dict.name());
        dict.add_words(&words).await?;
        self.notify_settings_changed().await;
        Ok(())
    }

    /// Remove words from a concrete target.
    pub async fn remove_words_from_target(
        &self,
        words: &[String],
        target: &ConfigTarget,
    ) -> Result<()> {
        let words = normalize_words(words);
        let dict = config_target_to_dictionary_target(target, &self.host)?;
        info!("Removing {} word(s) from \"{}\"", words.len(), dict.name());
        dict.remove_words(&words).await?;
        self.notify_settings_changed().await;
        Ok(())
    }

    /// Add words to each target in the list.
    pub async fn add_words_to_targets(
        &self,
        words: &[String],
        targets: &[ConfigTarget],
    ) -> Result<()> {
        for target in targets {
            self.add_words_to_target(words, target).await?;
        }
        Ok(())
    }

    /// Remove words from each target in the list.
    pub async fn remove_words_from_targets(
        &self,
        words: &[String],
        targets: &[ConfigTarget],
    ) -> Result<()> {
        for target in targets {
            self.remove_words_from_target(words, target).await?;
        }
        Ok(())
    }

    /// Add words to a set of dictionary files. Failures are reported per
    /// dictionary instead of aborting the rest.
    pub async fn add_words_to_dictionaries(
        &self,
        words: &[String],
        dicts: &[DictionaryFileTarget],
    ) -> Result<()> {
        let words = normalize_words(words);
        let results = join_all(dicts.iter().map(|d| d.add_words(&words))).await;
        let mut first_error = None;
        for result in results {
            if let Err(e) = result {
                warn!("{}", e);
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            None => {
                self.notify_settings_changed().await;
                Ok(())
            }
            Some(e) => Err(e),
        }
    }

    /// Add words to the `words` list of a config repository.
    pub async fn add_words_to_config_rep(
        &self,
        words: &[String],
        rep: &dyn ConfigRepository,
    ) -> Result<()> {
        let words = normalize_words(words);
        rep.update(&ConfigUpdater::update_words(move |current| {
            merge_words(current, &words)
        }))
        .await
    }

    /// Remove words from the `words` list of a config repository.
    pub async fn remove_words_from_config_rep(
        &self,
        words: &[String],
        rep: &dyn ConfigRepository,
    ) -> Result<()> {
        let words = normalize_words(words);
        rep.update(&ConfigUpdater::update_words(move |current| {
            remove_words(current, &words)
        }))
        .await
    }

    /// Create a custom dictionary for a repository: seed the `.txt` file
    /// (never overwriting an existing one) and register it in the config.
    pub async fn create_custom_dictionary(
        &self,
        rep: &dyn ConfigRepository,
    ) -> Result<DictionaryInfo> {
        let info = calc_dictionary_info_for_repository(rep)?;
        create_custom_dictionary_file(&info.path, false).await?;

        let def = DictionaryDefinition {
            name: info.name.clone(),
            path: info.rel_path.clone(),
            add_words: Some(true),
            scope: info.scope.map(|s| s.as_str().to_string()),
        };
        add_custom_dictionary_to_config(rep, def).await?;
        self.notify_settings_changed().await;
        Ok(info)
    }

    async fn resolve(
        &self,
        pattern: &MatchPattern,
        doc_uri: Option<&Url>,
        picker: &dyn TargetPicker,
    ) -> Result<Option<ConfigTarget>> {
        let config = self.client.configuration_for_document(doc_uri).await?;
        resolve_target_with_picker(pattern, &config.config_targets, picker).await
    }

    async fn notify_settings_changed(&self) {
        if let Err(e) = self.client.notify_settings_changed().await {
            warn!("Failed to notify server of settings change: {}", e);
        }
    }
}

/// Compute the name, recorded path, and filesystem location of a new custom
/// dictionary for a repository. Config-file repositories get a dictionary
/// next to the config file; host scopes get one under the matching
/// workspace folder, or the home directory at user scope.
pub fn calc_dictionary_info_for_repository(rep: &dyn ConfigRepository) -> Result<DictionaryInfo> {
    match rep.location() {
        RepositoryLocation::ConfigFile(config_path) => {
            let dir = config_path
                .parent()
                .unwrap_or_else(|| Path::new("."))
                .to_path_buf();
            let file = format!("{DEFAULT_DICTIONARY_NAME}.txt");
            Ok(DictionaryInfo {
                name: DEFAULT_DICTIONARY_NAME.to_string(),
                rel_path: format!("./{DICTIONARY_DIR}/{file}"),
                scope: None,
                path: dir.join(DICTIONARY_DIR).join(file),
            })
        }
        RepositoryLocation::HostScope { scope, folder } => match scope {
            ConfigurationScope::User => {
                let home = dirs::home_dir().ok_or_else(|| {
                    ClientError::ConfigError("cannot determine home directory".into())
                })?;
                let name = format!("{DEFAULT_DICTIONARY_NAME}-user");
                Ok(DictionaryInfo {
                    rel_path: format!("~/{DICTIONARY_DIR}/{name}.txt"),
                    path: home.join(DICTIONARY_DIR).join(format!("{name}.txt")),
                    scope: Some(TargetScope::User),
                    name,
                })
            }
            ConfigurationScope::Workspace | ConfigurationScope::Folder => {
                let folder = folder.ok_or_else(|| {
                    ClientError::ConfigError("no workspace folder open".into())
                })?;
                let name = match scope {
                    ConfigurationScope::Workspace => {
                        format!("{DEFAULT_DICTIONARY_NAME}-workspace")
                    }
                    _ => format!("{DEFAULT_DICTIONARY_NAME}-folder-{}", folder.name),
                };
                let base = folder.uri.to_file_path().map_err(|_| {
                    ClientError::InvalidPath(PathBuf::from(folder.uri.as_str()))
                })?;
                Ok(DictionaryInfo {
                    rel_path: format!(
                        "${{workspaceFolder:{}}}/{DICTIONARY_DIR}/{name}.txt",
                        folder.name
                    ),
                    path: base.join(DICTIONARY_DIR).join(format!("{name}.txt")),
                    scope: Some(configuration_scope_to_target_scope(scope)),
                    name,
                })
            }
        },
    }
}

/// Seed a custom dictionary file. Refuses to clobber an existing file
/// unless `overwrite` is set.
pub async fn create_custom_dictionary_file(path: &Path, overwrite: bool) -> Result<()> {
    if !overwrite && tokio::fs::try_exists(path).await? {
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let header = "# Custom Dictionary\n# One word per line, comments after `#` are ignored.\n";
    tokio::fs::write(path, header).await?;
    Ok(())
}

/// Register a dictionary definition in a config repository: the definition
/// replaces any existing one with the same name, and the dictionary name is
/// appended to `dictionaries` once.
pub async fn add_custom_dictionary_to_config(
    rep: &dyn ConfigRepository,
    def: DictionaryDefinition,
) -> Result<()> {
    let updater = ConfigUpdater::new(
        vec![SettingsField::Dictionaries, SettingsField::DictionaryDefinitions],
        move |cfg| {
            let mut definitions = cfg.dictionary_definitions.clone().unwrap_or_default();
            match definitions.iter_mut().find(|d| d.name == def.name) {
                Some(existing) => *existing = def.clone(),
                None => definitions.push(def.clone()),
            }

            let mut dictionaries = cfg.dictionaries.clone().unwrap_or_default();
            if !dictionaries.contains(&def.name) {
                dictionaries.push(def.name.clone());
            }

            SettingsPatch {
                dictionaries: Patch::Set(dictionaries),
                dictionary_definitions: Patch::Set(definitions),
                ..Default::default()
            }
        },
    );
    rep.update(&updater).await
}
