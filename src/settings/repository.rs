//! Configuration repositories
//!
//! A `ConfigRepository` binds an updater to a concrete backing store: a
//! config file on disk, or one of the host-settings scopes. The host-scope
//! repository also owns the one storage quirk in the system: at the user
//! scope the logical `words` field is physically stored as `userWords`,
//! expressed here as an explicit field-mapping table rather than scattered
//! branching.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::try_join_all;
use tracing::debug;
use url::Url;

use crate::settings::codec::{read_config_file_or, update_config_file};
use crate::settings::fields::{Patch, SettingsField, SettingsPatch, SpellerSettings};
use crate::settings::target::{uri_to_name, uri_to_path, ConfigTarget, TargetScope};
use crate::settings::updater::ConfigUpdater;
use crate::settings::vs_config::{
    configuration_scope_to_target_scope, target_scope_to_configuration_scope, ConfigurationScope,
    HostSettings, WorkspaceFolder,
};
use crate::types::{ClientError, Result};

/// One logical field stored under a different physical name at a given
/// scope. Consulted by `VSCodeRepository` before reads and after updates.
const USER_SCOPE_FIELD_MAP: &[(SettingsField, SettingsField)] =
    &[(SettingsField::Words, SettingsField::UserWords)];

/// Where a repository physically stores its settings. Used by callers that
/// need to derive filesystem locations from a repository, like custom
/// dictionary creation.
#[derive(Debug, Clone)]
pub enum RepositoryLocation {
    ConfigFile(PathBuf),
    HostScope {
        scope: ConfigurationScope,
        folder: Option<WorkspaceFolder>,
    },
}

/// A place settings fields can be read from and updated in.
#[async_trait]
pub trait ConfigRepository: Send + Sync {
    fn name(&self) -> &str;

    /// The dictionary scope a custom dictionary created against this
    /// repository should carry.
    fn default_dictionary_scope(&self) -> Option<TargetScope>;

    fn location(&self) -> RepositoryLocation;

    async fn update(&self, updater: &ConfigUpdater) -> Result<()>;

    /// Read the current value of the given fields.
    async fn read(&self, fields: &[SettingsField]) -> Result<SpellerSettings>;
}

/// Repository backed by a config file on disk.
pub struct CSpellConfigRepository {
    path: PathBuf,
    name: String,
}

impl CSpellConfigRepository {
    pub fn new(config_uri: &Url, name: Option<String>) -> Result<Self> {
        let path = uri_to_path(config_uri)?;
        let name = name.unwrap_or_else(|| uri_to_name(config_uri));
        Ok(CSpellConfigRepository { path, name })
    }

    pub fn from_path(path: PathBuf) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        CSpellConfigRepository { path, name }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

#[async_trait]
impl ConfigRepository for CSpellConfigRepository {
    fn name(&self) -> &str {
        &self.name
    }

    fn default_dictionary_scope(&self) -> Option<TargetScope> {
        None
    }

    fn location(&self) -> RepositoryLocation {
        RepositoryLocation::ConfigFile(self.path.clone())
    }

    async fn update(&self, updater: &ConfigUpdater) -> Result<()> {
        debug!("Updating config file repository: {}", self.name);
        let keys = updater.keys().to_vec();
        update_config_file(&self.path, |current| {
            updater.compute(&current.restrict_to(&keys))
        })
        .await
    }

    async fn read(&self, fields: &[SettingsField]) -> Result<SpellerSettings> {
        let settings = read_config_file_or(&self.path, SpellerSettings::default()).await?;
        Ok(settings.restrict_to(fields))
    }
}

/// Repository backed by a host-settings scope.
pub struct VSCodeRepository {
    host: Arc<HostSettings>,
    scope: ConfigurationScope,
    resource: Option<Url>,
    name: String,
}

impl VSCodeRepository {
    pub fn new(host: Arc<HostSettings>, scope: ConfigurationScope, resource: Option<Url>) -> Self {
        VSCodeRepository {
            host,
            scope,
            resource,
            name: scope.as_str().to_string(),
        }
    }

    pub fn scope(&self) -> ConfigurationScope {
        self.scope
    }

    /// The workspace folder this repository's scope maps to: none at user
    /// scope, the first folder at workspace scope, the folder resolved from
    /// the bound resource at folder scope.
    pub fn workspace_folder(&self) -> Option<&WorkspaceFolder> {
        match self.scope {
            ConfigurationScope::User => None,
            ConfigurationScope::Workspace => self.host.first_folder(),
            ConfigurationScope::Folder => self.host.resolve_folder(self.resource.as_ref()),
        }
    }

    fn is_remapped_scope(&self) -> bool {
        self.scope == ConfigurationScope::User
    }

    /// Fields to fetch from storage for the requested logical fields. At a
    /// remapped scope both physical names are fetched so neither side of an
    /// alias is dropped.
    fn storage_fields(&self, fields: &[SettingsField]) -> Vec<SettingsField> {
        let mut mapped = fields.to_vec();
        if self.is_remapped_scope() {
            for (logical, physical) in USER_SCOPE_FIELD_MAP {
                if mapped.contains(logical) && !mapped.contains(physical) {
                    mapped.push(*physical);
                }
            }
        }
        mapped
    }

    /// Surface remapped physical fields under their logical name:
    /// `words` at user scope reads as `userWords ++ words`.
    fn map_read(&self, mut settings: SpellerSettings) -> SpellerSettings {
        if !self.is_remapped_scope() {
            return settings;
        }
        let mut words = settings.user_words.take().unwrap_or_default();
        if let Some(stored) = settings.words.take() {
            words.extend(stored);
        }
        if !words.is_empty() {
            settings.words = Some(words);
        }
        settings
    }

    /// Redirect a patch of the logical field to its physical name: a write
    /// of `words` at user scope lands in `userWords` (concatenating with
    /// anything the patch already set there) and clears `words`.
    fn map_patch(&self, mut patch: SettingsPatch) -> SettingsPatch {
        if !self.is_remapped_scope() || patch.words.is_keep() {
            return patch;
        }
        match std::mem::take(&mut patch.words) {
            Patch::Set(mut words) => {
                if let Patch::Set(existing) = std::mem::take(&mut patch.user_words) {
                    words.extend(existing);
                }
                patch.user_words = Patch::Set(words);
            }
            Patch::Unset => patch.user_words = Patch::Unset,
            Patch::Keep => {}
        }
        patch.words = Patch::Unset;
        patch
    }
}

#[async_trait]
impl ConfigRepository for VSCodeRepository {
    fn name(&self) -> &str {
        &self.name
    }

    fn default_dictionary_scope(&self) -> Option<TargetScope> {
        Some(configuration_scope_to_target_scope(self.scope))
    }

    fn location(&self) -> RepositoryLocation {
        RepositoryLocation::HostScope {
            scope: self.scope,
            folder: self.workspace_folder().cloned(),
        }
    }

    async fn update(&self, updater: &ConfigUpdater) -> Result<()> {
        debug!("Updating host settings repository: {}", self.name);
        let fetch = self.storage_fields(updater.keys());
        self.host
            .update_section(self.scope, self.resource.as_ref(), |current| {
                let view = self.map_read(current.restrict_to(&fetch));
                let patch = self.map_patch(updater.compute(&view));
                let mut updated = current.clone();
                patch.apply(&mut updated);
                Ok(updated)
            })
            .await
    }

    async fn read(&self, fields: &[SettingsField]) -> Result<SpellerSettings> {
        let fetch = self.storage_fields(fields);
        let section = self.host.read_section(self.scope, self.resource.as_ref()).await?;
        Ok(self.map_read(section.restrict_to(&fetch)).restrict_to(fields))
    }
}

/// The repository behind a config target. Dictionary targets hold only a
/// word list and have no repository.
pub fn config_target_to_repository(
    target: &ConfigTarget,
    host: &Arc<HostSettings>,
) -> Result<Option<Box<dyn ConfigRepository>>> {
    match target {
        ConfigTarget::Dictionary { .. } => Ok(None),
        ConfigTarget::CSpell {
            config_uri, name, ..
        } => Ok(Some(Box::new(CSpellConfigRepository::new(
            config_uri,
            Some(name.clone()),
        )?))),
        ConfigTarget::VSCode { scope, doc_uri, .. } => {
            let scope = target_scope_to_configuration_scope(*scope)?;
            Ok(Some(Box::new(VSCodeRepository::new(
                Arc::clone(host),
                scope,
                doc_uri.clone(),
            ))))
        }
    }
}

/// Apply one updater to every target in the list. Targets without a
/// repository are an error, not a silent skip.
pub async fn apply_update_to_config_targets(
    updater: &ConfigUpdater,
    targets: &[ConfigTarget],
    host: &Arc<HostSettings>,
) -> Result<()> {
    let repos = targets
        .iter()
        .map(|t| {
            config_target_to_repository(t, host)?
                .ok_or_else(|| ClientError::NoRepositoryForTarget(format!("dictionary:{}", t.name())))
        })
        .collect::<Result<Vec<_>>>()?;

    try_join_all(repos.iter().map(|r| r.update(updater))).await?;
    Ok(())
}

/// Read the given fields from every target in the list.
pub async fn read_from_config_targets(
    fields: &[SettingsField],
    targets: &[ConfigTarget],
    host: &Arc<HostSettings>,
) -> Result<Vec<(ConfigTarget, SpellerSettings)>> {
    let mut results = Vec::with_capacity(targets.len());
    for target in targets {
        let repo = config_target_to_repository(target, host)?
            .ok_or_else(|| ClientError::NoRepositoryForTarget(format!("dictionary:{}", target.name())))?;
        let value = repo.read(fields).await?;
        results.push((target.clone(), value));
    }
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::words::merge_words;
    use serde_json::Value;
    use tempfile::TempDir;

    fn words_updater(words: &[&str]) -> ConfigUpdater {
        let words: Vec<String> = words.iter().map(|w| w.to_string()).collect();
        ConfigUpdater::update_words(move |current| merge_words(current, &words))
    }

    fn host_for(dir: &TempDir) -> Arc<HostSettings> {
        let folder_uri = Url::from_directory_path(dir.path().join("project")).unwrap();
        Arc::new(HostSettings::new(
            dir.path().join("user-settings.json"),
            Some(dir.path().join("workspace-settings.json")),
            vec![WorkspaceFolder {
                name: "project".to_string(),
                uri: folder_uri,
            }],
        ))
    }

    #[tokio::test]
    async fn test_cspell_repository_update_and_read() {
        let dir = TempDir::new().unwrap();
        let repo = CSpellConfigRepository::from_path(dir.path().join("cspell.json"));

        repo.update(&words_updater(&["one", "two"])).await.unwrap();
        let value = repo.read(&[SettingsField::Words]).await.unwrap();
        assert_eq!(value.words, Some(vec!["one".to_string(), "two".to_string()]));
    }

    #[tokio::test]
    async fn test_user_scope_words_write_redirects_to_user_words() {
        let dir = TempDir::new().unwrap();
        let host = host_for(&dir);
        let repo = VSCodeRepository::new(Arc::clone(&host), ConfigurationScope::User, None);

        repo.update(&words_updater(&["zebra"])).await.unwrap();

        let content = tokio::fs::read_to_string(dir.path().join("user-settings.json"))
            .await
            .unwrap();
        let value: Value = serde_json::from_str(&content).unwrap();
        assert_eq!(value["spellbridge.userWords"][0], "zebra");
        assert!(value.get("spellbridge.words").is_none());
    }

    #[tokio::test]
    async fn test_user_scope_read_merges_user_words_and_words() {
        let dir = TempDir::new().unwrap();
        let host = host_for(&dir);
        tokio::fs::write(
            dir.path().join("user-settings.json"),
            r#"{"spellbridge.userWords": ["stored"], "spellbridge.words": ["legacy"]}"#,
        )
        .await
        .unwrap();

        let repo = VSCodeRepository::new(Arc::clone(&host), ConfigurationScope::User, None);
        let value = repo.read(&[SettingsField::Words]).await.unwrap();
        assert_eq!(
            value.words,
            Some(vec!["stored".to_string(), "legacy".to_string()])
        );
    }

    #[tokio::test]
    async fn test_user_scope_update_keeps_existing_user_words() {
        let dir = TempDir::new().unwrap();
        let host = host_for(&dir);
        tokio::fs::write(
            dir.path().join("user-settings.json"),
            r#"{"spellbridge.userWords": ["existing"]}"#,
        )
        .await
        .unwrap();

        let repo = VSCodeRepository::new(Arc::clone(&host), ConfigurationScope::User, None);
        repo.update(&words_updater(&["added"])).await.unwrap();

        let value = repo.read(&[SettingsField::UserWords]).await.unwrap();
        assert_eq!(
            value.user_words,
            Some(vec!["added".to_string(), "existing".to_string()])
        );
    }

    #[tokio::test]
    async fn test_workspace_scope_words_pass_through() {
        let dir = TempDir::new().unwrap();
        let host = host_for(&dir);
        let repo = VSCodeRepository::new(Arc::clone(&host), ConfigurationScope::Workspace, None);

        repo.update(&words_updater(&["local"])).await.unwrap();

        let content = tokio::fs::read_to_string(dir.path().join("workspace-settings.json"))
            .await
            .unwrap();
        let value: Value = serde_json::from_str(&content).unwrap();
        assert_eq!(value["spellbridge.words"][0], "local");
        assert!(value.get("spellbridge.userWords").is_none());
    }

    #[tokio::test]
    async fn test_workspace_folder_resolution() {
        let dir = TempDir::new().unwrap();
        let host = host_for(&dir);

        let user = VSCodeRepository::new(Arc::clone(&host), ConfigurationScope::User, None);
        assert!(user.workspace_folder().is_none());

        let ws = VSCodeRepository::new(Arc::clone(&host), ConfigurationScope::Workspace, None);
        assert_eq!(ws.workspace_folder().unwrap().name, "project");

        let doc = Url::from_file_path(dir.path().join("project").join("a.md")).unwrap();
        let folder =
            VSCodeRepository::new(Arc::clone(&host), ConfigurationScope::Folder, Some(doc));
        assert_eq!(folder.workspace_folder().unwrap().name, "project");
    }

    #[tokio::test]
    async fn test_dictionary_target_has_no_repository() {
        let dir = TempDir::new().unwrap();
        let host = host_for(&dir);
        let target = ConfigTarget::dictionary(
            Url::from_file_path(dir.path().join("words.txt")).unwrap(),
            TargetScope::Unknown,
            None,
        );
        assert!(config_target_to_repository(&target, &host).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_apply_update_to_targets_rejects_dictionary_targets() {
        let dir = TempDir::new().unwrap();
        let host = host_for(&dir);
        let targets = vec![ConfigTarget::dictionary(
            Url::from_file_path(dir.path().join("words.txt")).unwrap(),
            TargetScope::Unknown,
            None,
        )];
        let err = apply_update_to_config_targets(&words_updater(&["x"]), &targets, &host)
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::NoRepositoryForTarget(_)));
    }
}
