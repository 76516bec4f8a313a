//! Host editor settings
//!
//! The editor host stores configuration as scope-addressed `settings.json`
//! documents (JSONC): one user-level file plus a `.vscode/settings.json`
//! per workspace and folder. Spell-checker keys are section-prefixed
//! (`spellbridge.words`, ...). Reads and writes here go through the same
//! comment-stripping and format-detection helpers as the config-file codec
//! so the host files keep their formatting.

use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use tracing::debug;
use url::Url;

use crate::settings::fields::{SettingsField, SpellerSettings};
use crate::settings::jsonc::{strip_jsonc_comments, to_json_string, ContentFormat};
use crate::settings::target::TargetScope;
use crate::types::{ClientError, Result};

/// Settings-key prefix for this extension's section.
pub const SECTION: &str = "spellbridge";

const SPACES_SETTINGS: usize = 4;

/// The three host-settings scopes, from most global to most specific.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigurationScope {
    User,
    Workspace,
    Folder,
}

impl ConfigurationScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfigurationScope::User => "user",
            ConfigurationScope::Workspace => "workspace",
            ConfigurationScope::Folder => "folder",
        }
    }
}

/// Scope of a host-settings target as seen by the server protocol.
pub fn configuration_scope_to_target_scope(scope: ConfigurationScope) -> TargetScope {
    match scope {
        ConfigurationScope::User => TargetScope::User,
        ConfigurationScope::Workspace => TargetScope::Workspace,
        ConfigurationScope::Folder => TargetScope::Folder,
    }
}

pub fn target_scope_to_configuration_scope(scope: TargetScope) -> Result<ConfigurationScope> {
    match scope {
        TargetScope::User => Ok(ConfigurationScope::User),
        TargetScope::Workspace => Ok(ConfigurationScope::Workspace),
        TargetScope::Folder => Ok(ConfigurationScope::Folder),
        TargetScope::Unknown => Err(ClientError::ConfigError(
            "no host-settings scope for 'unknown'".into(),
        )),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WorkspaceFolder {
    pub name: String,
    pub uri: Url,
}

/// The host's settings files and workspace layout.
#[derive(Debug, Clone)]
pub struct HostSettings {
    user_file: PathBuf,
    workspace_file: Option<PathBuf>,
    folders: Vec<WorkspaceFolder>,
}

impl HostSettings {
    pub fn new(
        user_file: PathBuf,
        workspace_file: Option<PathBuf>,
        folders: Vec<WorkspaceFolder>,
    ) -> Self {
        HostSettings {
            user_file,
            workspace_file,
            folders,
        }
    }

    /// Host settings rooted at the platform config dir, with no workspace.
    pub fn for_user() -> Result<Self> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| ClientError::ConfigError("cannot determine config directory".into()))?;
        Ok(HostSettings::new(
            config_dir.join("Code").join("User").join("settings.json"),
            None,
            Vec::new(),
        ))
    }

    pub fn workspace_folders(&self) -> &[WorkspaceFolder] {
        &self.folders
    }

    pub fn first_folder(&self) -> Option<&WorkspaceFolder> {
        self.folders.first()
    }

    /// The folder containing `resource`, falling back to the first folder.
    pub fn resolve_folder(&self, resource: Option<&Url>) -> Option<&WorkspaceFolder> {
        if let Some(uri) = resource {
            let found = self.folders.iter().find(|f| {
                let base = f.uri.as_str().trim_end_matches('/');
                uri.as_str() == base
                    || uri
                        .as_str()
                        .strip_prefix(base)
                        .is_some_and(|rest| rest.starts_with('/'))
            });
            if found.is_some() {
                return found;
            }
        }
        self.first_folder()
    }

    /// The settings file backing a scope. Folder scope needs a resource URI
    /// to pick the folder.
    pub fn settings_path(
        &self,
        scope: ConfigurationScope,
        resource: Option<&Url>,
    ) -> Result<PathBuf> {
        match scope {
            ConfigurationScope::User => Ok(self.user_file.clone()),
            ConfigurationScope::Workspace => {
                if let Some(file) = &self.workspace_file {
                    return Ok(file.clone());
                }
                let folder = self.first_folder().ok_or_else(|| {
                    ClientError::ConfigError("no workspace folder open".into())
                })?;
                folder_settings_path(folder)
            }
            ConfigurationScope::Folder => {
                let folder = self.resolve_folder(resource).ok_or_else(|| {
                    ClientError::ConfigError("no workspace folder open".into())
                })?;
                folder_settings_path(folder)
            }
        }
    }

    /// Read this extension's section at one scope, without inheritance.
    pub async fn read_section(
        &self,
        scope: ConfigurationScope,
        resource: Option<&Url>,
    ) -> Result<SpellerSettings> {
        let path = self.settings_path(scope, resource)?;
        let document = read_settings_document(&path).await?;
        section_from_document(&document)
    }

    /// Effective settings for a resource: user, then workspace, then folder,
    /// with more specific values overriding and unset fields falling back.
    pub async fn read_merged(&self, resource: Option<&Url>) -> Result<SpellerSettings> {
        let mut merged = self.read_section(ConfigurationScope::User, None).await?;
        if self.workspace_file.is_some() || !self.folders.is_empty() {
            let ws = self.read_section(ConfigurationScope::Workspace, None).await?;
            overlay(&mut merged, ws);
        }
        if !self.folders.is_empty() {
            let folder = self.read_section(ConfigurationScope::Folder, resource).await?;
            overlay(&mut merged, folder);
        }
        Ok(merged)
    }

    /// Read-modify-write of this extension's section at one scope. `apply`
    /// receives the current section and returns the replacement; only
    /// section-prefixed keys are touched, everything else in the settings
    /// document rides through untouched.
    pub async fn update_section<F>(
        &self,
        scope: ConfigurationScope,
        resource: Option<&Url>,
        apply: F,
    ) -> Result<()>
    where
        F: FnOnce(&SpellerSettings) -> Result<SpellerSettings>,
    {
        let path = self.settings_path(scope, resource)?;
        debug!("Updating host settings at {}: {}", scope.as_str(), path.display());

        let (mut document, format) = read_settings_document_with_format(&path).await?;
        let current = section_from_document(&document)?;
        let updated = apply(&current)?;
        write_section_to_document(&mut document, &updated)?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let text = to_json_string(&Value::Object(document), &format, SPACES_SETTINGS)?;
        tokio::fs::write(&path, text).await?;
        Ok(())
    }
}

fn folder_settings_path(folder: &WorkspaceFolder) -> Result<PathBuf> {
    let base = folder
        .uri
        .to_file_path()
        .map_err(|_| ClientError::InvalidPath(PathBuf::from(folder.uri.as_str())))?;
    Ok(base.join(".vscode").join("settings.json"))
}

async fn read_settings_document(path: &Path) -> Result<Map<String, Value>> {
    Ok(read_settings_document_with_format(path).await?.0)
}

async fn read_settings_document_with_format(
    path: &Path,
) -> Result<(Map<String, Value>, ContentFormat)> {
    match tokio::fs::read_to_string(path).await {
        Ok(content) => {
            let format = ContentFormat::detect(&content);
            let value: Value = serde_json::from_str(&strip_jsonc_comments(&content))?;
            let map = value.as_object().cloned().unwrap_or_default();
            Ok((map, format))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Ok((Map::new(), ContentFormat::default_for(SPACES_SETTINGS)))
        }
        Err(e) => Err(e.into()),
    }
}

/// Collect `spellbridge.*` keys into a settings struct.
fn section_from_document(document: &Map<String, Value>) -> Result<SpellerSettings> {
    let prefix = format!("{SECTION}.");
    let mut section = Map::new();
    for (key, value) in document {
        if let Some(field) = key.strip_prefix(&prefix) {
            section.insert(field.to_string(), value.clone());
        }
    }
    Ok(serde_json::from_value(Value::Object(section))?)
}

/// Write the section back as prefixed keys: fields present in `settings`
/// are set, known fields absent from it are removed.
fn write_section_to_document(
    document: &mut Map<String, Value>,
    settings: &SpellerSettings,
) -> Result<()> {
    let serialized = serde_json::to_value(settings)?;
    let serialized = serialized
        .as_object()
        .cloned()
        .unwrap_or_default();

    for field in ALL_FIELDS {
        let key = format!("{SECTION}.{}", field.key());
        match serialized.get(field.key()) {
            Some(value) => {
                document.insert(key, value.clone());
            }
            None => {
                document.remove(&key);
            }
        }
    }
    // Unknown section keys captured in `extra` write back as-is.
    for (key, value) in &serialized {
        if !ALL_FIELDS.iter().any(|f| f.key() == key) {
            document.insert(format!("{SECTION}.{key}"), value.clone());
        }
    }
    Ok(())
}

const ALL_FIELDS: &[SettingsField] = &[
    SettingsField::Version,
    SettingsField::Import,
    SettingsField::Words,
    SettingsField::UserWords,
    SettingsField::IgnoreWords,
    SettingsField::IgnorePaths,
    SettingsField::Dictionaries,
    SettingsField::DictionaryDefinitions,
    SettingsField::EnabledLanguageIds,
    SettingsField::EnableFiletypes,
    SettingsField::Language,
];

/// Overlay `more_specific` onto `base`: set fields win, unset fall back.
fn overlay(base: &mut SpellerSettings, more_specific: SpellerSettings) {
    macro_rules! take {
        ($field:ident) => {
            if more_specific.$field.is_some() {
                base.$field = more_specific.$field;
            }
        };
    }
    take!(version);
    take!(import);
    take!(words);
    take!(user_words);
    take!(ignore_words);
    take!(ignore_paths);
    take!(dictionaries);
    take!(dictionary_definitions);
    take!(enabled_language_ids);
    take!(enable_filetypes);
    take!(language);
    for (k, v) in more_specific.extra {
        base.extra.insert(k, v);
    }
}
