//! Config file reading and writing
//!
//! Format-transparent read/update/write of configuration documents. The
//! codec is picked by filename from an ordered rule table; a path matching
//! no rule is an `UnhandledFileType` error for update operations so the
//! caller can show a "format not supported" message instead of a generic
//! failure.

use std::path::Path;

use serde_json::Value;
use tracing::debug;

use crate::settings::fields::{SettingsPatch, SpellerSettings};
use crate::settings::jsonc::{strip_jsonc_comments, to_json_string, ContentFormat};
use crate::types::{ClientError, Result};

const SPACES_JSON: usize = 4;
const SPACES_PACKAGE: usize = 2;

/// Field name package.json nests spell-checker settings under.
const PACKAGE_JSON_SECTION: &str = "cspell";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    PackageJson,
    Json,
    Yaml,
}

/// Ordered dispatch table: first matching rule wins.
const FORMAT_RULES: &[(fn(&str) -> bool, ConfigFormat)] = &[
    (is_package_json, ConfigFormat::PackageJson),
    (is_json, ConfigFormat::Json),
    (is_yaml, ConfigFormat::Yaml),
];

fn is_package_json(name: &str) -> bool {
    name.eq_ignore_ascii_case("package.json")
}

fn is_json(name: &str) -> bool {
    has_suffix(name, ".json") || has_suffix(name, ".jsonc")
}

fn is_yaml(name: &str) -> bool {
    has_suffix(name, ".yml") || has_suffix(name, ".yaml")
}

fn has_suffix(name: &str, suffix: &str) -> bool {
    name.to_ascii_lowercase().ends_with(suffix)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

pub fn config_format_for_path(path: &Path) -> Option<ConfigFormat> {
    let name = file_name(path);
    FORMAT_RULES
        .iter()
        .find(|(matches, _)| matches(&name))
        .map(|(_, format)| *format)
}

pub fn is_handled(path: &Path) -> bool {
    config_format_for_path(path).is_some()
}

fn must_match_format(path: &Path) -> Result<ConfigFormat> {
    config_format_for_path(path).ok_or_else(|| ClientError::UnhandledFileType(file_name(path)))
}

/// Read a configuration document. Resolves to `None` when the file does not
/// exist, or when a package.json has no spell-checker section.
pub async fn read_config_file(path: &Path) -> Result<Option<SpellerSettings>> {
    let format = must_match_format(path)?;
    match read_with_format(path, format).await {
        Ok((settings, _)) => Ok(Some(settings)),
        Err(e) if e.is_not_found() => Ok(None),
        Err(e) => Err(e),
    }
}

/// Read a configuration document, recovering to `default` when missing.
pub async fn read_config_file_or(
    path: &Path,
    default: SpellerSettings,
) -> Result<SpellerSettings> {
    Ok(read_config_file(path).await?.unwrap_or(default))
}

/// Overwrite a configuration document, keeping the existing file's
/// indentation and trailing-newline style when there is one to detect.
pub async fn write_config_file(path: &Path, settings: &SpellerSettings) -> Result<()> {
    let format = must_match_format(path)?;
    let content_format = detect_existing_format(path, format).await;
    write_with_format(path, format, settings, &content_format).await
}

/// Read-modify-write. A missing file starts from the settings template;
/// the patch is applied as a top-level shallow merge.
pub async fn update_config_file<F>(path: &Path, update_fn: F) -> Result<()>
where
    F: FnOnce(&SpellerSettings) -> SettingsPatch,
{
    let format = must_match_format(path)?;
    debug!("Updating config file: {}", path.display());

    match format {
        ConfigFormat::PackageJson => {
            // package.json must already exist; only the nested section is
            // replaced, the rest of the document rides through untouched.
            let content = tokio::fs::read_to_string(path).await?;
            let content_format = ContentFormat::detect(&content);
            let mut pkg: Value = serde_json::from_str(&strip_jsonc_comments(&content))?;
            let mut settings = match pkg.get(PACKAGE_JSON_SECTION) {
                Some(section) => serde_json::from_value(section.clone())?,
                None => SpellerSettings::template(),
            };
            let patch = update_fn(&settings);
            patch.apply(&mut settings);
            set_package_section(&mut pkg, &settings)?;
            let text = to_json_string(&pkg, &content_format, SPACES_PACKAGE)?;
            tokio::fs::write(path, text).await?;
            Ok(())
        }
        ConfigFormat::Json | ConfigFormat::Yaml => {
            let (mut settings, content_format) = match read_with_format(path, format).await {
                Ok(found) => found,
                Err(e) if e.is_not_found() => (
                    SpellerSettings::template(),
                    ContentFormat::default_for(SPACES_JSON),
                ),
                Err(e) => return Err(e),
            };
            let patch = update_fn(&settings);
            patch.apply(&mut settings);
            write_with_format(path, format, &settings, &content_format).await
        }
    }
}

async fn read_with_format(
    path: &Path,
    format: ConfigFormat,
) -> Result<(SpellerSettings, ContentFormat)> {
    let content = tokio::fs::read_to_string(path).await?;
    let content_format = ContentFormat::detect(&content);

    let settings = match format {
        ConfigFormat::Json => serde_json::from_str(&strip_jsonc_comments(&content))?,
        ConfigFormat::Yaml => serde_yaml_ng::from_str(&content)?,
        ConfigFormat::PackageJson => {
            let pkg: Value = serde_json::from_str(&strip_jsonc_comments(&content))?;
            match pkg.get(PACKAGE_JSON_SECTION) {
                Some(section) if section.is_object() => serde_json::from_value(section.clone())?,
                _ => return Err(ClientError::MissingCSpellSection(path.to_path_buf())),
            }
        }
    };

    Ok((settings, content_format))
}

async fn write_with_format(
    path: &Path,
    format: ConfigFormat,
    settings: &SpellerSettings,
    content_format: &ContentFormat,
) -> Result<()> {
    let text = match format {
        ConfigFormat::Json => to_json_string(settings, content_format, SPACES_JSON)?,
        ConfigFormat::Yaml => serde_yaml_ng::to_string(settings)?,
        ConfigFormat::PackageJson => {
            let content = tokio::fs::read_to_string(path).await?;
            let mut pkg: Value = serde_json::from_str(&strip_jsonc_comments(&content))?;
            set_package_section(&mut pkg, settings)?;
            to_json_string(&pkg, &ContentFormat::detect(&content), SPACES_PACKAGE)?
        }
    };

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, text).await?;
    Ok(())
}

fn set_package_section(pkg: &mut Value, settings: &SpellerSettings) -> Result<()> {
    let obj = pkg
        .as_object_mut()
        .ok_or_else(|| ClientError::ConfigError("package.json root is not an object".into()))?;
    obj.insert(
        PACKAGE_JSON_SECTION.to_string(),
        serde_json::to_value(settings)?,
    );
    Ok(())
}

async fn detect_existing_format(path: &Path, format: ConfigFormat) -> ContentFormat {
    let default_indent = match format {
        ConfigFormat::PackageJson => SPACES_PACKAGE,
        _ => SPACES_JSON,
    };
    match tokio::fs::read_to_string(path).await {
        Ok(content) => {
            let mut detected = ContentFormat::detect(&content);
            if detected.indent.is_none() {
                detected.indent = Some(" ".repeat(default_indent));
            }
            detected
        }
        Err(_) => ContentFormat::default_for(default_indent),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::fields::{Patch, SETTINGS_FILE_VERSION};
    use tempfile::TempDir;

    fn words_patch(words: &[&str]) -> SettingsPatch {
        SettingsPatch::set_words(words.iter().map(|w| w.to_string()).collect())
    }

    #[test]
    fn test_format_dispatch_order() {
        assert_eq!(
            config_format_for_path(Path::new("/a/package.json")),
            Some(ConfigFormat::PackageJson)
        );
        assert_eq!(
            config_format_for_path(Path::new("/a/cspell.json")),
            Some(ConfigFormat::Json)
        );
        assert_eq!(
            config_format_for_path(Path::new("/a/cspell.jsonc")),
            Some(ConfigFormat::Json)
        );
        assert_eq!(
            config_format_for_path(Path::new("/a/cspell.yaml")),
            Some(ConfigFormat::Yaml)
        );
        assert_eq!(
            config_format_for_path(Path::new("/a/cspell.yml")),
            Some(ConfigFormat::Yaml)
        );
        assert_eq!(config_format_for_path(Path::new("/a/cspell.toml")), None);
    }

    #[tokio::test]
    async fn test_read_missing_file_is_none() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cspell.json");
        assert!(read_config_file(&path).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_missing_file_seeds_template() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cspell.json");

        update_config_file(&path, |_| words_patch(&["sample", "one", "two"]))
            .await
            .unwrap();

        let settings = read_config_file(&path).await.unwrap().unwrap();
        assert_eq!(settings.version.as_deref(), Some(SETTINGS_FILE_VERSION));
        assert_eq!(
            settings.words,
            Some(vec!["sample".to_string(), "one".to_string(), "two".to_string()])
        );
    }

    #[tokio::test]
    async fn test_yaml_update_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cspell.yaml");

        update_config_file(&path, |_| words_patch(&["sample"])).await.unwrap();

        let settings = read_config_file(&path).await.unwrap().unwrap();
        assert_eq!(settings.words, Some(vec!["sample".to_string()]));
        assert_eq!(settings.version.as_deref(), Some(SETTINGS_FILE_VERSION));
    }

    #[tokio::test]
    async fn test_json_round_trip_preserves_indent() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cspell.json");
        let original = "{\n  \"words\": [\n    \"abc\"\n  ]\n}\n";
        tokio::fs::write(&path, original).await.unwrap();

        let settings = read_config_file(&path).await.unwrap().unwrap();
        write_config_file(&path, &settings).await.unwrap();

        // A 2-space file stays 2-space instead of reformatting to the default.
        let content = tokio::fs::read_to_string(&path).await.unwrap();
        assert_eq!(content, original);

        let reread = read_config_file(&path).await.unwrap().unwrap();
        assert_eq!(reread, settings);
    }

    #[tokio::test]
    async fn test_jsonc_comments_tolerated() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cspell.jsonc");
        tokio::fs::write(&path, "{\n    // project words\n    \"words\": [\"abc\"]\n}\n")
            .await
            .unwrap();

        let settings = read_config_file(&path).await.unwrap().unwrap();
        assert_eq!(settings.words, Some(vec!["abc".to_string()]));
    }

    #[tokio::test]
    async fn test_package_json_without_section_reads_as_missing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("package.json");
        tokio::fs::write(&path, "{\n  \"name\": \"sample-package\"\n}\n")
            .await
            .unwrap();

        assert!(read_config_file(&path).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_package_json_update_preserves_siblings() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("package.json");
        tokio::fs::write(
            &path,
            "{\n  \"name\": \"sample-package\",\n  \"scripts\": {},\n  \"dependencies\": {}\n}\n",
        )
        .await
        .unwrap();

        update_config_file(&path, |_| words_patch(&["abc"])).await.unwrap();

        let content = tokio::fs::read_to_string(&path).await.unwrap();
        let pkg: Value = serde_json::from_str(&content).unwrap();
        assert_eq!(pkg["name"], "sample-package");
        assert!(pkg["scripts"].is_object());
        assert_eq!(pkg[PACKAGE_JSON_SECTION]["words"][0], "abc");

        let settings = read_config_file(&path).await.unwrap().unwrap();
        assert_eq!(settings.words, Some(vec!["abc".to_string()]));
    }

    #[tokio::test]
    async fn test_update_unhandled_extension_fails() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cspell.toml");

        let err = update_config_file(&path, |_| SettingsPatch::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::UnhandledFileType(_)));
    }

    #[tokio::test]
    async fn test_update_patch_unset_removes_field() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cspell.json");
        update_config_file(&path, |_| SettingsPatch {
            language: Patch::Set("en".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();

        update_config_file(&path, |_| SettingsPatch {
            language: Patch::Unset,
            ..Default::default()
        })
        .await
        .unwrap();

        let settings = read_config_file(&path).await.unwrap().unwrap();
        assert_eq!(settings.language, None);
    }
}
