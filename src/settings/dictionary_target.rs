//! Dictionary targets
//!
//! A uniform add/remove-words interface over the two places words can
//! live: a flat-file custom dictionary, or the `words` list inside a
//! configuration document. Both routes apply the same normalization, so
//! the stored list looks identical no matter where it lands.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::settings::repository::{config_target_to_repository, ConfigRepository};
use crate::settings::target::{uri_to_path, ConfigTarget};
use crate::settings::updater::ConfigUpdater;
use crate::settings::vs_config::HostSettings;
use crate::settings::words::{merge_words, remove_words};
use crate::types::{ClientError, Result};

const DICTIONARY_EXTENSION: &str = "txt";

/// A place words can be added to or removed from.
#[async_trait]
pub trait DictionaryTarget: Send + Sync {
    fn name(&self) -> &str;
    async fn add_words(&self, words: &[String]) -> Result<()>;
    async fn remove_words(&self, words: &[String]) -> Result<()>;
}

/// Flat-file custom dictionary: one word per line, `#` comments stripped on
/// read, rewritten sorted and deduplicated on every touch.
pub struct DictionaryFileTarget {
    name: String,
    path: PathBuf,
}

impl DictionaryFileTarget {
    pub fn new(path: PathBuf, name: Option<String>) -> Self {
        let name = name.unwrap_or_else(|| {
            path.file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string())
        });
        DictionaryFileTarget { name, path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Only `.txt` dictionaries are writable. Checked before any I/O.
    fn check_format(&self) -> Result<()> {
        let supported = self
            .path
            .extension()
            .map(|e| e.eq_ignore_ascii_case(DICTIONARY_EXTENSION))
            .unwrap_or(false);
        if supported {
            Ok(())
        } else {
            Err(ClientError::UnsupportedDictionaryFormat {
                dictionary: self.name.clone(),
                path: self.path.clone(),
            })
        }
    }

    async fn update_words<F>(&self, words: &[String], update: F) -> Result<()>
    where
        F: FnOnce(&[String]) -> Vec<String>,
    {
        self.check_format()?;

        let result = self.update_words_inner(update).await;
        result.map_err(|e| ClientError::DictionaryWrite {
            dictionary: self.name.clone(),
            words: words.to_vec(),
            reason: e.to_string(),
        })
    }

    async fn update_words_inner<F>(&self, update: F) -> Result<()>
    where
        F: FnOnce(&[String]) -> Vec<String>,
    {
        // A missing dictionary reads as empty; it gets created on write.
        let current = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => parse_dictionary_words(&content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e.into()),
        };

        let updated = update(&current);
        debug!(
            "Writing {} words to dictionary \"{}\"",
            updated.len(),
            self.name
        );

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut content = updated.join("\n");
        content.push('\n');
        tokio::fs::write(&self.path, content).await?;
        Ok(())
    }
}

#[async_trait]
impl DictionaryTarget for DictionaryFileTarget {
    fn name(&self) -> &str {
        &self.name
    }

    async fn add_words(&self, words: &[String]) -> Result<()> {
        self.update_words(words, |current| merge_words(current, words))
            .await
    }

    async fn remove_words(&self, words: &[String]) -> Result<()> {
        self.update_words(words, |current| remove_words(current, words))
            .await
    }
}

/// Words stored inside a configuration document, routed through the bound
/// repository so the same sort/dedupe policy applies.
pub struct DictionaryConfigTarget {
    repository: Arc<dyn ConfigRepository>,
    name: String,
}

impl DictionaryConfigTarget {
    pub fn new(repository: Arc<dyn ConfigRepository>) -> Self {
        let name = repository.name().to_string();
        DictionaryConfigTarget { repository, name }
    }
}

#[async_trait]
impl DictionaryTarget for DictionaryConfigTarget {
    fn name(&self) -> &str {
        &self.name
    }

    async fn add_words(&self, words: &[String]) -> Result<()> {
        let words = words.to_vec();
        self.repository
            .update(&ConfigUpdater::update_words(move |current| {
                merge_words(current, &words)
            }))
            .await
    }

    async fn remove_words(&self, words: &[String]) -> Result<()> {
        let words = words.to_vec();
        self.repository
            .update(&ConfigUpdater::update_words(move |current| {
                remove_words(current, &words)
            }))
            .await
    }
}

/// Words read from dictionary file content: trailing `# comment` text is
/// stripped, blanks dropped.
pub fn parse_dictionary_words(content: &str) -> Vec<String> {
    content
        .lines()
        .map(|line| {
            let line = match line.find('#') {
                Some(idx) => &line[..idx],
                None => line,
            };
            line.trim().to_string()
        })
        .filter(|w| !w.is_empty())
        .collect()
}

/// Convert any config target into a dictionary target.
pub fn config_target_to_dictionary_target(
    target: &ConfigTarget,
    host: &Arc<HostSettings>,
) -> Result<Box<dyn DictionaryTarget>> {
    match target {
        ConfigTarget::Dictionary {
            dictionary_uri,
            name,
            ..
        } => Ok(Box::new(DictionaryFileTarget::new(
            uri_to_path(dictionary_uri)?,
            Some(name.clone()),
        ))),
        _ => {
            let repo = config_target_to_repository(target, host)?.ok_or_else(|| {
                ClientError::NoRepositoryForTarget(target.name().to_string())
            })?;
            Ok(Box::new(DictionaryConfigTarget::new(Arc::from(repo))))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::repository::CSpellConfigRepository;
    use tempfile::TempDir;

    fn v(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    async fn read_dictionary(path: &Path) -> Vec<String> {
        parse_dictionary_words(&tokio::fs::read_to_string(path).await.unwrap())
    }

    #[tokio::test]
    async fn test_add_words_creates_sorted_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("words.txt");
        let target = DictionaryFileTarget::new(path.clone(), None);

        target.add_words(&v(&["one", "two", "three"])).await.unwrap();

        let content = tokio::fs::read_to_string(&path).await.unwrap();
        assert_eq!(content, "one\nthree\ntwo\n");
    }

    #[tokio::test]
    async fn test_add_words_merges_dedupes_and_resorts() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("words.txt");
        let target = DictionaryFileTarget::new(path.clone(), None);

        target.add_words(&v(&["one", "two", "three"])).await.unwrap();
        target
            .add_words(&v(&["alpha", "beta", "delta", "zeta", "one"]))
            .await
            .unwrap();

        let content = tokio::fs::read_to_string(&path).await.unwrap();
        assert_eq!(content, "alpha\nbeta\ndelta\none\nthree\ntwo\nzeta\n");
    }

    #[tokio::test]
    async fn test_file_and_config_targets_normalize_identically() {
        let dir = TempDir::new().unwrap();

        let file_target =
            DictionaryFileTarget::new(dir.path().join("words.txt"), Some("file".into()));
        let repo = Arc::new(CSpellConfigRepository::from_path(dir.path().join("cspell.json")));
        let config_target = DictionaryConfigTarget::new(repo.clone());

        for target in [&file_target as &dyn DictionaryTarget, &config_target] {
            target.add_words(&v(&["hello", "a", "B"])).await.unwrap();
            target.add_words(&v(&["there", "Z"])).await.unwrap();
            target.remove_words(&v(&["hello", "a", "code"])).await.unwrap();
        }

        assert_eq!(
            read_dictionary(&dir.path().join("words.txt")).await,
            v(&["B", "there", "Z"])
        );
        let cfg = repo
            .read(&[crate::settings::fields::SettingsField::Words])
            .await
            .unwrap();
        assert_eq!(cfg.words, Some(v(&["B", "there", "Z"])));
    }

    #[tokio::test]
    async fn test_comments_and_blanks_stripped_on_read() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("words.txt");
        tokio::fs::write(&path, "apple # fruit\n\nzebra\nbanana\n")
            .await
            .unwrap();

        let target = DictionaryFileTarget::new(path.clone(), None);
        target.add_words(&v(&["cherry"])).await.unwrap();

        // Any touch heals ordering and drops comment text.
        let content = tokio::fs::read_to_string(&path).await.unwrap();
        assert_eq!(content, "apple\nbanana\ncherry\nzebra\n");
    }

    #[tokio::test]
    async fn test_unsupported_extension_fails_before_io() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("words.dic");
        let target = DictionaryFileTarget::new(path.clone(), Some("terms".into()));

        let err = target.add_words(&v(&["word"])).await.unwrap_err();
        match err {
            ClientError::UnsupportedDictionaryFormat { dictionary, path } => {
                assert_eq!(dictionary, "terms");
                assert!(path.ends_with("words.dic"));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_io_failure_wrapped_with_context() {
        let dir = TempDir::new().unwrap();
        // The target path is a directory, so the write must fail.
        let path = dir.path().join("blocked.txt");
        tokio::fs::create_dir(&path).await.unwrap();

        let target = DictionaryFileTarget::new(path, Some("blocked".into()));
        let err = target.add_words(&v(&["word"])).await.unwrap_err();
        match err {
            ClientError::DictionaryWrite {
                dictionary, words, ..
            } => {
                assert_eq!(dictionary, "blocked");
                assert_eq!(words, v(&["word"]));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_parse_dictionary_words() {
        let words = parse_dictionary_words("one\ntwo # comment\n# full comment\n\nthree\n");
        assert_eq!(words, v(&["one", "two", "three"]));
    }
}
