//! Configuration targets
//!
//! A `ConfigTarget` identifies one place configuration can be read from or
//! written to: a config file, a host-settings scope, or a flat-file custom
//! dictionary. The server supplies the list of targets applicable to a
//! document, ordered most-specific first.

use std::path::Path;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::types::{ClientError, Result};

/// Storage mechanism of a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
    Dictionary,
    CSpell,
    VSCode,
}

/// Precedence tier of a target. `Unknown` is used by non-hierarchical file
/// targets (a config file or dictionary not tied to a settings scope).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetScope {
    User,
    Workspace,
    Folder,
    Unknown,
}

impl TargetScope {
    /// Specificity rank: `user < workspace < folder < unknown`. Target lists
    /// are ordered by descending rank (most specific first); inheritance
    /// reads walk ascending rank.
    pub fn rank(&self) -> u8 {
        match self {
            TargetScope::User => 0,
            TargetScope::Workspace => 1,
            TargetScope::Folder => 2,
            TargetScope::Unknown => 3,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TargetScope::User => "user",
            TargetScope::Workspace => "workspace",
            TargetScope::Folder => "folder",
            TargetScope::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ConfigTarget {
    /// A config file (cspell.json, cspell.yaml, package.json, ...).
    CSpell {
        name: String,
        scope: TargetScope,
        #[serde(rename = "configUri")]
        config_uri: Url,
    },
    /// A host-settings scope, optionally bound to a document for folder
    /// resolution.
    VSCode {
        name: String,
        scope: TargetScope,
        #[serde(rename = "docUri", skip_serializing_if = "Option::is_none")]
        doc_uri: Option<Url>,
    },
    /// A flat-file custom dictionary.
    Dictionary {
        name: String,
        scope: TargetScope,
        #[serde(rename = "dictionaryUri")]
        dictionary_uri: Url,
    },
}

impl ConfigTarget {
    pub fn cspell(config_uri: Url, scope: TargetScope) -> Self {
        let name = uri_to_name(&config_uri);
        ConfigTarget::CSpell {
            name,
            scope,
            config_uri,
        }
    }

    pub fn vscode(scope: TargetScope, doc_uri: Option<Url>) -> Self {
        ConfigTarget::VSCode {
            name: scope.as_str().to_string(),
            scope,
            doc_uri,
        }
    }

    pub fn dictionary(dictionary_uri: Url, scope: TargetScope, name: Option<String>) -> Self {
        let name = name.unwrap_or_else(|| uri_to_name(&dictionary_uri));
        ConfigTarget::Dictionary {
            name,
            scope,
            dictionary_uri,
        }
    }

    pub fn kind(&self) -> TargetKind {
        match self {
            ConfigTarget::CSpell { .. } => TargetKind::CSpell,
            ConfigTarget::VSCode { .. } => TargetKind::VSCode,
            ConfigTarget::Dictionary { .. } => TargetKind::Dictionary,
        }
    }

    pub fn scope(&self) -> TargetScope {
        match self {
            ConfigTarget::CSpell { scope, .. }
            | ConfigTarget::VSCode { scope, .. }
            | ConfigTarget::Dictionary { scope, .. } => *scope,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            ConfigTarget::CSpell { name, .. }
            | ConfigTarget::VSCode { name, .. }
            | ConfigTarget::Dictionary { name, .. } => name,
        }
    }
}

/// Friendly display name for a file URI: the basename prefixed with its
/// parent directory when there is one ("project/cspell.json").
pub fn uri_to_name(uri: &Url) -> String {
    let segments: Vec<&str> = uri
        .path_segments()
        .map(|s| s.filter(|p| !p.is_empty()).collect())
        .unwrap_or_default();
    match segments.as_slice() {
        [] => uri.to_string(),
        [only] => (*only).to_string(),
        [.., parent, base] => format!("{parent}/{base}"),
    }
}

/// Convert a target's file URI to a local path.
pub fn uri_to_path(uri: &Url) -> Result<std::path::PathBuf> {
    uri.to_file_path()
        .map_err(|_| ClientError::InvalidPath(Path::new(uri.as_str()).to_path_buf()))
}

/// Check the ordering contract on a server-supplied target list: within
/// each kind, scopes must run most-specific to least-specific. (Kinds
/// interleave: dictionaries come before settings-file configs at a given
/// level, so the list is not globally scope-sorted.) The best-match walk
/// depends on this ordering, so a violation is reported instead of
/// silently producing a wrong partial match.
pub fn verify_target_order(targets: &[ConfigTarget]) -> Result<()> {
    let mut last_rank: std::collections::HashMap<TargetKind, u8> = std::collections::HashMap::new();
    for target in targets {
        let rank = target.scope().rank();
        if let Some(previous) = last_rank.insert(target.kind(), rank) {
            if rank > previous {
                return Err(ClientError::TargetOrderViolation);
            }
        }
    }
    Ok(())
}
