//! Target resolution
//!
//! Matches the server-supplied target list for a document against a
//! kind/scope pattern and picks the best tier. Disambiguation between
//! equally good candidates is delegated to a `TargetPicker` so the
//! resolution logic itself carries no UI.

use async_trait::async_trait;

use crate::settings::target::{verify_target_order, ConfigTarget, TargetKind, TargetScope};
use crate::types::{ClientError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KindMask {
    pub dictionary: bool,
    pub cspell: bool,
    pub vscode: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScopeMask {
    pub unknown: bool,
    pub user: bool,
    pub workspace: bool,
    pub folder: bool,
}

pub const KIND_NONE: KindMask = KindMask {
    dictionary: false,
    cspell: false,
    vscode: false,
};
pub const KIND_ALL: KindMask = KindMask {
    dictionary: true,
    cspell: true,
    vscode: true,
};
pub const KIND_CONFIG: KindMask = KindMask {
    dictionary: false,
    cspell: true,
    vscode: true,
};
pub const KIND_CSPELL: KindMask = KindMask {
    dictionary: false,
    cspell: true,
    vscode: false,
};
pub const KIND_VSCODE: KindMask = KindMask {
    dictionary: false,
    cspell: false,
    vscode: true,
};
pub const KIND_DICTIONARY: KindMask = KindMask {
    dictionary: true,
    cspell: false,
    vscode: false,
};

pub const SCOPE_NONE: ScopeMask = ScopeMask {
    unknown: false,
    user: false,
    workspace: false,
    folder: false,
};
pub const SCOPE_ALL: ScopeMask = ScopeMask {
    unknown: true,
    user: true,
    workspace: true,
    folder: true,
};
pub const SCOPE_ALL_BUT_USER: ScopeMask = ScopeMask {
    unknown: true,
    user: false,
    workspace: true,
    folder: true,
};
pub const SCOPE_USER: ScopeMask = ScopeMask {
    unknown: false,
    user: true,
    workspace: false,
    folder: false,
};
pub const SCOPE_WORKSPACE: ScopeMask = ScopeMask {
    unknown: false,
    user: false,
    workspace: true,
    folder: false,
};
pub const SCOPE_FOLDER: ScopeMask = ScopeMask {
    unknown: false,
    user: false,
    workspace: false,
    folder: true,
};

impl KindMask {
    pub fn matches(&self, kind: TargetKind) -> bool {
        match kind {
            TargetKind::Dictionary => self.dictionary,
            TargetKind::CSpell => self.cspell,
            TargetKind::VSCode => self.vscode,
        }
    }
}

impl ScopeMask {
    pub fn matches(&self, scope: TargetScope) -> bool {
        match scope {
            TargetScope::Unknown => self.unknown,
            TargetScope::User => self.user,
            TargetScope::Workspace => self.workspace,
            TargetScope::Folder => self.folder,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchPattern {
    pub kinds: KindMask,
    pub scopes: ScopeMask,
}

impl MatchPattern {
    pub const fn new(kinds: KindMask, scopes: ScopeMask) -> Self {
        MatchPattern { kinds, scopes }
    }

    pub fn negate(&self) -> Self {
        MatchPattern {
            kinds: KindMask {
                dictionary: !self.kinds.dictionary,
                cspell: !self.kinds.cspell,
                vscode: !self.kinds.vscode,
            },
            scopes: ScopeMask {
                unknown: !self.scopes.unknown,
                user: !self.scopes.user,
                workspace: !self.scopes.workspace,
                folder: !self.scopes.folder,
            },
        }
    }
}

/// Pattern presets matching the command surface: "best match" excludes the
/// user scope so a generic add-word lands in the most local store.
pub const PATTERN_BEST: MatchPattern = MatchPattern::new(KIND_ALL, SCOPE_ALL_BUT_USER);
pub const PATTERN_BEST_USER: MatchPattern = MatchPattern::new(KIND_ALL, SCOPE_USER);
pub const PATTERN_BEST_WORKSPACE: MatchPattern = MatchPattern::new(KIND_ALL, SCOPE_WORKSPACE);
pub const PATTERN_BEST_FOLDER: MatchPattern = MatchPattern::new(KIND_ALL, SCOPE_FOLDER);
pub const PATTERN_CSPELL: MatchPattern = MatchPattern::new(KIND_CSPELL, SCOPE_ALL);
pub const PATTERN_VSCODE_USER: MatchPattern = MatchPattern::new(KIND_VSCODE, SCOPE_USER);
pub const PATTERN_VSCODE_WORKSPACE: MatchPattern = MatchPattern::new(KIND_VSCODE, SCOPE_WORKSPACE);
pub const PATTERN_VSCODE_FOLDER: MatchPattern = MatchPattern::new(KIND_VSCODE, SCOPE_FOLDER);

pub fn does_target_match_pattern(target: &ConfigTarget, pattern: &MatchPattern) -> bool {
    pattern.kinds.matches(target.kind()) && pattern.scopes.matches(target.scope())
}

/// All targets matching the pattern, in input order.
pub fn filter_config_targets<'a>(
    targets: &'a [ConfigTarget],
    pattern: &MatchPattern,
) -> Vec<&'a ConfigTarget> {
    targets
        .iter()
        .filter(|t| does_target_match_pattern(t, pattern))
        .collect()
}

/// The targets at the single best-matching tier. The list must be ordered
/// most-specific first; the first matching target establishes the winning
/// `(kind, scope)` pair and collection stops at the first target with a
/// different pair, so a dictionary at folder scope beats a config file at
/// workspace scope even when both match.
pub fn find_best_matching_targets<'a>(
    pattern: &MatchPattern,
    targets: &'a [ConfigTarget],
) -> Result<Vec<&'a ConfigTarget>> {
    verify_target_order(targets)?;

    let mut matches: Vec<&ConfigTarget> = Vec::new();
    for t in targets {
        if !does_target_match_pattern(t, pattern) {
            continue;
        }
        if let Some(first) = matches.first() {
            if first.kind() != t.kind() || first.scope() != t.scope() {
                break;
            }
        }
        matches.push(t);
    }
    Ok(matches)
}

/// Outcome of a pattern resolution, before any user interaction.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Unique(ConfigTarget),
    Ambiguous(Vec<ConfigTarget>),
}

/// Resolve a pattern against a target list. An empty match set is an error:
/// the caller asked for a pattern that structurally cannot be satisfied.
pub fn resolve_targets(pattern: &MatchPattern, targets: &[ConfigTarget]) -> Result<Resolution> {
    let found = find_best_matching_targets(pattern, targets)?;
    match found.as_slice() {
        [] => Err(ClientError::NoMatchingConfigTarget),
        [one] => Ok(Resolution::Unique((*one).clone())),
        many => Ok(Resolution::Ambiguous(
            many.iter().map(|t| (*t).clone()).collect(),
        )),
    }
}

/// Asks the user to choose between equally good candidates. Returning
/// `None` means the choice was dismissed; the operation becomes a silent
/// no-op, never an error.
#[async_trait]
pub trait TargetPicker: Send + Sync {
    async fn pick(&self, candidates: &[ConfigTarget]) -> Option<ConfigTarget>;
}

/// Picker that always takes the first candidate. Used by non-interactive
/// callers.
pub struct FirstMatchPicker;

#[async_trait]
impl TargetPicker for FirstMatchPicker {
    async fn pick(&self, candidates: &[ConfigTarget]) -> Option<ConfigTarget> {
        candidates.first().cloned()
    }
}

/// Resolve and, when ambiguous, defer to the picker. `Ok(None)` means the
/// user canceled.
pub async fn resolve_target_with_picker(
    pattern: &MatchPattern,
    targets: &[ConfigTarget],
    picker: &dyn TargetPicker,
) -> Result<Option<ConfigTarget>> {
    match resolve_targets(pattern, targets)? {
        Resolution::Unique(target) => Ok(Some(target)),
        Resolution::Ambiguous(candidates) => Ok(picker.pick(&candidates).await),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    fn file_url(path: &str) -> Url {
        Url::from_file_path(path).unwrap()
    }

    // Most-specific-first sample list mirroring a folder-in-workspace setup:
    // two folder dictionaries, a workspace config file, folder and workspace
    // host settings, then the user tier.
    fn sample_targets() -> Vec<ConfigTarget> {
        vec![
            ConfigTarget::dictionary(file_url("/w/a/words1.txt"), TargetScope::Folder, None),
            ConfigTarget::dictionary(
                file_url("/w/a/words2.txt"),
                TargetScope::Folder,
                Some("more-words".to_string()),
            ),
            ConfigTarget::cspell(file_url("/w/cspell.json"), TargetScope::Workspace),
            ConfigTarget::vscode(TargetScope::Folder, Some(file_url("/w/a/doc.md"))),
            ConfigTarget::vscode(TargetScope::Workspace, Some(file_url("/w/a/doc.md"))),
            ConfigTarget::dictionary(
                file_url("/home/u/words.txt"),
                TargetScope::User,
                Some("my-words".to_string()),
            ),
            ConfigTarget::vscode(TargetScope::User, None),
        ]
    }

    #[test]
    fn test_best_match_takes_first_tier_only() {
        let targets = sample_targets();
        let pattern = MatchPattern::new(KIND_ALL, SCOPE_ALL);
        let found = find_best_matching_targets(&pattern, &targets).unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(found[0], &targets[0]);
        assert_eq!(found[1], &targets[1]);
    }

    #[test]
    fn test_best_match_user_scope() {
        let targets = sample_targets();
        let found = find_best_matching_targets(&PATTERN_BEST_USER, &targets).unwrap();
        assert_eq!(found, vec![&targets[5]]);
    }

    #[test]
    fn test_best_match_cspell_only() {
        let targets = sample_targets();
        let found = find_best_matching_targets(&PATTERN_CSPELL, &targets).unwrap();
        assert_eq!(found, vec![&targets[2]]);
    }

    #[test]
    fn test_best_match_vscode_workspace() {
        let targets = sample_targets();
        let found = find_best_matching_targets(&PATTERN_VSCODE_WORKSPACE, &targets).unwrap();
        assert_eq!(found, vec![&targets[4]]);
    }

    #[test]
    fn test_empty_pattern_is_an_error() {
        let targets = sample_targets();
        let pattern = MatchPattern::new(KIND_NONE, SCOPE_NONE);
        assert!(matches!(
            resolve_targets(&pattern, &targets),
            Err(ClientError::NoMatchingConfigTarget)
        ));
    }

    #[test]
    fn test_out_of_order_targets_rejected() {
        let targets = vec![
            ConfigTarget::vscode(TargetScope::User, None),
            ConfigTarget::vscode(TargetScope::Folder, None),
        ];
        let pattern = MatchPattern::new(KIND_ALL, SCOPE_ALL);
        assert!(matches!(
            find_best_matching_targets(&pattern, &targets),
            Err(ClientError::TargetOrderViolation)
        ));
    }

    #[test]
    fn test_resolution_unique_vs_ambiguous() {
        let targets = sample_targets();
        match resolve_targets(&PATTERN_CSPELL, &targets).unwrap() {
            Resolution::Unique(t) => assert_eq!(&t, &targets[2]),
            other => panic!("expected unique resolution, got {other:?}"),
        }
        match resolve_targets(&MatchPattern::new(KIND_ALL, SCOPE_ALL), &targets).unwrap() {
            Resolution::Ambiguous(c) => assert_eq!(c.len(), 2),
            other => panic!("expected ambiguous resolution, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_picker_cancel_is_silent() {
        struct CancelPicker;

        #[async_trait]
        impl TargetPicker for CancelPicker {
            async fn pick(&self, _candidates: &[ConfigTarget]) -> Option<ConfigTarget> {
                None
            }
        }

        let targets = sample_targets();
        let pattern = MatchPattern::new(KIND_ALL, SCOPE_ALL);
        let chosen = resolve_target_with_picker(&pattern, &targets, &CancelPicker)
            .await
            .unwrap();
        assert!(chosen.is_none());
    }

    #[test]
    fn test_filter_returns_all_matches() {
        let targets = sample_targets();
        let pattern = MatchPattern::new(KIND_DICTIONARY, SCOPE_ALL);
        let filtered = filter_config_targets(&targets, &pattern);
        assert_eq!(filtered.len(), 3);
    }

    #[test]
    fn test_negate_pattern() {
        let negated = PATTERN_CSPELL.negate();
        assert!(negated.kinds.dictionary);
        assert!(!negated.kinds.cspell);
        assert!(negated.kinds.vscode);
        assert!(!negated.scopes.user);
    }
}
