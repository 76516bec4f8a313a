//! Issue tracker
//!
//! Process-wide cache of the most recent diagnostics pushed by the server
//! per document. Everything that renders issues (decorations, tree views,
//! status) reads from here instead of holding its own copy, so this map is
//! the single source of truth for "what is currently flagged".

use std::collections::HashMap;
use std::sync::Arc;

use lsp_types::Diagnostic;
use tokio::sync::{broadcast, Mutex};
use tracing::debug;
use url::Url;

use crate::client::DiagnosticsFromServer;

/// Change notification: the URIs whose issues were updated or removed.
#[derive(Debug, Clone)]
pub struct IssueTrackerChange {
    pub uris: Vec<Url>,
}

#[derive(Debug, Clone)]
struct FileIssues {
    uri: Url,
    /// Document version the diagnostics were computed against, when the
    /// server reports one. Callers compare it to spot stale issues.
    version: Option<i32>,
    diagnostics: Vec<Diagnostic>,
}

pub struct IssueTracker {
    issues: Mutex<HashMap<String, FileIssues>>,
    changes_tx: broadcast::Sender<IssueTrackerChange>,
}

impl Default for IssueTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl IssueTracker {
    pub fn new() -> Self {
        let (changes_tx, _) = broadcast::channel(64);
        IssueTracker {
            issues: Mutex::new(HashMap::new()),
            changes_tx,
        }
    }

    /// Subscribe to change notifications. Subscribers re-read through the
    /// getters rather than receiving diagnostic payloads directly.
    pub fn subscribe(&self) -> broadcast::Receiver<IssueTrackerChange> {
        self.changes_tx.subscribe()
    }

    /// Record a server push for a document. Last write wins.
    pub async fn handle_diagnostics(&self, update: DiagnosticsFromServer) {
        let key = update.uri.to_string();
        debug!(
            "Diagnostics for {}: {} issue(s)",
            key,
            update.diagnostics.len()
        );
        {
            let mut issues = self.issues.lock().await;
            issues.insert(
                key,
                FileIssues {
                    uri: update.uri.clone(),
                    version: update.version,
                    diagnostics: update.diagnostics,
                },
            );
        }
        let _ = self.changes_tx.send(IssueTrackerChange {
            uris: vec![update.uri],
        });
    }

    /// Drop the entry for a closed document.
    pub async fn handle_document_closed(&self, uri: &Url) {
        let removed = {
            let mut issues = self.issues.lock().await;
            issues.remove(&uri.to_string()).is_some()
        };
        if removed {
            let _ = self.changes_tx.send(IssueTrackerChange {
                uris: vec![uri.clone()],
            });
        }
    }

    /// The cached diagnostics for a document, empty when none.
    pub async fn get_diagnostics(&self, uri: &Url) -> Vec<Diagnostic> {
        let issues = self.issues.lock().await;
        issues
            .get(&uri.to_string())
            .map(|f| f.diagnostics.clone())
            .unwrap_or_default()
    }

    /// The document version the cached diagnostics were computed against.
    pub async fn get_version(&self, uri: &Url) -> Option<i32> {
        let issues = self.issues.lock().await;
        issues.get(&uri.to_string()).and_then(|f| f.version)
    }

    pub async fn get_issue_count(&self, uri: Option<&Url>) -> usize {
        let issues = self.issues.lock().await;
        match uri {
            Some(uri) => issues
                .get(&uri.to_string())
                .map(|f| f.diagnostics.len())
                .unwrap_or(0),
            None => issues.values().map(|f| f.diagnostics.len()).sum(),
        }
    }

    /// All documents with at least one cached issue.
    pub async fn get_uris_with_issues(&self) -> Vec<Url> {
        let issues = self.issues.lock().await;
        issues
            .values()
            .filter(|f| !f.diagnostics.is_empty())
            .map(|f| f.uri.clone())
            .collect()
    }

    /// Forward server pushes into the tracker until the channel closes.
    pub fn spawn_listener(
        tracker: Arc<Self>,
        mut rx: broadcast::Receiver<DiagnosticsFromServer>,
    ) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(update) => tracker.handle_diagnostics(update).await,
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        debug!("Diagnostics listener lagged by {} update(s)", n);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lsp_types::{Position, Range};

    fn diag(word: &str) -> Diagnostic {
        Diagnostic {
            range: Range::new(Position::new(0, 0), Position::new(0, word.len() as u32)),
            message: format!("Unknown word: {word}"),
            ..Default::default()
        }
    }

    fn uri(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    fn push(u: &Url, version: Option<i32>, diagnostics: Vec<Diagnostic>) -> DiagnosticsFromServer {
        DiagnosticsFromServer {
            uri: u.clone(),
            version,
            diagnostics,
        }
    }

    #[tokio::test]
    async fn test_push_replaces_previous_entry() {
        let tracker = IssueTracker::new();
        let doc = uri("file:///w/a.md");

        tracker
            .handle_diagnostics(push(&doc, Some(1), vec![diag("teh"), diag("wrod")]))
            .await;
        assert_eq!(tracker.get_diagnostics(&doc).await.len(), 2);

        tracker
            .handle_diagnostics(push(&doc, Some(2), vec![diag("teh")]))
            .await;
        assert_eq!(tracker.get_diagnostics(&doc).await.len(), 1);
        assert_eq!(tracker.get_version(&doc).await, Some(2));
    }

    #[tokio::test]
    async fn test_close_removes_entry() {
        let tracker = IssueTracker::new();
        let doc = uri("file:///w/a.md");

        tracker
            .handle_diagnostics(push(&doc, None, vec![diag("teh")]))
            .await;
        tracker.handle_document_closed(&doc).await;

        assert!(tracker.get_diagnostics(&doc).await.is_empty());
        assert_eq!(tracker.get_issue_count(None).await, 0);
    }

    #[tokio::test]
    async fn test_uris_with_issues_skips_clean_documents() {
        let tracker = IssueTracker::new();
        let dirty = uri("file:///w/dirty.md");
        let clean = uri("file:///w/clean.md");

        tracker
            .handle_diagnostics(push(&dirty, None, vec![diag("teh")]))
            .await;
        tracker.handle_diagnostics(push(&clean, None, vec![])).await;

        let uris = tracker.get_uris_with_issues().await;
        assert_eq!(uris, vec![dirty]);
    }

    #[tokio::test]
    async fn test_change_events_carry_affected_uri() {
        let tracker = IssueTracker::new();
        let doc = uri("file:///w/a.md");
        let mut rx = tracker.subscribe();

        tracker
            .handle_diagnostics(push(&doc, None, vec![diag("teh")]))
            .await;

        let change = rx.recv().await.unwrap();
        assert_eq!(change.uris, vec![doc]);
    }

    #[tokio::test]
    async fn test_issue_counts() {
        let tracker = IssueTracker::new();
        let a = uri("file:///w/a.md");
        let b = uri("file:///w/b.md");

        tracker
            .handle_diagnostics(push(&a, None, vec![diag("x"), diag("y")]))
            .await;
        tracker.handle_diagnostics(push(&b, None, vec![diag("z")])).await;

        assert_eq!(tracker.get_issue_count(Some(&a)).await, 2);
        assert_eq!(tracker.get_issue_count(None).await, 3);
    }
}
