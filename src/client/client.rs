//! Spell-check server client
//!
//! Handles communication with the spell-checking language server via
//! JSON-RPC over stdin/stdout. The server is an opaque collaborator: it
//! owns checking, dictionaries and suggestions; this client only issues the
//! configuration request/notification pair and consumes pushed diagnostics.

use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use lsp_types::{Diagnostic, PublishDiagnosticsParams};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{ChildStdin, ChildStdout, Command};
use tokio::sync::{broadcast, mpsc, oneshot, Mutex};
use tokio::time::timeout;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::settings::fields::SpellerSettings;
use crate::settings::target::ConfigTarget;
use crate::types::{ClientError, Result};

const REQUEST_TIMEOUT_SECS: u64 = 30;

const METHOD_GET_CONFIGURATION: &str = "spellchecker/getConfigurationForDocument";
const METHOD_NOTIFY_SETTINGS_CHANGED: &str = "spellchecker/notifySettingsChanged";
const METHOD_PUBLISH_DIAGNOSTICS: &str = "textDocument/publishDiagnostics";

/// JSON-RPC message types
#[derive(Debug, Serialize, Deserialize)]
struct JsonRpcRequest {
    jsonrpc: String,
    id: u64,
    method: String,
    params: Value,
}

#[derive(Debug, Serialize, Deserialize)]
struct JsonRpcResponse {
    jsonrpc: String,
    id: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<JsonRpcError>,
}

#[derive(Debug, Serialize, Deserialize)]
struct JsonRpcError {
    code: i32,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
}

#[derive(Debug, Serialize, Deserialize)]
struct JsonRpcNotification {
    jsonrpc: String,
    method: String,
    params: Value,
}

/// Per-document configuration as reported by the server: the effective
/// settings plus the ordered list of places configuration can be written.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentConfig {
    #[serde(default)]
    pub settings: SpellerSettings,
    #[serde(default)]
    pub config_targets: Vec<ConfigTarget>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GetConfigurationParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    uri: Option<Url>,
}

/// Diagnostics pushed by the server for one document.
#[derive(Debug, Clone)]
pub struct DiagnosticsFromServer {
    pub uri: Url,
    pub version: Option<i32>,
    pub diagnostics: Vec<Diagnostic>,
}

/// The server operations the configuration subsystem depends on. Kept as a
/// trait so commands and caches can be exercised without a live server.
#[async_trait]
pub trait ConfigProvider: Send + Sync {
    /// Request the per-document effective settings and config-target list.
    async fn configuration_for_document(&self, doc_uri: Option<&Url>) -> Result<DocumentConfig>;

    /// Tell the server settings changed so it re-checks open documents.
    async fn notify_settings_changed(&self) -> Result<()>;
}

type PendingMap = Arc<Mutex<HashMap<u64, oneshot::Sender<Result<Value>>>>>;

/// Client for a single spell-check server process.
pub struct SpellClient {
    workspace_root: PathBuf,

    /// Keeps the server process alive; killed on drop.
    _child: tokio::process::Child,

    /// Next request ID
    next_id: AtomicU64,

    /// Pending requests
    pending: PendingMap,

    /// Channel to send messages to the server
    request_tx: mpsc::UnboundedSender<String>,

    /// Diagnostics pushed by the server, fanned out to subscribers
    diagnostics_tx: broadcast::Sender<DiagnosticsFromServer>,
}

impl SpellClient {
    /// Spawn the server process and start the I/O loops.
    pub async fn spawn(
        command: &str,
        args: &[String],
        workspace_root: PathBuf,
    ) -> Result<Arc<Self>> {
        info!("Spawning spell-check server: {}", command);

        let mut child = Command::new(command)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                ClientError::Protocol(format!("Failed to spawn {command}: {e}. Install it first."))
            })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| ClientError::Protocol("Failed to get stdin".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ClientError::Protocol("Failed to get stdout".to_string()))?;

        let (request_tx, request_rx) = mpsc::unbounded_channel();
        let (diagnostics_tx, _) = broadcast::channel(64);
        let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));

        tokio::spawn(Self::write_loop(stdin, request_rx));
        tokio::spawn(Self::read_loop(
            stdout,
            Arc::clone(&pending),
            diagnostics_tx.clone(),
        ));

        Ok(Arc::new(Self {
            workspace_root,
            _child: child,
            next_id: AtomicU64::new(1),
            pending,
            request_tx,
            diagnostics_tx,
        }))
    }

    pub fn workspace_root(&self) -> &std::path::Path {
        &self.workspace_root
    }

    /// Subscribe to server-pushed diagnostics.
    pub fn subscribe_diagnostics(&self) -> broadcast::Receiver<DiagnosticsFromServer> {
        self.diagnostics_tx.subscribe()
    }

    /// Background task writing framed messages to the server.
    async fn write_loop(mut stdin: ChildStdin, mut request_rx: mpsc::UnboundedReceiver<String>) {
        while let Some(message) = request_rx.recv().await {
            let header = format!("Content-Length: {}\r\n\r\n", message.len());

            if let Err(e) = stdin.write_all(header.as_bytes()).await {
                error!("Failed to write header: {}", e);
                break;
            }
            if let Err(e) = stdin.write_all(message.as_bytes()).await {
                error!("Failed to write message: {}", e);
                break;
            }
            if let Err(e) = stdin.flush().await {
                error!("Failed to flush: {}", e);
                break;
            }
        }
    }

    /// Background task reading framed messages from the server.
    async fn read_loop(
        stdout: ChildStdout,
        pending: PendingMap,
        diagnostics_tx: broadcast::Sender<DiagnosticsFromServer>,
    ) {
        let mut reader = BufReader::new(stdout);
        let mut headers = HashMap::new();

        loop {
            headers.clear();

            // Read headers
            loop {
                let mut line = String::new();
                match reader.read_line(&mut line).await {
                    Ok(0) => {
                        warn!("Server closed stdout");
                        return;
                    }
                    Ok(_) => {
                        let line = line.trim();
                        if line.is_empty() {
                            break;
                        }
                        if let Some((key, value)) = line.split_once(": ") {
                            headers.insert(key.to_string(), value.to_string());
                        }
                    }
                    Err(e) => {
                        error!("Failed to read header: {}", e);
                        return;
                    }
                }
            }

            let content_length: usize = match headers.get("Content-Length") {
                Some(len) => match len.parse() {
                    Ok(len) => len,
                    Err(e) => {
                        error!("Invalid Content-Length: {}", e);
                        continue;
                    }
                },
                None => {
                    error!("Missing Content-Length header");
                    continue;
                }
            };

            let mut content = vec![0u8; content_length];
            if let Err(e) = tokio::io::AsyncReadExt::read_exact(&mut reader, &mut content).await {
                error!("Failed to read content: {}", e);
                return;
            }

            let content_str = match String::from_utf8(content) {
                Ok(s) => s,
                Err(e) => {
                    error!("Invalid UTF-8 in message: {}", e);
                    continue;
                }
            };

            debug!("Received message: {}", content_str);
            Self::handle_message(&content_str, &pending, &diagnostics_tx).await;
        }
    }

    async fn handle_message(
        content: &str,
        pending: &PendingMap,
        diagnostics_tx: &broadcast::Sender<DiagnosticsFromServer>,
    ) {
        // Try to parse as response first
        if let Ok(response) = serde_json::from_str::<JsonRpcResponse>(content) {
            let mut pending_guard = pending.lock().await;
            if let Some(sender) = pending_guard.remove(&response.id) {
                let result = if let Some(result) = response.result {
                    Ok(result)
                } else if let Some(error) = response.error {
                    Err(ClientError::Protocol(format!("Server error: {}", error.message)))
                } else {
                    Err(ClientError::Protocol("No result or error".to_string()))
                };
                let _ = sender.send(result);
            }
            return;
        }

        // Try to parse as notification
        if let Ok(notification) = serde_json::from_str::<JsonRpcNotification>(content) {
            if notification.method == METHOD_PUBLISH_DIAGNOSTICS {
                match serde_json::from_value::<PublishDiagnosticsParams>(notification.params) {
                    Ok(params) => {
                        let update = DiagnosticsFromServer {
                            uri: params.uri,
                            version: params.version,
                            diagnostics: params.diagnostics,
                        };
                        // No subscribers is fine; the tracker may not be up yet.
                        let _ = diagnostics_tx.send(update);
                    }
                    Err(e) => warn!("Invalid publishDiagnostics params: {}", e),
                }
            }
            return;
        }

        warn!("Unknown message type: {}", content);
    }

    /// Send a request and wait for the response.
    async fn send_request<P: Serialize, R: for<'de> Deserialize<'de>>(
        &self,
        method: &str,
        params: P,
    ) -> Result<R> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);

        let request = JsonRpcRequest {
            jsonrpc: "2.0".to_string(),
            id,
            method: method.to_string(),
            params: serde_json::to_value(params)?,
        };

        let message = serde_json::to_string(&request)?;
        debug!("Sending request {}: {}", id, method);

        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(id, tx);

        self.request_tx
            .send(message)
            .map_err(|_| ClientError::Protocol("Failed to send request".to_string()))?;

        let result = timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS), rx)
            .await
            .map_err(|_| ClientError::Timeout(REQUEST_TIMEOUT_SECS))?
            .map_err(|_| ClientError::Protocol("Response channel closed".to_string()))??;

        serde_json::from_value(result)
            .map_err(|e| ClientError::Protocol(format!("Failed to parse response: {e}")))
    }

    /// Send a notification (no response expected).
    async fn send_notification<P: Serialize>(&self, method: &str, params: P) -> Result<()> {
        let notification = JsonRpcNotification {
            jsonrpc: "2.0".to_string(),
            method: method.to_string(),
            params: serde_json::to_value(params)?,
        };

        let message = serde_json::to_string(&notification)?;
        debug!("Sending notification: {}", method);

        self.request_tx
            .send(message)
            .map_err(|_| ClientError::Protocol("Failed to send notification".to_string()))?;

        Ok(())
    }
}

#[async_trait]
impl ConfigProvider for SpellClient {
    async fn configuration_for_document(&self, doc_uri: Option<&Url>) -> Result<DocumentConfig> {
        let params = GetConfigurationParams {
            uri: doc_uri.cloned(),
        };
        self.send_request(METHOD_GET_CONFIGURATION, params).await
    }

    async fn notify_settings_changed(&self) -> Result<()> {
        self.send_notification(METHOD_NOTIFY_SETTINGS_CHANGED, serde_json::json!({}))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::target::TargetScope;

    #[test]
    fn test_document_config_deserializes_target_list() {
        let json = r#"{
            "settings": { "words": ["abc"] },
            "configTargets": [
                { "kind": "dictionary", "name": "terms", "scope": "folder",
                  "dictionaryUri": "file:///w/a/terms.txt" },
                { "kind": "cspell", "name": "cspell.json", "scope": "workspace",
                  "configUri": "file:///w/cspell.json" },
                { "kind": "vscode", "name": "user", "scope": "user" }
            ]
        }"#;

        let config: DocumentConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.settings.words, Some(vec!["abc".to_string()]));
        assert_eq!(config.config_targets.len(), 3);
        assert_eq!(config.config_targets[0].scope(), TargetScope::Folder);
        assert_eq!(config.config_targets[2].name(), "user");
    }

    #[test]
    fn test_document_config_defaults_when_fields_missing() {
        let config: DocumentConfig = serde_json::from_str("{}").unwrap();
        assert!(config.config_targets.is_empty());
    }
}
