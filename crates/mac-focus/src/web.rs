//! The web-focus signal: which web application is focused inside a browser.
//!
//! An out-of-process browser extension connects to a local TCP port and
//! streams newline-delimited JSON messages:
//!
//! ```json
//! {"event": "context_change", "app": "figma"}
//! {"event": "context_change", "app": null}
//! ```
//!
//! Most-recent-wins into a single-slot cell; the cell resets to "none" when
//! the peer disconnects (extension unloaded, browser closed). Consumers
//! only ever ask "what is the current web app, if any".

use std::{io, net::SocketAddr, sync::Arc};

use parking_lot::Mutex;
use serde::Deserialize;
use thiserror::Error;
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    net::{TcpListener, TcpStream},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

/// Default port the browser extension connects to.
pub const DEFAULT_PORT: u16 = 6789;

/// Errors from starting the web-focus listener.
#[derive(Debug, Error)]
pub enum Error {
    /// The local socket could not be bound.
    #[error("failed to bind web-focus listener: {0}")]
    Bind(#[from] io::Error),
}

/// Shared single-slot cell holding the most recent web app name.
#[derive(Clone, Default)]
pub struct WebFocus {
    cell: Arc<Mutex<Option<String>>>,
}

impl WebFocus {
    /// The current web app name, if the extension reported one.
    pub fn current(&self) -> Option<String> {
        self.cell.lock().clone()
    }

    /// Replace the cell contents (most-recent-wins).
    pub fn set(&self, app: Option<String>) {
        *self.cell.lock() = app;
    }
}

/// One message from the extension.
#[derive(Debug, Deserialize)]
struct ContextMsg {
    event: String,
    #[serde(default)]
    app: Option<String>,
}

/// Listens on localhost for the browser extension and feeds a [`WebFocus`]
/// cell.
pub struct WebFocusListener {
    port: u16,
    cell: WebFocus,
    cancel: CancellationToken,
}

impl WebFocusListener {
    /// Create a listener feeding `cell`, stoppable via `cancel`.
    pub fn new(port: u16, cell: WebFocus, cancel: CancellationToken) -> Self {
        Self { port, cell, cancel }
    }

    /// Bind and serve until cancelled. Accept errors are logged and the
    /// loop continues; only the initial bind can fail.
    pub async fn run(self) -> Result<(), Error> {
        let addr = SocketAddr::from(([127, 0, 0, 1], self.port));
        let listener = TcpListener::bind(addr).await?;
        info!(%addr, "web_focus_listener_started");

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    debug!("web_focus_listener_stopping");
                    return Ok(());
                }
                accepted = listener.accept() => {
                    match accepted {
                        Ok((stream, peer)) => {
                            debug!(%peer, "web_focus_peer_connected");
                            let cell = self.cell.clone();
                            let cancel = self.cancel.clone();
                            tokio::spawn(async move {
                                serve_peer(stream, cell, cancel).await;
                            });
                        }
                        Err(e) => warn!("web_focus_accept_failed: {}", e),
                    }
                }
            }
        }
    }
}

/// Drain messages from one peer until it disconnects or the listener stops.
async fn serve_peer(stream: TcpStream, cell: WebFocus, cancel: CancellationToken) {
    let mut lines = BufReader::new(stream).lines();
    loop {
        let line = tokio::select! {
            _ = cancel.cancelled() => break,
            line = lines.next_line() => line,
        };
        match line {
            Ok(Some(text)) => {
                if let Some(app) = parse_context_change(&text) {
                    trace!(app = ?app, "web_focus_update");
                    cell.set(app);
                }
            }
            Ok(None) => break,
            Err(e) => {
                debug!("web_focus_peer_read_failed: {}", e);
                break;
            }
        }
    }
    // Connection gone: the extension can no longer retract a stale value,
    // so the cell must not keep one.
    cell.set(None);
    debug!("web_focus_peer_disconnected");
}

/// Parse one message; returns the new cell value for a context change,
/// `None` for unknown events or malformed lines.
fn parse_context_change(text: &str) -> Option<Option<String>> {
    let msg: ContextMsg = match serde_json::from_str(text) {
        Ok(m) => m,
        Err(e) => {
            debug!("web_focus_bad_message: {}", e);
            return None;
        }
    };
    if msg.event != "context_change" {
        return None;
    }
    // The extension occasionally sends the literal string "null".
    let app = msg.app.filter(|a| !a.is_empty() && a.as_str() != "null");
    Some(app)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_context_change() {
        assert_eq!(
            parse_context_change(r#"{"event":"context_change","app":"figma"}"#),
            Some(Some("figma".to_string()))
        );
        assert_eq!(
            parse_context_change(r#"{"event":"context_change","app":null}"#),
            Some(None)
        );
        assert_eq!(
            parse_context_change(r#"{"event":"context_change","app":"null"}"#),
            Some(None)
        );
    }

    #[test]
    fn ignores_other_events_and_garbage() {
        assert_eq!(
            parse_context_change(r#"{"event":"ping","app":"figma"}"#),
            None
        );
        assert_eq!(parse_context_change("not json"), None);
    }

    #[tokio::test]
    async fn listener_updates_and_resets_cell() {
        use tokio::io::AsyncWriteExt;

        let cell = WebFocus::default();
        let cancel = CancellationToken::new();

        // Bind on an ephemeral port by hand so the test knows the address.
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");
        let serve_cell = cell.clone();
        let serve_cancel = cancel.clone();
        tokio::spawn(async move {
            if let Ok((stream, _)) = listener.accept().await {
                serve_peer(stream, serve_cell, serve_cancel).await;
            }
        });

        let mut stream = TcpStream::connect(addr).await.expect("connect");
        stream
            .write_all(b"{\"event\":\"context_change\",\"app\":\"figma\"}\n")
            .await
            .expect("write");
        stream.flush().await.expect("flush");

        // Wait for the update to land.
        for _ in 0..50 {
            if cell.current().is_some() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        assert_eq!(cell.current(), Some("figma".to_string()));

        // Dropping the connection resets the cell.
        drop(stream);
        for _ in 0..50 {
            if cell.current().is_none() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        assert_eq!(cell.current(), None);
    }
}
