//! External player used when mpv is unavailable.
//!
//! The player gets the stream URL on its command line and plays it in its own
//! window.  There is no fault classification: the only signals are "it
//! started" and "it exited badly".

use std::path::PathBuf;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use tv_core::{EngineSignal, SessionId};
use tv_proto::config::NativeConfig;

use crate::player::PlaybackEvent;

#[derive(Debug, Clone)]
pub struct NativePlayer {
    binary: PathBuf,
    args: Vec<String>,
}

impl NativePlayer {
    pub fn new(binary: PathBuf, args: Vec<String>) -> Self {
        Self { binary, args }
    }

    /// Resolve the configured player on PATH (or beside the executable).
    pub fn discover(config: &NativeConfig) -> Option<Self> {
        let binary = tv_proto::platform::find_binary(&config.player)?;
        Some(Self::new(binary, config.args.clone()))
    }

    pub fn binary(&self) -> &std::path::Path {
        &self.binary
    }

    /// Start playing `url`.  The returned handle owns the process.
    pub fn launch(
        &self,
        session: SessionId,
        url: &str,
        events: mpsc::UnboundedSender<PlaybackEvent>,
    ) -> std::io::Result<NativeProcess> {
        let mut child = tokio::process::Command::new(&self.binary)
            .args(&self.args)
            .arg(url)
            .stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .kill_on_drop(true)
            .spawn()?;
        info!(
            "native: {} started for session {} (pid {:?})",
            self.binary.display(),
            session,
            child.id()
        );

        let (kill_tx, kill_rx) = oneshot::channel::<()>();
        tokio::spawn(async move {
            tokio::select! {
                status = child.wait() => {
                    let failure = match status {
                        Ok(status) if status.success() => {
                            info!("native: player for session {} closed", session);
                            None
                        }
                        Ok(status) => Some(format!("player exited with {}", status)),
                        Err(e) => Some(format!("waiting on player failed: {}", e)),
                    };
                    if let Some(details) = failure {
                        warn!("native: session {}: {}", session, details);
                        let _ = events.send(PlaybackEvent {
                            session,
                            signal: EngineSignal::NativeError(details),
                        });
                    }
                }
                // Fires on an explicit stop and when the handle is dropped.
                _ = kill_rx => {
                    let _ = child.kill().await;
                    debug!("native: player for session {} stopped", session);
                }
            }
        });

        Ok(NativeProcess {
            session,
            _kill: kill_tx,
        })
    }
}

/// A running external player.  Dropping the handle stops it.
pub struct NativeProcess {
    session: SessionId,
    _kill: oneshot::Sender<()>,
}

impl NativeProcess {
    pub fn session(&self) -> SessionId {
        self.session
    }
}
