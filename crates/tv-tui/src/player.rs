//! Host playback: mpv plays the streams, an external player is the fallback.
//!
//! ```text
//!   PlaybackSession ──trait calls──► MpvEngine / HostSink
//!                                         │ PlayerCommand (unbounded, ordered)
//!                                         ▼
//!                                    PlayerWorker ──► mpv IPC / NativeProcess
//!
//!   mpv reader ──MpvEvent──► pump_mpv_events (EventTagger) ──┐
//!   PlayerWorker ──(playlist entry, session)──►┘              │
//!   NativeProcess watcher ───────────────────────────────────┴─► PlaybackEvent
//! ```
//!
//! The core calls its engine and sink synchronously.  Each call becomes a
//! `PlayerCommand` on one queue drained by a single worker task, so mpv sees
//! commands in the order the session issued them.
//!
//! Every `loadfile` creates a new mpv playlist entry.  The worker reports which
//! session each entry belongs to, and the tagger attributes each event to the
//! entry mpv produced it for, so a late event from an earlier channel keeps
//! that channel's session id.

use std::collections::{HashMap, VecDeque};

use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use tv_core::{
    EngineFactory, EngineFault, EngineSignal, FaultKind, MediaSink, SessionId, StreamEngine,
};
use tv_proto::config::{EngineConfig, NativeConfig};

use crate::mpv::{MpvDriver, MpvEvent, MpvHandle};
use crate::native::{NativePlayer, NativeProcess};

/// Lowest mpv log level forwarded as transient faults.
const MPV_LOG_LEVEL: &str = "warn";

/// A signal from mpv or the external player.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackEvent {
    pub session: SessionId,
    pub signal: EngineSignal,
}

#[derive(Debug, Clone, PartialEq)]
enum PlayerCommand {
    Tune(EngineConfig),
    Load { session: SessionId, url: String },
    Recover { session: SessionId, url: String },
    Unload { session: SessionId },
    Play { session: SessionId },
    Pause,
    Spawn { session: SessionId, url: String },
    Kill,
}

#[derive(Clone)]
struct CommandQueue {
    tx: mpsc::UnboundedSender<PlayerCommand>,
}

impl CommandQueue {
    fn push(&self, cmd: PlayerCommand) {
        if let Err(e) = self.tx.send(cmd) {
            warn!("player: worker gone, dropping {:?}", e.0);
        }
    }
}

// ── engine ───────────────────────────────────────────────────────────────────

pub struct MpvEngineFactory {
    queue: CommandQueue,
    available: bool,
}

impl EngineFactory for MpvEngineFactory {
    type Engine = MpvEngine;

    fn is_supported(&self) -> bool {
        self.available
    }

    fn create(&mut self, session: SessionId, config: &EngineConfig) -> MpvEngine {
        self.queue.push(PlayerCommand::Tune(config.clone()));
        MpvEngine {
            session,
            queue: self.queue.clone(),
            url: None,
            attached: false,
        }
    }
}

/// One session's view of the shared mpv process.
pub struct MpvEngine {
    session: SessionId,
    queue: CommandQueue,
    url: Option<String>,
    attached: bool,
}

impl MpvEngine {
    fn load(&self) {
        if let Some(url) = &self.url {
            self.queue.push(PlayerCommand::Load {
                session: self.session,
                url: url.clone(),
            });
        }
    }
}

impl StreamEngine for MpvEngine {
    fn load_source(&mut self, url: &str) {
        self.url = Some(url.to_string());
        if self.attached {
            self.load();
        }
    }

    // mpv owns its window, so attaching is when loading actually begins.
    fn attach_media(&mut self) {
        self.attached = true;
        self.load();
    }

    fn start_load(&mut self) {
        self.load();
    }

    fn recover_media_error(&mut self) {
        if let Some(url) = &self.url {
            self.queue.push(PlayerCommand::Recover {
                session: self.session,
                url: url.clone(),
            });
        }
    }

    fn destroy(&mut self) {
        self.attached = false;
        self.queue.push(PlayerCommand::Unload {
            session: self.session,
        });
    }
}

// ── sink ─────────────────────────────────────────────────────────────────────

pub struct HostSink {
    queue: CommandQueue,
    native_available: bool,
}

impl MediaSink for HostSink {
    fn play(&mut self, session: SessionId) {
        self.queue.push(PlayerCommand::Play { session });
    }

    fn pause(&mut self) {
        self.queue.push(PlayerCommand::Pause);
    }

    fn set_source(&mut self, session: SessionId, url: &str) {
        self.queue.push(PlayerCommand::Spawn {
            session,
            url: url.to_string(),
        });
    }

    fn clear_source(&mut self) {
        self.queue.push(PlayerCommand::Kill);
    }

    // The external player is handed HLS URLs as-is.
    fn can_play_type(&self, _mime: &str) -> bool {
        self.native_available
    }
}

// ── startup ──────────────────────────────────────────────────────────────────

/// Everything the app needs to drive and observe playback.
pub struct Player {
    pub factory: MpvEngineFactory,
    pub sink: HostSink,
    pub events: mpsc::UnboundedReceiver<PlaybackEvent>,
}

impl Player {
    /// Spawn mpv (if found), the command worker and the event pump.
    pub async fn start(native: &NativeConfig) -> Player {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (mpv_tx, mpv_rx) = mpsc::channel::<MpvEvent>(256);
        let (loaded_tx, loaded_rx) = mpsc::unbounded_channel();

        let mut driver = MpvDriver::discover();
        let handle = match driver.as_mut() {
            Some(d) => match d.spawn_and_connect(mpv_tx.clone()).await {
                Ok(h) => {
                    h.request_log_messages(MPV_LOG_LEVEL).await;
                    Some(h)
                }
                Err(e) => {
                    warn!("player: mpv failed to start: {}", e);
                    None
                }
            },
            None => {
                warn!("player: mpv binary not found");
                None
            }
        };
        let available = handle.is_some();

        let native_player = NativePlayer::discover(native);
        match &native_player {
            Some(p) => info!("player: native fallback {}", p.binary().display()),
            None => info!("player: native fallback '{}' not found", native.player),
        }
        let native_available = native_player.is_some();

        tokio::spawn(pump_mpv_events(mpv_rx, loaded_rx, event_tx.clone()));

        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let worker = PlayerWorker {
            driver,
            handle,
            mpv_events: mpv_tx,
            loaded: loaded_tx,
            native: native_player,
            native_process: None,
            events: event_tx,
        };
        tokio::spawn(worker.run(cmd_rx));

        let queue = CommandQueue { tx: cmd_tx };
        Player {
            factory: MpvEngineFactory {
                queue: queue.clone(),
                available,
            },
            sink: HostSink {
                queue,
                native_available,
            },
            events: event_rx,
        }
    }
}

// ── event classification ─────────────────────────────────────────────────────

const NETWORK_HINTS: &[&str] = &[
    "loading failed",
    "network",
    "http",
    "tcp",
    "tls",
    "timed out",
    "timeout",
    "connection",
    "resolve",
    "segment",
];

const MEDIA_HINTS: &[&str] = &[
    "unrecognized file format",
    "no audio or video",
    "demux",
    "decod",
    "codec",
    "invalid data",
    "corrupt",
];

/// Guess the fault class from mpv's error text.
pub fn fault_kind(details: &str) -> FaultKind {
    let lower = details.to_lowercase();
    if NETWORK_HINTS.iter().any(|h| lower.contains(h)) {
        FaultKind::Network
    } else if MEDIA_HINTS.iter().any(|h| lower.contains(h)) {
        FaultKind::Media
    } else {
        FaultKind::Other
    }
}

/// Map an mpv event onto the session's signal vocabulary.
///
/// - `file-loaded`            → manifest parsed
/// - `end-file` reason=error  → fatal fault, classified from `file_error`
/// - `log-message` warn/error → transient fault
pub fn classify_event(event: &MpvEvent) -> Option<EngineSignal> {
    match event.event_name()? {
        "file-loaded" => Some(EngineSignal::ManifestParsed),
        "end-file" if event.reason() == Some("error") => {
            let details = event.file_error().unwrap_or("unknown error");
            Some(EngineSignal::Fault(EngineFault::fatal(
                fault_kind(details),
                details,
            )))
        }
        "log-message" => {
            if !matches!(event.log_level()?, "warn" | "error" | "fatal") {
                return None;
            }
            let text = event.log_text().unwrap_or_default();
            let prefix = event.log_prefix().unwrap_or("mpv");
            Some(EngineSignal::Fault(EngineFault::transient(
                fault_kind(text),
                format!("{}: {}", prefix, text),
            )))
        }
        _ => None,
    }
}

/// Playlist entries remembered after a newer one is loaded, for late events.
const ENTRY_HISTORY: u64 = 16;
/// Events held while their entry's load reply is still on its way.
const MAX_PENDING: usize = 64;

/// Attributes mpv events to the session whose `loadfile` created the playlist
/// entry they are about.
///
/// `start-file` and `end-file` name their entry.  `file-loaded` and log lines
/// do not, so they belong to the entry most recently started.  mpv emits
/// events in order on one connection, which makes that attribution exact.
#[derive(Debug, Default)]
struct EventTagger {
    sessions: HashMap<u64, SessionId>,
    /// Newest entry with a known session.
    newest: u64,
    /// Entry between its `start-file` and `end-file`.
    current: Option<u64>,
    pending: VecDeque<(u64, EngineSignal)>,
}

impl EventTagger {
    /// The worker's `loadfile` for `session` created `entry`.
    fn on_loaded(&mut self, entry: u64, session: SessionId) -> Vec<PlaybackEvent> {
        self.sessions.insert(entry, session);
        self.newest = self.newest.max(entry);
        let newest = self.newest;
        self.sessions.retain(|id, _| id + ENTRY_HISTORY > newest);

        let mut ready = Vec::new();
        let mut held = VecDeque::new();
        for (id, signal) in self.pending.drain(..) {
            if id == entry {
                ready.push(PlaybackEvent { session, signal });
            } else if id > newest {
                held.push_back((id, signal));
            } else {
                debug!("player: dropping {:?} for unclaimed entry {}", signal, id);
            }
        }
        self.pending = held;
        ready
    }

    fn on_event(&mut self, event: &MpvEvent) -> Vec<PlaybackEvent> {
        let name = event.event_name();
        if name == Some("start-file") {
            self.current = event.playlist_entry_id();
            return Vec::new();
        }

        let entry = event.playlist_entry_id().or(self.current);
        if name == Some("end-file") && entry.is_some() && entry == self.current {
            self.current = None;
        }

        let Some(signal) = classify_event(event) else {
            return Vec::new();
        };
        let Some(entry) = entry else {
            debug!("player: {:?} with nothing loaded, ignoring", signal);
            return Vec::new();
        };
        match self.sessions.get(&entry) {
            Some(&session) => vec![PlaybackEvent { session, signal }],
            None if entry > self.newest => {
                if self.pending.len() >= MAX_PENDING {
                    self.pending.pop_front();
                }
                self.pending.push_back((entry, signal));
                Vec::new()
            }
            None => {
                debug!("player: {:?} for forgotten entry {}, ignoring", signal, entry);
                Vec::new()
            }
        }
    }
}

async fn pump_mpv_events(
    mut rx: mpsc::Receiver<MpvEvent>,
    mut loaded: mpsc::UnboundedReceiver<(u64, SessionId)>,
    events: mpsc::UnboundedSender<PlaybackEvent>,
) {
    let mut tagger = EventTagger::default();
    loop {
        let tagged = tokio::select! {
            Some((entry, session)) = loaded.recv() => tagger.on_loaded(entry, session),
            Some(event) = rx.recv() => tagger.on_event(&event),
            else => break,
        };
        for event in tagged {
            if events.send(event).is_err() {
                return;
            }
        }
    }
    debug!("player: mpv event pump exiting");
}

// ── worker ───────────────────────────────────────────────────────────────────

struct PlayerWorker {
    driver: Option<MpvDriver>,
    handle: Option<MpvHandle>,
    mpv_events: mpsc::Sender<MpvEvent>,
    /// Playlist entry created by each `loadfile`, for the event tagger.
    loaded: mpsc::UnboundedSender<(u64, SessionId)>,
    native: Option<NativePlayer>,
    native_process: Option<NativeProcess>,
    events: mpsc::UnboundedSender<PlaybackEvent>,
}

impl PlayerWorker {
    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<PlayerCommand>) {
        while let Some(cmd) = rx.recv().await {
            debug!("player: {:?}", cmd);
            self.execute(cmd).await;
        }
        self.native_process = None;
        if let Some(driver) = self.driver.as_mut() {
            driver.kill().await;
        }
        debug!("player: worker exiting");
    }

    fn emit(&self, session: SessionId, signal: EngineSignal) {
        let _ = self.events.send(PlaybackEvent { session, signal });
    }

    /// The live mpv handle, respawning mpv if the connection dropped.
    async fn connected(&mut self) -> Option<MpvHandle> {
        if let Some(h) = &self.handle {
            let exited = self.driver.as_mut().is_some_and(|d| !d.process_alive());
            if !exited && !h.is_closed() {
                return Some(h.clone());
            }
        }
        let driver = self.driver.as_mut()?;
        warn!("player: mpv connection lost, respawning");
        match driver.spawn_and_connect(self.mpv_events.clone()).await {
            Ok(h) => {
                h.request_log_messages(MPV_LOG_LEVEL).await;
                self.handle = Some(h.clone());
                Some(h)
            }
            Err(e) => {
                error!("player: mpv respawn failed: {}", e);
                self.handle = None;
                None
            }
        }
    }

    /// `loadfile` for `session`; a failure is a fatal fault of that session.
    async fn load(&mut self, session: SessionId, url: &str) {
        let result = match self.connected().await {
            Some(h) => h.load_stream(url).await,
            None => Err(anyhow::anyhow!("mpv unavailable")),
        };
        match result {
            Ok(entry) => {
                debug!("player: session {} loading as playlist entry {}", session, entry);
                let _ = self.loaded.send((entry, session));
            }
            Err(e) => {
                error!("player: load {} failed: {}", url, e);
                self.emit(
                    session,
                    EngineSignal::Fault(EngineFault::fatal(FaultKind::Other, e.to_string())),
                );
            }
        }
    }

    async fn execute(&mut self, cmd: PlayerCommand) {
        match cmd {
            PlayerCommand::Tune(config) => {
                if let Some(h) = self.connected().await {
                    h.apply_tuning(&config).await;
                }
            }
            PlayerCommand::Load { session, url } => self.load(session, &url).await,
            PlayerCommand::Recover { session, url } => {
                let Some(h) = self.connected().await else {
                    self.load(session, &url).await;
                    return;
                };
                match h.is_idle().await {
                    // The file is still loaded: flush it and carry on playing.
                    Ok(false) => match h.drop_buffers().await {
                        Ok(()) => self.emit(session, EngineSignal::ManifestParsed),
                        Err(e) => {
                            warn!("player: session {} drop-buffers failed: {}", session, e);
                            self.load(session, &url).await;
                        }
                    },
                    // An error already unloaded the file; load it again.
                    Ok(true) => self.load(session, &url).await,
                    Err(e) => {
                        debug!("player: idle check failed ({}), reloading", e);
                        self.load(session, &url).await;
                    }
                }
            }
            PlayerCommand::Unload { session } => {
                if let Some(h) = self.handle.clone() {
                    if let Err(e) = h.stop().await {
                        debug!("player: stop for session {} failed: {}", session, e);
                    }
                }
            }
            PlayerCommand::Play { session } => {
                // The external player starts playing on launch.
                if self.native_process.is_some() {
                    return;
                }
                match self.connected().await {
                    Some(h) => {
                        if let Err(e) = h.set_pause(false).await {
                            self.emit(session, EngineSignal::PlayRejected(e.to_string()));
                        }
                    }
                    None => self.emit(
                        session,
                        EngineSignal::PlayRejected("mpv unavailable".to_string()),
                    ),
                }
            }
            PlayerCommand::Pause => {
                if let Some(h) = self.handle.clone() {
                    if let Err(e) = h.set_pause(true).await {
                        debug!("player: pause failed: {}", e);
                    }
                }
            }
            PlayerCommand::Spawn { session, url } => {
                self.native_process = None;
                let Some(native) = &self.native else {
                    self.emit(
                        session,
                        EngineSignal::NativeError("no external player configured".to_string()),
                    );
                    return;
                };
                match native.launch(session, &url, self.events.clone()) {
                    Ok(process) => {
                        self.native_process = Some(process);
                        self.emit(session, EngineSignal::MetadataLoaded);
                    }
                    Err(e) => {
                        error!("player: launching {} failed: {}", native.binary().display(), e);
                        self.emit(session, EngineSignal::NativeError(e.to_string()));
                    }
                }
            }
            PlayerCommand::Kill => {
                if let Some(process) = self.native_process.take() {
                    debug!("player: stopping external player for session {}", process.session());
                }
            }
        }
    }
}
