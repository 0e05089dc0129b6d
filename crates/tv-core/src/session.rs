//! Playback session state machine.
//!
//! [`transition`] is a pure function `(state, event) -> (state, actions)`;
//! [`PlaybackSession`] owns the engine slot and the sink and carries the
//! actions out in order.
//!
//! # States
//! ```text
//!  Idle ──start──▶ Attaching ──manifest/metadata──▶ Playing
//!                     ▲   │                            │
//!                     │   └──────────┬─────────────────┘
//!        recoverable  │          fatal fault
//!        (network,    │              │
//!         media)  Faulted ◀──────────┤
//!                                    ▼
//!                      Faulted(fatal) ──▶ Disposed
//! ```
//! The faulted states are passed through inside one transition;
//! [`Transition::fault`] records which one.  `start` is legal from every
//! state and always disposes the current engine handle before creating the
//! next one.

use tracing::{debug, error, info, warn};
use tv_proto::config::EngineConfig;

use crate::engine::{
    EngineFactory, EngineSignal, FaultKind, MediaSink, SessionId, StreamEngine, HLS_MIME,
};
use crate::error::PlaybackFault;
use crate::overlay::Message;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackMode {
    /// Through the adaptive-streaming engine.
    Engine,
    /// Source handed straight to the sink.
    Native,
}

/// What the host can do, probed on every start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackSupport {
    Engine,
    Native,
    Unsupported,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Idle,
    Attaching { url: String, mode: PlaybackMode },
    Playing { url: String, mode: PlaybackMode },
    Disposed,
}

impl SessionState {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Attaching { .. } => "attaching",
            Self::Playing { .. } => "playing",
            Self::Disposed => "disposed",
        }
    }

    pub fn url(&self) -> Option<&str> {
        match self {
            Self::Attaching { url, .. } | Self::Playing { url, .. } => Some(url.as_str()),
            Self::Idle | Self::Disposed => None,
        }
    }

    pub fn mode(&self) -> Option<PlaybackMode> {
        match self {
            Self::Attaching { mode, .. } | Self::Playing { mode, .. } => Some(*mode),
            Self::Idle | Self::Disposed => None,
        }
    }

    /// An engine handle is bound to the sink in this state.
    pub fn holds_engine(&self) -> bool {
        self.mode() == Some(PlaybackMode::Engine)
    }

    pub fn is_playing(&self) -> bool {
        matches!(self, Self::Playing { .. })
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    Start { url: String, support: PlaybackSupport },
    Signal(EngineSignal),
    Stop,
}

/// Side effects on the engine slot and the sink, in execution order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionAction {
    DestroyEngine,
    CreateEngine,
    LoadSource(String),
    AttachMedia,
    StartLoad,
    RecoverMediaError,
    Play,
    PauseSink,
    AssignSource(String),
    ClearSource,
}

/// Effects that flow up to the coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    HideLoading,
    ShowMessage(Message),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub next: SessionState,
    pub actions: Vec<SessionAction>,
    pub notices: Vec<Notice>,
    pub fault: Option<PlaybackFault>,
}

impl Transition {
    fn stay(state: &SessionState) -> Self {
        Self::to(state.clone())
    }

    fn to(next: SessionState) -> Self {
        Self {
            next,
            actions: Vec::new(),
            notices: Vec::new(),
            fault: None,
        }
    }

    fn actions(mut self, actions: impl IntoIterator<Item = SessionAction>) -> Self {
        self.actions.extend(actions);
        self
    }

    fn notice(mut self, notice: Notice) -> Self {
        self.notices.push(notice);
        self
    }

    fn fault(mut self, fault: PlaybackFault) -> Self {
        self.fault = Some(fault);
        self
    }
}

pub fn transition(state: &SessionState, event: SessionEvent) -> Transition {
    match event {
        SessionEvent::Start { url, support } => on_start(state, url, support),
        SessionEvent::Stop => on_stop(state),
        SessionEvent::Signal(signal) => on_signal(state, signal),
    }
}

/// Release the engine handle, if the state holds one.
fn release_engine(state: &SessionState) -> Option<SessionAction> {
    state.holds_engine().then_some(SessionAction::DestroyEngine)
}

/// Release everything and leave the sink stopped with no source.
fn shut_down(state: &SessionState) -> Vec<SessionAction> {
    release_engine(state)
        .into_iter()
        .chain([SessionAction::PauseSink, SessionAction::ClearSource])
        .collect()
}

fn on_start(state: &SessionState, url: String, support: PlaybackSupport) -> Transition {
    match support {
        PlaybackSupport::Engine => {
            let native_source =
                (state.mode() == Some(PlaybackMode::Native)).then_some(SessionAction::ClearSource);
            Transition::to(SessionState::Attaching {
                url: url.clone(),
                mode: PlaybackMode::Engine,
            })
            .actions(release_engine(state))
            .actions(native_source)
            .actions([
                SessionAction::CreateEngine,
                SessionAction::LoadSource(url),
                SessionAction::AttachMedia,
            ])
        }
        // A new source assignment replaces whatever the sink was playing.
        PlaybackSupport::Native => Transition::to(SessionState::Attaching {
            url: url.clone(),
            mode: PlaybackMode::Native,
        })
        .actions(release_engine(state))
        .actions([SessionAction::AssignSource(url)]),
        PlaybackSupport::Unsupported => Transition::to(SessionState::Idle)
            .actions(shut_down(state))
            .notice(Notice::ShowMessage(Message::Unsupported))
            .fault(PlaybackFault::Unsupported),
    }
}

fn on_stop(state: &SessionState) -> Transition {
    match state.mode() {
        Some(_) => Transition::to(SessionState::Idle).actions(shut_down(state)),
        None => Transition::stay(state),
    }
}

/// Tear the session down and put the failure message up.
fn dispose_with_failure(state: &SessionState, fault: PlaybackFault) -> Transition {
    Transition::to(SessionState::Disposed)
        .actions(shut_down(state))
        .notice(Notice::ShowMessage(Message::PlaybackFailed))
        .fault(fault)
}

fn on_signal(state: &SessionState, signal: EngineSignal) -> Transition {
    match (state, signal) {
        (
            SessionState::Attaching {
                url,
                mode: PlaybackMode::Engine,
            },
            EngineSignal::ManifestParsed,
        )
        | (
            SessionState::Attaching {
                url,
                mode: PlaybackMode::Native,
            },
            EngineSignal::MetadataLoaded,
        ) => Transition::to(SessionState::Playing {
            url: url.clone(),
            mode: state.mode().unwrap_or(PlaybackMode::Engine),
        })
        .actions([SessionAction::Play])
        .notice(Notice::HideLoading),

        (_, EngineSignal::Fault(fault)) if state.holds_engine() => {
            let classified = PlaybackFault::classify(&fault);
            match &classified {
                PlaybackFault::Transient { .. } => Transition::stay(state).fault(classified),
                PlaybackFault::Recoverable { kind, .. } => {
                    let action = match kind {
                        FaultKind::Network => SessionAction::StartLoad,
                        FaultKind::Media | FaultKind::Other => SessionAction::RecoverMediaError,
                    };
                    Transition::to(SessionState::Attaching {
                        url: state.url().unwrap_or_default().to_string(),
                        mode: PlaybackMode::Engine,
                    })
                    .actions([action])
                    .fault(classified)
                }
                PlaybackFault::Fatal { .. } | PlaybackFault::Unsupported => {
                    dispose_with_failure(state, classified)
                }
            }
        }

        (_, EngineSignal::NativeError(details)) if state.mode() == Some(PlaybackMode::Native) => {
            dispose_with_failure(state, PlaybackFault::native(details))
        }

        // Logged by the executor; never a fault.
        (_, EngineSignal::PlayRejected(_)) => Transition::stay(state),

        _ => Transition::stay(state),
    }
}

/// Owns the single engine slot and the sink and applies transitions to them.
pub struct PlaybackSession<F: EngineFactory, S: MediaSink> {
    factory: F,
    sink: S,
    engine: Option<F::Engine>,
    state: SessionState,
    session: SessionId,
    config: EngineConfig,
}

impl<F: EngineFactory, S: MediaSink> PlaybackSession<F, S> {
    pub fn new(factory: F, sink: S, config: EngineConfig) -> Self {
        Self {
            factory,
            sink,
            engine: None,
            state: SessionState::Idle,
            session: SessionId::default(),
            config,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Id of the most recent `start`.  Signals tagged with any other id are
    /// dropped.
    pub fn session_id(&self) -> SessionId {
        self.session
    }

    pub fn has_engine(&self) -> bool {
        self.engine.is_some()
    }

    pub fn factory(&self) -> &F {
        &self.factory
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn support(&self) -> PlaybackSupport {
        if self.factory.is_supported() {
            PlaybackSupport::Engine
        } else if self.sink.can_play_type(HLS_MIME) {
            PlaybackSupport::Native
        } else {
            PlaybackSupport::Unsupported
        }
    }

    /// Start playing `url`, disposing whatever was playing before.
    pub fn start(&mut self, url: &str) -> Vec<Notice> {
        self.session = self.session.next();
        let support = self.support();
        info!(
            "session {}: start {} ({:?}, was {})",
            self.session, url, support, self.state
        );
        self.apply(SessionEvent::Start {
            url: url.to_string(),
            support,
        })
    }

    /// Feed a signal from the engine or sink.
    pub fn handle(&mut self, session: SessionId, signal: EngineSignal) -> Vec<Notice> {
        if session != self.session {
            debug!(
                "session {}: dropping {:?} from superseded session {}",
                self.session, signal, session
            );
            return Vec::new();
        }
        if let EngineSignal::PlayRejected(reason) = &signal {
            warn!("session {}: play request rejected: {}", self.session, reason);
        }
        self.apply(SessionEvent::Signal(signal))
    }

    pub fn stop(&mut self) -> Vec<Notice> {
        // Anything still in flight from the stopped session is now stale.
        self.session = self.session.next();
        self.apply(SessionEvent::Stop)
    }

    fn apply(&mut self, event: SessionEvent) -> Vec<Notice> {
        let Transition {
            next,
            actions,
            notices,
            fault,
        } = transition(&self.state, event);

        if let Some(fault) = &fault {
            match fault {
                PlaybackFault::Transient { .. } => warn!("session {}: {}", self.session, fault),
                PlaybackFault::Recoverable { .. } => {
                    warn!("session {}: {}, recovering", self.session, fault)
                }
                PlaybackFault::Fatal { .. } | PlaybackFault::Unsupported => {
                    error!("session {}: {}", self.session, fault)
                }
            }
        }

        for action in actions {
            self.execute(action);
        }

        if next != self.state {
            info!("session {}: {} -> {}", self.session, self.state, next);
        }
        self.state = next;
        notices
    }

    fn execute(&mut self, action: SessionAction) {
        debug!("session {}: {:?}", self.session, action);
        match action {
            SessionAction::DestroyEngine => {
                if let Some(mut engine) = self.engine.take() {
                    engine.destroy();
                }
            }
            SessionAction::CreateEngine => {
                if let Some(mut leaked) = self.engine.take() {
                    error!(
                        "session {}: engine slot still occupied at create, destroying it first",
                        self.session
                    );
                    leaked.destroy();
                }
                self.engine = Some(self.factory.create(self.session, &self.config));
            }
            SessionAction::LoadSource(url) => {
                if let Some(engine) = self.engine.as_mut() {
                    engine.load_source(&url);
                }
            }
            SessionAction::AttachMedia => {
                if let Some(engine) = self.engine.as_mut() {
                    engine.attach_media();
                }
            }
            SessionAction::StartLoad => {
                if let Some(engine) = self.engine.as_mut() {
                    engine.start_load();
                }
            }
            SessionAction::RecoverMediaError => {
                if let Some(engine) = self.engine.as_mut() {
                    engine.recover_media_error();
                }
            }
            SessionAction::Play => self.sink.play(self.session),
            SessionAction::PauseSink => self.sink.pause(),
            SessionAction::AssignSource(url) => self.sink.set_source(self.session, &url),
            SessionAction::ClearSource => self.sink.clear_source(),
        }
    }
}
