//! Seams to the external playback collaborators.
//!
//! The streaming engine and the media sink are black boxes.  Commands go down
//! through [`StreamEngine`] / [`MediaSink`]; everything they report comes back
//! as an [`EngineSignal`] tagged with the [`SessionId`] of the handle that
//! produced it, so late signals from a disposed handle can be told apart from
//! the live one.

use tv_proto::config::EngineConfig;

/// Content type probed on the sink before falling back to native playback.
pub const HLS_MIME: &str = "application/vnd.apple.mpegurl";

/// Identifies one `start()` of the playback session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct SessionId(pub u64);

impl SessionId {
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Engine fault classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultKind {
    Network,
    Media,
    Other,
}

impl FaultKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::Media => "media",
            Self::Other => "other",
        }
    }
}

impl std::fmt::Display for FaultKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// A fault as reported by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineFault {
    pub kind: FaultKind,
    pub fatal: bool,
    pub details: String,
}

impl EngineFault {
    pub fn fatal(kind: FaultKind, details: impl Into<String>) -> Self {
        Self {
            kind,
            fatal: true,
            details: details.into(),
        }
    }

    pub fn transient(kind: FaultKind, details: impl Into<String>) -> Self {
        Self {
            kind,
            fatal: false,
            details: details.into(),
        }
    }
}

/// Everything the engine or the sink can report back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineSignal {
    /// Engine parsed the manifest; playback can begin.
    ManifestParsed,
    Fault(EngineFault),
    /// Native playback: the sink loaded the stream's metadata.
    MetadataLoaded,
    /// Native playback: the sink failed.  No classification is available.
    NativeError(String),
    /// The sink refused a play request (e.g. autoplay policy).
    PlayRejected(String),
}

/// One adaptive-streaming engine instance.
///
/// A handle is created per session and destroyed before the next one is
/// created; `destroy` must release the sink binding.
pub trait StreamEngine {
    fn load_source(&mut self, url: &str);
    fn attach_media(&mut self);
    /// Restart loading after a network fault.
    fn start_load(&mut self);
    fn recover_media_error(&mut self);
    fn destroy(&mut self);
}

/// Builds engine handles and answers the capability check.
pub trait EngineFactory {
    type Engine: StreamEngine;

    fn is_supported(&self) -> bool;

    fn create(&mut self, session: SessionId, config: &EngineConfig) -> Self::Engine;
}

/// The single media output.
pub trait MediaSink {
    /// Ask the sink to play.  A rejection is reported asynchronously as
    /// [`EngineSignal::PlayRejected`].
    fn play(&mut self, session: SessionId);
    fn pause(&mut self);
    /// Hand a source straight to the sink (native playback).
    fn set_source(&mut self, session: SessionId, url: &str);
    fn clear_source(&mut self);
    fn can_play_type(&self, mime: &str) -> bool;
}
