use thiserror::Error;

use crate::engine::{EngineFault, FaultKind};

/// How the playback session treats a reported fault.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlaybackFault {
    /// Fatal per the engine, but the engine has a recovery primitive for it.
    #[error("recoverable {kind} fault: {details}")]
    Recoverable { kind: FaultKind, details: String },

    /// No recovery path; the session is disposed.
    #[error("fatal playback fault: {details}")]
    Fatal { details: String },

    /// Non-fatal (e.g. a single segment failed); playback continues.
    #[error("transient {kind} fault: {details}")]
    Transient { kind: FaultKind, details: String },

    /// Neither the engine nor native playback is available.
    #[error("stream playback is not supported on this host")]
    Unsupported,
}

impl PlaybackFault {
    pub fn classify(fault: &EngineFault) -> Self {
        let details = fault.details.clone();
        match (fault.fatal, fault.kind) {
            (false, kind) => Self::Transient { kind, details },
            (true, kind @ (FaultKind::Network | FaultKind::Media)) => {
                Self::Recoverable { kind, details }
            }
            (true, FaultKind::Other) => Self::Fatal { details },
        }
    }

    /// A native sink error carries no classification and has no recovery.
    pub fn native(details: impl Into<String>) -> Self {
        Self::Fatal {
            details: details.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectError {
    #[error("channel '{name}' has no stream url")]
    MissingUrl { name: String },

    #[error("no channel at position {index} in the current list")]
    OutOfRange { index: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify() {
        let net = EngineFault::fatal(FaultKind::Network, "timeout");
        assert!(matches!(
            PlaybackFault::classify(&net),
            PlaybackFault::Recoverable {
                kind: FaultKind::Network,
                ..
            }
        ));

        let media = EngineFault::fatal(FaultKind::Media, "bufferAppendError");
        assert!(matches!(
            PlaybackFault::classify(&media),
            PlaybackFault::Recoverable {
                kind: FaultKind::Media,
                ..
            }
        ));

        let other = EngineFault::fatal(FaultKind::Other, "keySystem");
        assert_eq!(
            PlaybackFault::classify(&other),
            PlaybackFault::Fatal {
                details: "keySystem".into()
            }
        );

        let segment = EngineFault::transient(FaultKind::Network, "fragLoadError");
        assert!(matches!(
            PlaybackFault::classify(&segment),
            PlaybackFault::Transient { .. }
        ));
    }

    #[test]
    fn test_display() {
        let err = SelectError::MissingUrl { name: "BBC".into() };
        assert_eq!(err.to_string(), "channel 'BBC' has no stream url");
    }
}
