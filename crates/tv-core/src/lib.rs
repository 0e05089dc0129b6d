pub mod browser;
pub mod engine;
pub mod error;
pub mod filter;
pub mod overlay;
pub mod pager;
pub mod session;

pub use browser::{Browser, CatalogStatus};
pub use engine::{
    EngineFactory, EngineFault, EngineSignal, FaultKind, MediaSink, SessionId, StreamEngine,
    HLS_MIME,
};
pub use error::{PlaybackFault, SelectError};
pub use filter::{filter, normalize_query};
pub use overlay::{Message, Overlay};
pub use pager::{
    BatchOutcome, BatchTicket, Generation, ListRenderer, ListView, PaginationCursor, Placeholder,
    ScrollMetrics,
};
pub use session::{
    transition, Notice, PlaybackMode, PlaybackSession, PlaybackSupport, SessionAction,
    SessionEvent, SessionState, Transition,
};
