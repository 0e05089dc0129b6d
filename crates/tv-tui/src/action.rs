//! Action enum: user intents produced by components and dispatched by the App.

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Play the channel at this row of the list.
    Select(usize),
    /// The list viewport moved; check whether another batch is needed.
    Scrolled,
    QueryChanged(String),
    Stop,
    /// Copy the stream URL of the channel under the cursor.
    CopyUrl,
    Quit,
}
