pub mod channel;
pub mod config;
pub mod platform;

pub use channel::{Catalog, CatalogError, CatalogSource, ChannelRecord, PLACEHOLDER_LOGO};
pub use config::{Config, Locale};
