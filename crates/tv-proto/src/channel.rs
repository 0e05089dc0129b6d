use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

/// Logo shown for channels that ship without one.  The player overlay never
/// displays it.
pub const PLACEHOLDER_LOGO: &str = "placeholder.png";

/// One entry of the channel catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelRecord {
    pub name: String,
    /// Stream locator (usually an HLS manifest).  Missing or blank URLs are
    /// kept; such a channel is refused when picked.
    #[serde(default)]
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo: Option<String>,
}

impl ChannelRecord {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            logo: None,
        }
    }

    #[must_use]
    pub fn with_logo(mut self, logo: impl Into<String>) -> Self {
        self.logo = Some(logo.into());
        self
    }

    /// Logo to draw in the list: the channel's own, or the placeholder.
    pub fn logo_or_placeholder(&self) -> &str {
        match self.logo.as_deref() {
            Some(logo) if !logo.trim().is_empty() => logo,
            _ => PLACEHOLDER_LOGO,
        }
    }

    /// Whether the channel has a real logo worth showing in the overlay.
    pub fn has_logo(&self) -> bool {
        self.logo_or_placeholder() != PLACEHOLDER_LOGO
    }

    /// True when the record carries something that can be played.
    pub fn has_url(&self) -> bool {
        !self.url.trim().is_empty()
    }
}

/// The full, ordered channel list.  Fixed once loaded; a reload replaces the
/// whole value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    channels: Vec<ChannelRecord>,
}

impl Catalog {
    pub fn new(channels: Vec<ChannelRecord>) -> Self {
        Self { channels }
    }

    pub fn channels(&self) -> &[ChannelRecord] {
        &self.channels
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }
}

impl From<Vec<ChannelRecord>> for Catalog {
    fn from(channels: Vec<ChannelRecord>) -> Self {
        Self::new(channels)
    }
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("catalog request returned HTTP {status}")]
    Status { status: u16 },

    #[error("catalog request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("failed to read catalog file: {0}")]
    Io(#[from] std::io::Error),

    #[error("catalog is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("catalog is neither a JSON channel array nor an M3U playlist")]
    UnrecognizedFormat,
}

/// Where the catalog comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogSource {
    Url(String),
    File(std::path::PathBuf),
}

impl CatalogSource {
    /// `http://` and `https://` locations are fetched, anything else is read
    /// from disk.
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if raw.starts_with("http://") || raw.starts_with("https://") {
            Self::Url(raw.to_string())
        } else {
            Self::File(std::path::PathBuf::from(raw))
        }
    }
}

impl std::fmt::Display for CatalogSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Url(url) => f.write_str(url),
            Self::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Fetch the catalog once.  There is no retry: the caller shows the failure
/// placeholder instead.
pub async fn load_catalog(source: &CatalogSource) -> Result<Catalog, CatalogError> {
    let content = match source {
        CatalogSource::Url(url) => {
            let response = reqwest::get(url).await?;
            let status = response.status();
            if !status.is_success() {
                return Err(CatalogError::Status {
                    status: status.as_u16(),
                });
            }
            response.text().await?
        }
        CatalogSource::File(path) => read_catalog_file(path).await?,
    };
    let catalog = parse_catalog(&content)?;
    info!("catalog: loaded {} channels from {}", catalog.len(), source);
    Ok(catalog)
}

async fn read_catalog_file(path: &Path) -> Result<String, std::io::Error> {
    tokio::fs::read_to_string(path).await
}

/// Parse either a JSON array of `{name, url, logo?}` objects or an M3U
/// playlist, chosen by the first non-blank character.
pub fn parse_catalog(content: &str) -> Result<Catalog, CatalogError> {
    let trimmed = content.trim_start_matches('\u{feff}').trim_start();
    if trimmed.starts_with('[') {
        parse_catalog_json(trimmed)
    } else if trimmed.starts_with("#EXTM3U") || trimmed.starts_with("#EXTINF") {
        Ok(parse_m3u_from_str(trimmed))
    } else {
        Err(CatalogError::UnrecognizedFormat)
    }
}

pub fn parse_catalog_json(content: &str) -> Result<Catalog, CatalogError> {
    let records: Vec<ChannelRecord> = serde_json::from_str(content)?;
    Ok(Catalog::new(drop_unnamed(records)))
}

fn drop_unnamed(records: Vec<ChannelRecord>) -> Vec<ChannelRecord> {
    records
        .into_iter()
        .filter(|record| {
            let keep = !record.name.trim().is_empty();
            if !keep {
                debug!("catalog: dropping entry without a name (url={})", record.url);
            }
            keep
        })
        .collect()
}

pub fn parse_m3u_from_str(content: &str) -> Catalog {
    let mut channels = Vec::new();
    let mut pending: Option<(String, Option<String>)> = None;

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(rest) = line.strip_prefix("#EXTINF:") {
            if let Some(comma_idx) = find_title_comma(rest) {
                let name = rest[comma_idx + 1..].trim().to_string();
                let logo = extinf_attr(&rest[..comma_idx], "tvg-logo");
                pending = Some((name, logo));
            }
            continue;
        }

        if line.starts_with('#') {
            continue;
        }

        let url = line.to_string();
        let (name, logo) = pending.take().unwrap_or_else(|| (url.clone(), None));

        channels.push(ChannelRecord { name, url, logo });
    }

    Catalog::new(drop_unnamed(channels))
}

/// The title follows the first comma that is not inside a quoted attribute.
fn find_title_comma(extinf: &str) -> Option<usize> {
    let mut quoted = false;
    for (idx, ch) in extinf.char_indices() {
        match ch {
            '"' => quoted = !quoted,
            ',' if !quoted => return Some(idx),
            _ => {}
        }
    }
    None
}

fn extinf_attr(attrs: &str, key: &str) -> Option<String> {
    let needle = format!("{}=\"", key);
    let start = attrs.find(&needle)? + needle.len();
    let end = attrs[start..].find('"')? + start;
    let value = attrs[start..end].trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_json_catalog() {
        let json = r#"[
            {"name": "BBC", "url": "http://a/bbc.m3u8", "logo": "bbc.png"},
            {"name": "CNN", "url": "http://a/cnn.m3u8"}
        ]"#;
        let catalog = parse_catalog(json).unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.channels()[0].logo.as_deref(), Some("bbc.png"));
        assert_eq!(catalog.channels()[1].logo, None);
    }

    #[test]
    fn test_json_drops_blank_names_keeps_blank_urls() {
        let json = r#"[{"name": "  ", "url": "x"}, {"name": "Ok", "url": ""}]"#;
        let catalog = parse_catalog(json).unwrap();
        assert_eq!(catalog.channels(), &[ChannelRecord::new("Ok", "")]);
    }

    #[test]
    fn test_json_missing_url_keeps_the_rest() {
        let json = r#"[{"name": "BBC", "url": "a"}, {"name": "Broken"}]"#;
        let catalog = parse_catalog(json).unwrap();
        assert_eq!(
            catalog.channels(),
            &[ChannelRecord::new("BBC", "a"), ChannelRecord::new("Broken", "")]
        );
        assert!(!catalog.channels()[1].has_url());
    }

    #[test]
    fn test_json_missing_name_is_an_error() {
        let err = parse_catalog(r#"[{"url": "a"}]"#).unwrap_err();
        assert!(matches!(err, CatalogError::Json(_)));
    }

    #[test]
    fn test_parse_m3u_with_logo() {
        let m3u = "#EXTM3U\n\
            #EXTINF:-1 tvg-id=\"a\" tvg-logo=\"http://l/a.png\" group-title=\"News, World\",Al Jazeera\n\
            http://s/aj.m3u8\n\
            #EXTINF:-1,Plain\n\
            http://s/plain.m3u8\n\
            http://s/bare.m3u8\n";
        let catalog = parse_catalog(m3u).unwrap();
        let channels = catalog.channels();
        assert_eq!(channels.len(), 3);
        assert_eq!(channels[0].name, "Al Jazeera");
        assert_eq!(channels[0].logo.as_deref(), Some("http://l/a.png"));
        assert_eq!(channels[1].logo, None);
        assert_eq!(channels[2].name, "http://s/bare.m3u8");
    }

    #[test]
    fn test_unrecognized_format() {
        assert!(matches!(
            parse_catalog("<html></html>"),
            Err(CatalogError::UnrecognizedFormat)
        ));
    }

    #[test]
    fn test_logo_placeholder() {
        let bare = ChannelRecord::new("x", "u");
        assert_eq!(bare.logo_or_placeholder(), PLACEHOLDER_LOGO);
        assert!(!bare.has_logo());
        assert!(!bare.clone().with_logo("").has_logo());
        assert!(bare.with_logo("x.png").has_logo());
    }

    #[test]
    fn test_catalog_source_parse() {
        assert_eq!(
            CatalogSource::parse(" https://x/channels.json "),
            CatalogSource::Url("https://x/channels.json".into())
        );
        assert_eq!(
            CatalogSource::parse("channels.json"),
            CatalogSource::File("channels.json".into())
        );
    }
}
