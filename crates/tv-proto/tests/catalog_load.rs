mod common;

use tv_proto::channel::{load_catalog, CatalogError, CatalogSource, ChannelRecord};

const CHANNELS_JSON: &str = r#"[
    {"name": "BBC", "url": "a"},
    {"name": "CNN", "url": "b", "logo": "cnn.png"}
]"#;

#[tokio::test]
async fn loads_catalog_over_http() {
    let url = common::serve_once(200, "OK", CHANNELS_JSON).await;
    let catalog = load_catalog(&CatalogSource::parse(&url)).await.unwrap();
    assert_eq!(
        catalog.channels(),
        &[
            ChannelRecord::new("BBC", "a"),
            ChannelRecord::new("CNN", "b").with_logo("cnn.png"),
        ]
    );
}

#[tokio::test]
async fn http_error_status_is_reported() {
    let url = common::serve_once(404, "Not Found", "").await;
    let err = load_catalog(&CatalogSource::parse(&url)).await.unwrap_err();
    assert!(matches!(err, CatalogError::Status { status: 404 }));
}

#[tokio::test]
async fn transport_failure_is_reported() {
    // Bind then drop so the port is (almost certainly) closed.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let source = CatalogSource::Url(format!("http://{}/channels.json", addr));
    let err = load_catalog(&source).await.unwrap_err();
    assert!(matches!(err, CatalogError::Transport(_)));
}

#[tokio::test]
async fn loads_catalog_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("channels.m3u");
    std::fs::write(
        &path,
        "#EXTM3U\n#EXTINF:-1 tvg-logo=\"bbc.png\",BBC\nhttp://s/bbc.m3u8\n",
    )
    .unwrap();

    let catalog = load_catalog(&CatalogSource::File(path)).await.unwrap();
    assert_eq!(catalog.len(), 1);
    assert_eq!(catalog.channels()[0].logo.as_deref(), Some("bbc.png"));
}

#[tokio::test]
async fn missing_file_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let source = CatalogSource::File(dir.path().join("nope.json"));
    let err = load_catalog(&source).await.unwrap_err();
    assert!(matches!(err, CatalogError::Io(_)));
}
