//! Selection coordinator: the one owner of application state.
//!
//! `Browser` ties the catalog, the filtered list, the playback session and
//! the overlay together.  Hosts feed it input (query text, scroll metrics,
//! picks, engine signals) and read display state back from it.

use tracing::{error, info, warn};
use tv_proto::config::ListConfig;
use tv_proto::{Catalog, CatalogError, ChannelRecord, Locale};

use crate::engine::{EngineFactory, EngineSignal, MediaSink, SessionId};
use crate::error::SelectError;
use crate::filter::{filter, normalize_query};
use crate::overlay::Overlay;
use crate::pager::{ListRenderer, ListView, Placeholder, ScrollMetrics};
use crate::session::{Notice, PlaybackSession};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogStatus {
    Loading,
    Ready,
    Failed,
}

pub struct Browser<V: ListView, F: EngineFactory, S: MediaSink> {
    catalog: Catalog,
    status: CatalogStatus,
    query: String,
    renderer: ListRenderer,
    view: V,
    session: PlaybackSession<F, S>,
    highlight: Option<usize>,
    overlay: Overlay,
    locale: Locale,
}

impl<V: ListView, F: EngineFactory, S: MediaSink> Browser<V, F, S> {
    pub fn new(
        mut view: V,
        session: PlaybackSession<F, S>,
        list: &ListConfig,
        locale: Locale,
    ) -> Self {
        view.clear();
        view.show_placeholder(Placeholder::Loading);
        Self {
            catalog: Catalog::default(),
            status: CatalogStatus::Loading,
            query: String::new(),
            renderer: ListRenderer::new(list.page_size, list.near_bottom_threshold),
            view,
            session,
            highlight: None,
            overlay: Overlay::default(),
            locale,
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn status(&self) -> CatalogStatus {
        self.status
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn renderer(&self) -> &ListRenderer {
        &self.renderer
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    pub fn view_mut(&mut self) -> &mut V {
        &mut self.view
    }

    pub fn session(&self) -> &PlaybackSession<F, S> {
        &self.session
    }

    pub fn highlight(&self) -> Option<usize> {
        self.highlight
    }

    pub fn highlighted_record(&self) -> Option<&ChannelRecord> {
        self.highlight.and_then(|idx| self.renderer.materialized(idx))
    }

    pub fn overlay(&self) -> &Overlay {
        &self.overlay
    }

    pub fn locale(&self) -> Locale {
        self.locale
    }

    /// Install a freshly fetched catalog and show it under the current query.
    pub fn load_catalog(&mut self, catalog: Catalog) {
        info!("browser: catalog ready with {} channels", catalog.len());
        self.catalog = catalog;
        self.status = CatalogStatus::Ready;
        self.refilter();
    }

    /// The catalog could not be fetched.  Not retried.
    pub fn catalog_failed(&mut self, err: &CatalogError) {
        error!("browser: failed to load channels: {}", err);
        self.status = CatalogStatus::Failed;
        self.view.clear();
        self.view.set_more_available(false);
        self.view.show_placeholder(Placeholder::CatalogLoadFailed);
    }

    /// Re-filter on every keystroke.
    pub fn set_query(&mut self, raw: &str) {
        let query = normalize_query(raw);
        if query == self.query && self.status == CatalogStatus::Ready {
            return;
        }
        self.query = query;
        if self.status == CatalogStatus::Ready {
            self.refilter();
        }
    }

    fn refilter(&mut self) {
        let items = filter(self.catalog.channels(), &self.query);
        self.highlight = None;
        self.renderer.reset(items, &mut self.view);
    }

    pub fn on_scroll(&mut self, metrics: ScrollMetrics) -> usize {
        self.renderer.on_scroll(metrics, &mut self.view)
    }

    pub fn load_more(&mut self) -> usize {
        self.renderer.load_batch(&mut self.view)
    }

    /// Pick the channel at `index` of the current list and start playing it.
    pub fn select(&mut self, index: usize) -> Result<(), SelectError> {
        let record = self
            .renderer
            .materialized(index)
            .cloned()
            .ok_or(SelectError::OutOfRange { index })?;

        if !record.has_url() {
            let err = SelectError::MissingUrl {
                name: record.name.clone(),
            };
            warn!("browser: {}", err);
            return Err(err);
        }

        self.highlight = Some(index);
        self.view.set_highlight(Some(index));
        self.overlay.show_loading(&record);

        let notices = self.session.start(&record.url);
        self.apply_notices(notices);
        Ok(())
    }

    /// Route an engine or sink signal to the session.
    pub fn on_engine_signal(&mut self, session: SessionId, signal: EngineSignal) {
        let notices = self.session.handle(session, signal);
        self.apply_notices(notices);
    }

    pub fn stop(&mut self) {
        let notices = self.session.stop();
        self.apply_notices(notices);
        self.overlay.hide();
    }

    fn apply_notices(&mut self, notices: Vec<Notice>) {
        for notice in notices {
            match notice {
                Notice::HideLoading => self.overlay.hide(),
                Notice::ShowMessage(message) => self.overlay.show_message(message),
            }
        }
    }
}
