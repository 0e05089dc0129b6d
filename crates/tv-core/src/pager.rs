//! Incremental list rendering: a pagination cursor over the filtered view
//! plus the renderer that materializes it batch by batch into a host
//! [`ListView`].
//!
//! # States
//! ```text
//!  Initial      position = 0, nothing materialized
//!  Loading      a batch ticket is out; further triggers are no-ops
//!  Partial      0 < position < len, "more" indicator shown
//!  Exhausted    position == len, indicator absent, loads are no-ops
//! ```
//!
//! Every reset bumps the [`Generation`].  A batch begun against an older
//! generation is discarded when it completes.

use std::ops::Range;

use tracing::debug;
use tv_proto::config::{DEFAULT_NEAR_BOTTOM_THRESHOLD, DEFAULT_PAGE_SIZE};
use tv_proto::ChannelRecord;

/// How far into the current view items have been materialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationCursor {
    position: usize,
    page_size: usize,
}

impl PaginationCursor {
    /// A zero page size is bumped to 1 so the cursor always makes progress.
    pub fn new(page_size: usize) -> Self {
        Self {
            position: 0,
            page_size: page_size.max(1),
        }
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// The next slice to materialize from a view of `len` items, if any.
    pub fn next_range(&self, len: usize) -> Option<Range<usize>> {
        if self.position >= len {
            return None;
        }
        Some(self.position..(self.position + self.page_size).min(len))
    }

    fn advance_to(&mut self, end: usize) {
        debug_assert!(end >= self.position);
        self.position = self.position.max(end);
    }

    fn reset(&mut self) {
        self.position = 0;
    }
}

impl Default for PaginationCursor {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}

/// Tag of one filtered view's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Generation(pub u64);

/// An in-flight batch: which generation it belongs to and what it covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchTicket {
    generation: Generation,
    range: Range<usize>,
}

impl BatchTicket {
    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn range(&self) -> Range<usize> {
        self.range.clone()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchOutcome {
    Appended(usize),
    /// The view was reset after the batch began; nothing was appended.
    Stale,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placeholder {
    Loading,
    NoResults,
    CatalogLoadFailed,
}

/// Minimal view capability the renderer drives.  The host owns the widgets.
pub trait ListView {
    /// Drop every materialized item and any placeholder.
    fn clear(&mut self);
    fn append_batch(&mut self, items: &[ChannelRecord]);
    fn show_placeholder(&mut self, placeholder: Placeholder);
    fn set_more_available(&mut self, more: bool);
    fn set_highlight(&mut self, index: Option<usize>);
}

/// Scroll position reported by the host, in whatever unit it lays out in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollMetrics {
    pub offset: f64,
    pub viewport: f64,
    pub content: f64,
}

impl ScrollMetrics {
    pub fn new(offset: f64, viewport: f64, content: f64) -> Self {
        Self {
            offset,
            viewport,
            content,
        }
    }

    pub fn near_bottom(&self, threshold: f64) -> bool {
        self.offset + self.viewport >= self.content - threshold
    }
}

pub struct ListRenderer {
    items: Vec<ChannelRecord>,
    cursor: PaginationCursor,
    generation: Generation,
    in_flight: bool,
    threshold: f64,
}

impl ListRenderer {
    pub fn new(page_size: usize, threshold: f64) -> Self {
        Self {
            items: Vec::new(),
            cursor: PaginationCursor::new(page_size),
            generation: Generation::default(),
            in_flight: false,
            threshold,
        }
    }

    /// A renderer in the Initial state over `items`, without touching any
    /// view.
    pub fn with_items(items: Vec<ChannelRecord>, page_size: usize, threshold: f64) -> Self {
        Self {
            items,
            ..Self::new(page_size, threshold)
        }
    }

    pub fn items(&self) -> &[ChannelRecord] {
        &self.items
    }

    /// A materialized item of the current view.
    pub fn materialized(&self, index: usize) -> Option<&ChannelRecord> {
        if index < self.cursor.position() {
            self.items.get(index)
        } else {
            None
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn position(&self) -> usize {
        self.cursor.position()
    }

    pub fn page_size(&self) -> usize {
        self.cursor.page_size()
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight
    }

    pub fn is_exhausted(&self) -> bool {
        self.cursor.position() >= self.items.len()
    }

    pub fn has_more(&self) -> bool {
        !self.is_exhausted()
    }

    /// Replace the filtered view.  Clears the host view, rewinds the cursor,
    /// abandons any in-flight batch and materializes the first page (or the
    /// no-results placeholder).
    pub fn reset<V: ListView + ?Sized>(&mut self, items: Vec<ChannelRecord>, view: &mut V) {
        self.items = items;
        self.cursor.reset();
        self.in_flight = false;
        self.generation = Generation(self.generation.0 + 1);
        debug!(
            "pager: reset to generation {} with {} items",
            self.generation.0,
            self.items.len()
        );

        view.clear();
        view.set_highlight(None);
        if self.items.is_empty() {
            view.set_more_available(false);
            view.show_placeholder(Placeholder::NoResults);
            return;
        }
        self.load_batch(view);
    }

    /// Reserve the next batch.  `None` when exhausted or a batch is already
    /// in flight.
    pub fn begin_batch(&mut self) -> Option<BatchTicket> {
        if self.in_flight {
            debug!("pager: batch already in flight, ignoring trigger");
            return None;
        }
        let range = self.cursor.next_range(self.items.len())?;
        self.in_flight = true;
        Some(BatchTicket {
            generation: self.generation,
            range,
        })
    }

    /// Materialize a reserved batch, unless its view has been superseded.
    pub fn complete_batch<V: ListView + ?Sized>(
        &mut self,
        ticket: BatchTicket,
        view: &mut V,
    ) -> BatchOutcome {
        if ticket.generation != self.generation {
            debug!(
                "pager: discarding stale batch {:?} from generation {} (current {})",
                ticket.range, ticket.generation.0, self.generation.0
            );
            return BatchOutcome::Stale;
        }

        let BatchTicket { range, .. } = ticket;
        let end = range.end.min(self.items.len());
        let start = range.start.min(end);
        view.append_batch(&self.items[start..end]);
        self.cursor.advance_to(end);
        self.in_flight = false;
        view.set_more_available(self.has_more());
        debug!(
            "pager: appended {} items, position {}/{}",
            end - start,
            self.cursor.position(),
            self.items.len()
        );
        BatchOutcome::Appended(end - start)
    }

    /// Begin and complete one batch.  Returns the number of items appended.
    pub fn load_batch<V: ListView + ?Sized>(&mut self, view: &mut V) -> usize {
        match self.begin_batch() {
            Some(ticket) => match self.complete_batch(ticket, view) {
                BatchOutcome::Appended(n) => n,
                BatchOutcome::Stale => 0,
            },
            None => 0,
        }
    }

    /// Host scroll callback.  Loads the next batch when the viewport is
    /// within the threshold of the bottom of the content.
    pub fn on_scroll<V: ListView + ?Sized>(
        &mut self,
        metrics: ScrollMetrics,
        view: &mut V,
    ) -> usize {
        if metrics.near_bottom(self.threshold) {
            self.load_batch(view)
        } else {
            0
        }
    }
}

impl Default for ListRenderer {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE, DEFAULT_NEAR_BOTTOM_THRESHOLD)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct RecordingView {
        items: Vec<ChannelRecord>,
        placeholder: Option<Placeholder>,
        more: bool,
        clears: usize,
    }

    impl ListView for RecordingView {
        fn clear(&mut self) {
            self.items.clear();
            self.placeholder = None;
            self.clears += 1;
        }
        fn append_batch(&mut self, items: &[ChannelRecord]) {
            self.items.extend_from_slice(items);
        }
        fn show_placeholder(&mut self, placeholder: Placeholder) {
            self.placeholder = Some(placeholder);
        }
        fn set_more_available(&mut self, more: bool) {
            self.more = more;
        }
        fn set_highlight(&mut self, _index: Option<usize>) {}
    }

    fn channels(n: usize) -> Vec<ChannelRecord> {
        (0..n)
            .map(|i| ChannelRecord::new(format!("ch{}", i), format!("u{}", i)))
            .collect()
    }

    #[test]
    fn test_cursor_ranges() {
        let cursor = PaginationCursor::new(50);
        assert_eq!(cursor.next_range(120), Some(0..50));
        assert_eq!(cursor.next_range(10), Some(0..10));
        assert_eq!(cursor.next_range(0), None);
        assert_eq!(PaginationCursor::new(0).page_size(), 1);
    }

    #[test]
    fn test_three_batches_exhaust_120_items() {
        let mut view = RecordingView::default();
        let mut renderer = ListRenderer::with_items(channels(120), 50, 150.0);

        assert_eq!(renderer.load_batch(&mut view), 50);
        assert!(view.more);
        assert_eq!(renderer.load_batch(&mut view), 50);
        assert_eq!(renderer.load_batch(&mut view), 20);
        assert_eq!(renderer.position(), 120);
        assert!(!view.more);
        assert!(renderer.is_exhausted());

        assert_eq!(renderer.load_batch(&mut view), 0);
        assert_eq!(view.items.len(), 120);
        assert_eq!(view.items, channels(120));
    }

    #[test]
    fn test_reset_loads_first_page() {
        let mut view = RecordingView::default();
        let mut renderer = ListRenderer::new(50, 150.0);

        renderer.reset(channels(7), &mut view);
        assert_eq!(renderer.position(), 7);
        assert_eq!(view.items.len(), 7);
        assert!(!view.more);

        renderer.reset(channels(80), &mut view);
        assert_eq!(renderer.position(), 50);
        assert_eq!(view.items.len(), 50);
        assert!(view.more);
        assert_eq!(view.clears, 2);
    }

    #[test]
    fn test_empty_view_shows_placeholder() {
        let mut view = RecordingView::default();
        let mut renderer = ListRenderer::new(50, 150.0);
        renderer.reset(Vec::new(), &mut view);
        assert_eq!(view.placeholder, Some(Placeholder::NoResults));
        assert!(view.items.is_empty());
        assert!(!view.more);
        assert!(!renderer.is_loading());
        assert_eq!(renderer.load_batch(&mut view), 0);
    }

    #[test]
    fn test_single_flight_guard() {
        let mut view = RecordingView::default();
        let mut renderer = ListRenderer::with_items(channels(200), 50, 150.0);

        let ticket = renderer.begin_batch().unwrap();
        assert!(renderer.is_loading());
        assert!(renderer.begin_batch().is_none());
        assert_eq!(renderer.load_batch(&mut view), 0);

        assert_eq!(renderer.complete_batch(ticket, &mut view), BatchOutcome::Appended(50));
        assert_eq!(view.items.len(), 50);
        assert!(!renderer.is_loading());
    }

    #[test]
    fn test_stale_batch_is_discarded() {
        let mut view = RecordingView::default();
        let mut renderer = ListRenderer::new(10, 150.0);
        renderer.reset(channels(30), &mut view);

        let stale = renderer.begin_batch().unwrap();
        assert_eq!(stale.range(), 10..20);

        let fresh: Vec<_> = channels(30).into_iter().rev().collect();
        renderer.reset(fresh.clone(), &mut view);
        assert_eq!(renderer.complete_batch(stale, &mut view), BatchOutcome::Stale);
        assert_eq!(view.items, fresh[..10].to_vec());
        assert_eq!(renderer.position(), 10);

        // The new generation is not blocked by the abandoned ticket.
        assert_eq!(renderer.load_batch(&mut view), 10);
        assert_eq!(view.items, fresh[..20].to_vec());
    }

    #[test]
    fn test_scroll_trigger_threshold() {
        let mut view = RecordingView::default();
        let mut renderer = ListRenderer::new(50, 150.0);
        renderer.reset(channels(200), &mut view);

        // 1000 + 500 < 2000 - 150
        assert_eq!(renderer.on_scroll(ScrollMetrics::new(1000.0, 500.0, 2000.0), &mut view), 0);
        // 1350 + 500 >= 2000 - 150
        assert_eq!(renderer.on_scroll(ScrollMetrics::new(1350.0, 500.0, 2000.0), &mut view), 50);
        assert_eq!(renderer.position(), 100);
    }

    #[test]
    fn test_materialized_lookup() {
        let mut view = RecordingView::default();
        let mut renderer = ListRenderer::new(2, 150.0);
        renderer.reset(channels(5), &mut view);
        assert!(renderer.materialized(1).is_some());
        assert!(renderer.materialized(2).is_none());
    }
}
