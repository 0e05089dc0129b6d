//! ChannelList: the incrementally filled, searchable list of channels.
//!
//! The list is the host view the pager writes into.  It only ever holds the
//! rows materialized so far; keyboard and mouse movement report `Scrolled`
//! so the app can ask the pager for the next batch.

use ratatui::crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};
use ratatui::{
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::{List, ListItem, ListState, Paragraph},
    Frame,
};

use tv_core::{ListView, Message, Placeholder, ScrollMetrics};
use tv_proto::{ChannelRecord, Locale};

use crate::action::Action;
use crate::theme::{
    style_muted, style_selected_focused, C_LOGO, C_MUTED, C_PLAYING, C_PRIMARY, C_SECONDARY,
};
use crate::widgets::filter_input::{FilterAction, FilterInput};
use crate::widgets::pane_chrome::{pane_chrome, Badge};

const MOUSE_SCROLL_ROWS: usize = 3;

pub struct ChannelList {
    rows: Vec<ChannelRecord>,
    placeholder: Option<Placeholder>,
    more: bool,
    /// Row of the channel last picked for playback.
    highlight: Option<usize>,
    cursor: usize,
    scroll_offset: usize,
    /// List rows visible at the last draw.
    viewport: usize,
    /// Screen area of the rows at the last draw, for mouse hit-testing.
    rows_area: Rect,
    list_state: ListState,
    filter_input: FilterInput,
    locale: Locale,
}

impl ListView for ChannelList {
    fn clear(&mut self) {
        self.rows.clear();
        self.placeholder = None;
        self.cursor = 0;
        self.scroll_offset = 0;
    }

    fn append_batch(&mut self, items: &[ChannelRecord]) {
        self.rows.extend_from_slice(items);
        self.placeholder = None;
    }

    fn show_placeholder(&mut self, placeholder: Placeholder) {
        self.placeholder = Some(placeholder);
    }

    fn set_more_available(&mut self, more: bool) {
        self.more = more;
    }

    fn set_highlight(&mut self, index: Option<usize>) {
        self.highlight = index;
    }
}

impl ChannelList {
    pub fn new(locale: Locale) -> Self {
        let placeholder = match locale {
            Locale::Ar => "ابحث عن قناة...",
            Locale::En => "search channels...",
        };
        Self {
            rows: Vec::new(),
            placeholder: None,
            more: false,
            highlight: None,
            cursor: 0,
            scroll_offset: 0,
            viewport: 0,
            rows_area: Rect::default(),
            list_state: ListState::default(),
            filter_input: FilterInput::new(placeholder),
            locale,
        }
    }

    pub fn rows(&self) -> &[ChannelRecord] {
        &self.rows
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn is_filtering(&self) -> bool {
        self.filter_input.is_active()
    }

    /// Viewport position in rows, for the pager's near-bottom check.
    pub fn scroll_metrics(&self) -> ScrollMetrics {
        ScrollMetrics::new(
            self.scroll_offset as f64,
            self.viewport as f64,
            self.rows.len() as f64,
        )
    }

    fn ensure_visible(&mut self) {
        if self.viewport == 0 {
            return;
        }
        if self.cursor < self.scroll_offset {
            self.scroll_offset = self.cursor;
        } else if self.cursor >= self.scroll_offset + self.viewport {
            self.scroll_offset = self.cursor + 1 - self.viewport;
        }
    }

    fn move_to(&mut self, row: usize) -> Vec<Action> {
        if self.rows.is_empty() {
            return Vec::new();
        }
        self.cursor = row.min(self.rows.len() - 1);
        self.ensure_visible();
        vec![Action::Scrolled]
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> Vec<Action> {
        if self.filter_input.is_active() {
            return match self.filter_input.handle_key(key) {
                FilterAction::Changed(query) => vec![Action::QueryChanged(query)],
                FilterAction::Confirmed | FilterAction::Cancelled | FilterAction::None => {
                    Vec::new()
                }
            };
        }

        let page = self.viewport.max(1);
        match (key.code, key.modifiers) {
            (KeyCode::Char('/'), _) => {
                self.filter_input.activate();
                Vec::new()
            }
            (KeyCode::Char('j'), _) | (KeyCode::Down, _) => self.move_to(self.cursor + 1),
            (KeyCode::Char('k'), _) | (KeyCode::Up, _) => {
                self.move_to(self.cursor.saturating_sub(1))
            }
            (KeyCode::PageDown, _) | (KeyCode::Char('d'), KeyModifiers::CONTROL) => {
                self.move_to(self.cursor + page)
            }
            (KeyCode::PageUp, _) | (KeyCode::Char('u'), KeyModifiers::CONTROL) => {
                self.move_to(self.cursor.saturating_sub(page))
            }
            (KeyCode::Char('g'), _) | (KeyCode::Home, _) => self.move_to(0),
            (KeyCode::Char('G'), _) | (KeyCode::End, _) => self.move_to(usize::MAX),
            (KeyCode::Enter, _) | (KeyCode::Char('l'), _) if !self.rows.is_empty() => {
                vec![Action::Select(self.cursor)]
            }
            _ => Vec::new(),
        }
    }

    pub fn handle_mouse(&mut self, event: MouseEvent) -> Vec<Action> {
        let area = self.rows_area;
        let inside = event.column >= area.x
            && event.column < area.x + area.width
            && event.row >= area.y
            && event.row < area.y + area.height;
        if !inside {
            return Vec::new();
        }
        match event.kind {
            MouseEventKind::ScrollDown => self.move_to(self.cursor + MOUSE_SCROLL_ROWS),
            MouseEventKind::ScrollUp => self.move_to(self.cursor.saturating_sub(MOUSE_SCROLL_ROWS)),
            MouseEventKind::Down(_) => {
                let row = self.scroll_offset + (event.row - area.y) as usize;
                if row < self.rows.len() {
                    self.cursor = row;
                    vec![Action::Select(row)]
                } else {
                    Vec::new()
                }
            }
            _ => Vec::new(),
        }
    }

    fn render_row(&self, idx: usize, record: &ChannelRecord) -> ListItem<'static> {
        let playing = self.highlight == Some(idx);
        let (icon, icon_color) = if playing {
            ("▶ ", C_PLAYING)
        } else {
            ("  ", C_MUTED)
        };
        let name_color = if playing {
            C_PLAYING
        } else if idx == self.cursor {
            C_PRIMARY
        } else {
            C_SECONDARY
        };
        let mut spans = vec![
            Span::styled(icon, Style::default().fg(icon_color)),
            Span::styled(record.name.clone(), Style::default().fg(name_color)),
        ];
        if record.has_logo() {
            spans.push(Span::styled(" ◆", Style::default().fg(C_LOGO)));
        }
        if !record.has_url() {
            spans.push(Span::styled(" ∅", style_muted()));
        }
        ListItem::new(Line::from(spans))
    }

    pub fn draw(&mut self, frame: &mut Frame, area: Rect, focused: bool) {
        let title = match self.locale {
            Locale::Ar => "القنوات",
            Locale::En => "channels",
        };
        let count = format!("{}{}", self.rows.len(), if self.more { "+" } else { "" });
        let badge = (!self.rows.is_empty()).then(|| Badge {
            text: count.as_str(),
            color: C_SECONDARY,
        });
        let block = pane_chrome(title, focused, badge);
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let show_filter = self.filter_input.is_active() || !self.filter_input.is_empty();
        let list_height = if show_filter {
            inner.height.saturating_sub(1)
        } else {
            inner.height
        };
        let rows_area = Rect {
            height: list_height,
            ..inner
        };
        self.rows_area = rows_area;
        self.viewport = list_height as usize;

        if show_filter {
            let filter_area = Rect {
                y: inner.y + list_height,
                height: 1,
                ..inner
            };
            self.filter_input.draw(frame, filter_area);
        }

        if let Some(placeholder) = self.placeholder {
            let text = Message::from(placeholder).text(self.locale);
            frame.render_widget(
                Paragraph::new(Span::styled(format!("  {}", text), style_muted())),
                rows_area,
            );
            return;
        }

        self.ensure_visible();
        let end = (self.scroll_offset + self.viewport).min(self.rows.len());
        let items: Vec<ListItem> = (self.scroll_offset..end)
            .map(|idx| self.render_row(idx, &self.rows[idx]))
            .collect();

        let list = List::new(items)
            .highlight_style(if focused {
                style_selected_focused()
            } else {
                Style::default()
            })
            .highlight_symbol("");
        let selected = (!self.rows.is_empty()).then_some(self.cursor - self.scroll_offset);
        self.list_state.select(selected);
        frame.render_stateful_widget(list, rows_area, &mut self.list_state);
    }
}
