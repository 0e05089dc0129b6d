//! App: the terminal event loop around the channel browser.
//!
//! - A `tokio::mpsc` channel carries `AppMessage`s in from background tasks
//!   (terminal input, the catalog fetch, playback signals).
//! - The loop draws a frame when something changed, then awaits the next
//!   message.
//! - Components return `Vec<Action>`; the App dispatches each one into the
//!   `Browser`, which owns all playback and list state.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use ratatui::crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
        KeyModifiers,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::Paragraph,
    Terminal,
};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use tv_core::{Browser, Message, PlaybackSession, SelectError};
use tv_proto::channel::load_catalog;
use tv_proto::config::{Config, ListConfig};
use tv_proto::{Catalog, CatalogError, CatalogSource, ChannelRecord, Locale};

use crate::action::Action;
use crate::components::{channel_list::ChannelList, player_pane::PlayerPane};
use crate::player::{HostSink, MpvEngineFactory, PlaybackEvent, Player};
use crate::theme::{style_muted, C_SECONDARY};
use crate::widgets::toast::ToastManager;

type TvBrowser = Browser<ChannelList, MpvEngineFactory, HostSink>;

enum AppMessage {
    Event(Event),
    CatalogLoaded(Catalog),
    CatalogFailed(CatalogError),
    Playback(PlaybackEvent),
}

pub struct App {
    browser: TvBrowser,
    source: CatalogSource,
    playback_events: Option<mpsc::UnboundedReceiver<PlaybackEvent>>,
    /// Channel of the most recent successful pick.
    now_playing: Option<ChannelRecord>,
    toast: ToastManager,
    log_path: PathBuf,
    should_quit: bool,
}

impl App {
    pub fn new(config: &Config, source: CatalogSource, player: Player, log_path: PathBuf) -> Self {
        // The terminal scrolls in rows, so the near-bottom distance is in rows too.
        let list = ListConfig {
            page_size: config.list.page_size,
            near_bottom_threshold: f64::from(config.ui.near_bottom_rows),
        };
        let locale = config.ui.locale;
        let session = PlaybackSession::new(player.factory, player.sink, config.engine.clone());
        let browser = Browser::new(ChannelList::new(locale), session, &list, locale);

        Self {
            browser,
            source,
            playback_events: Some(player.events),
            now_playing: None,
            toast: ToastManager::new(),
            log_path,
            should_quit: false,
        }
    }

    fn locale(&self) -> Locale {
        self.browser.locale()
    }

    pub async fn run(mut self) -> anyhow::Result<()> {
        debug!("run(): enabling raw mode");
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;
        debug!("run(): terminal created, size={:?}", terminal.size());

        let (tx, mut rx) = mpsc::channel::<AppMessage>(1024);

        // ── Background task: keyboard/mouse events ────────────────────────────
        let event_tx = tx.clone();
        tokio::task::spawn_blocking(move || loop {
            match event::read() {
                Ok(ev) => {
                    if event_tx.blocking_send(AppMessage::Event(ev)).is_err() {
                        break;
                    }
                }
                Err(_) => break,
            }
        });

        // ── Background task: catalog fetch (once, never retried) ──────────────
        self.toast.spinner(Message::Loading.text(self.locale()));
        let source = self.source.clone();
        let catalog_tx = tx.clone();
        tokio::spawn(async move {
            info!("catalog: loading from {}", source);
            let msg = match load_catalog(&source).await {
                Ok(catalog) => AppMessage::CatalogLoaded(catalog),
                Err(e) => AppMessage::CatalogFailed(e),
            };
            let _ = catalog_tx.send(msg).await;
        });

        // ── Background task: playback signals → AppMessage ────────────────────
        if let Some(mut events) = self.playback_events.take() {
            let playback_tx = tx.clone();
            tokio::spawn(async move {
                while let Some(ev) = events.recv().await {
                    if playback_tx.send(AppMessage::Playback(ev)).await.is_err() {
                        break;
                    }
                }
            });
        }

        // Toast expiry + spinner animation.
        let mut ui_tick = tokio::time::interval(Duration::from_millis(100));
        ui_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        // ── Main loop ─────────────────────────────────────────────────────────
        let mut needs_redraw = true;
        loop {
            if needs_redraw {
                terminal.draw(|f| self.draw(f))?;
                // The list viewport is only known after a draw; a tall terminal
                // may already be near the bottom of the first batch.
                needs_redraw = self.fill_viewport();
                if needs_redraw {
                    continue;
                }
            }

            if self.should_quit {
                break;
            }

            tokio::select! {
                Some(msg) = rx.recv() => {
                    const MAX_DRAIN: usize = 256;
                    let mut redraw = self.handle_message(msg);
                    let mut drained = 0usize;
                    while drained < MAX_DRAIN {
                        let Ok(next) = rx.try_recv() else { break };
                        drained += 1;
                        redraw |= self.handle_message(next);
                    }
                    needs_redraw = redraw;
                }

                _ = ui_tick.tick() => {
                    if !self.toast.is_empty() {
                        self.toast.tick();
                        needs_redraw = true;
                    }
                }
            }

            if self.should_quit {
                break;
            }
        }

        // ── Teardown ──────────────────────────────────────────────────────────
        self.browser.stop();
        disable_raw_mode()?;
        execute!(
            terminal.backend_mut(),
            LeaveAlternateScreen,
            DisableMouseCapture
        )?;
        terminal.show_cursor()?;
        info!("tvdeck exiting");

        Ok(())
    }

    fn fill_viewport(&mut self) -> bool {
        let metrics = self.browser.view().scroll_metrics();
        self.browser.on_scroll(metrics) > 0
    }

    /// Returns whether the screen needs a redraw.
    fn handle_message(&mut self, msg: AppMessage) -> bool {
        match msg {
            AppMessage::Event(Event::Key(key)) if key.kind == KeyEventKind::Press => {
                let actions = self.handle_key(key);
                for action in actions {
                    self.dispatch(action);
                }
                true
            }
            AppMessage::Event(Event::Mouse(mouse)) => {
                let actions = self.browser.view_mut().handle_mouse(mouse);
                let redraw = !actions.is_empty();
                for action in actions {
                    self.dispatch(action);
                }
                redraw
            }
            AppMessage::Event(Event::Resize(..)) => true,
            AppMessage::Event(_) => false,
            AppMessage::CatalogLoaded(catalog) => {
                self.toast.dismiss_spinner();
                let text = match self.locale() {
                    Locale::Ar => format!("{} قناة", catalog.len()),
                    Locale::En => format!("{} channels", catalog.len()),
                };
                self.toast.info(text);
                self.browser.load_catalog(catalog);
                true
            }
            AppMessage::CatalogFailed(err) => {
                self.toast.dismiss_spinner();
                self.browser.catalog_failed(&err);
                self.toast
                    .error(Message::CatalogLoadFailed.text(self.locale()));
                true
            }
            AppMessage::Playback(PlaybackEvent { session, signal }) => {
                self.browser.on_engine_signal(session, signal);
                true
            }
        }
    }

    fn handle_key(&mut self, key: KeyEvent) -> Vec<Action> {
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            return vec![Action::Quit];
        }
        if !self.browser.view().is_filtering() {
            match key.code {
                KeyCode::Char('q') => return vec![Action::Quit],
                KeyCode::Char('s') => return vec![Action::Stop],
                KeyCode::Char('y') => return vec![Action::CopyUrl],
                _ => {}
            }
        }
        self.browser.view_mut().handle_key(key)
    }

    fn dispatch(&mut self, action: Action) {
        debug!("dispatch: {:?}", action);
        match action {
            Action::Select(row) => match self.browser.select(row) {
                Ok(()) => self.now_playing = self.browser.highlighted_record().cloned(),
                Err(SelectError::MissingUrl { name }) => {
                    let text = match self.locale() {
                        Locale::Ar => format!("لا يوجد رابط للقناة: {}", name),
                        Locale::En => format!("no stream url for {}", name),
                    };
                    self.toast.warning(text);
                }
                Err(e) => debug!("dispatch: {}", e),
            },
            Action::Scrolled => {
                let metrics = self.browser.view().scroll_metrics();
                self.browser.on_scroll(metrics);
            }
            Action::QueryChanged(query) => self.browser.set_query(&query),
            Action::Stop => {
                self.browser.stop();
                self.now_playing = None;
            }
            Action::CopyUrl => self.copy_url(),
            Action::Quit => self.should_quit = true,
        }
    }

    fn copy_url(&mut self) {
        let view = self.browser.view();
        let Some(url) = view
            .rows()
            .get(view.cursor())
            .filter(|record| record.has_url())
            .map(|record| record.url.clone())
        else {
            return;
        };
        match arboard::Clipboard::new().and_then(|mut cb| cb.set_text(url.clone())) {
            Ok(()) => {
                let display = if url.chars().count() > 40 {
                    format!("{}…", url.chars().take(40).collect::<String>())
                } else {
                    url
                };
                self.toast.success(format!("copied: {}", display));
            }
            Err(e) => {
                warn!("clipboard error: {}", e);
                self.toast.error(format!("clipboard error: {}", e));
            }
        }
    }

    fn draw(&mut self, frame: &mut ratatui::Frame) {
        let area = frame.area();
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(3), Constraint::Length(1)])
            .split(area);
        let panes = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
            .split(rows[0]);

        self.browser.view_mut().draw(frame, panes[0], true);

        let pane = PlayerPane {
            overlay: self.browser.overlay(),
            state: self.browser.session().state(),
            channel: self.now_playing.as_ref(),
            locale: self.locale(),
        };
        pane.draw(frame, panes[1]);

        self.draw_status(frame, rows[1]);
        self.toast.draw(frame, area);
    }

    fn draw_status(&self, frame: &mut ratatui::Frame, area: Rect) {
        let renderer = self.browser.renderer();
        let session = self.browser.session();
        let line = Line::from(vec![
            Span::styled(
                format!(" {} {} ", session.state().label(), session.session_id()),
                ratatui::style::Style::default().fg(C_SECONDARY),
            ),
            Span::styled(
                format!("· {}/{} · {} ", renderer.position(), renderer.len(), self.source),
                style_muted(),
            ),
            Span::styled(format!("· log {}", self.log_path.display()), style_muted()),
        ]);
        frame.render_widget(Paragraph::new(line), area);
    }
}
