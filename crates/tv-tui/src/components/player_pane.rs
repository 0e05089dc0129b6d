//! PlayerPane: what is playing, and the overlay drawn over it.

use ratatui::{
    layout::{Alignment, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Paragraph, Wrap},
    Frame,
};

use tv_core::{Overlay, PlaybackMode, SessionState};
use tv_proto::{ChannelRecord, Locale};

use crate::theme::{
    style_muted, C_CONNECTING, C_ERROR, C_LOGO, C_PLAYING, C_PRIMARY, C_SECONDARY,
};
use crate::widgets::pane_chrome::{pane_chrome, Badge};

pub struct PlayerPane<'a> {
    pub overlay: &'a Overlay,
    pub state: &'a SessionState,
    /// Channel the session was last started with.
    pub channel: Option<&'a ChannelRecord>,
    pub locale: Locale,
}

fn badge(state: &SessionState) -> Option<Badge<'static>> {
    match state {
        SessionState::Idle => None,
        SessionState::Attaching { .. } => Some(Badge {
            text: "…",
            color: C_CONNECTING,
        }),
        SessionState::Playing { .. } => Some(Badge {
            text: "LIVE",
            color: C_PLAYING,
        }),
        SessionState::Disposed => Some(Badge {
            text: "ERR",
            color: C_ERROR,
        }),
    }
}

fn mode_label(mode: PlaybackMode, locale: Locale) -> &'static str {
    match (mode, locale) {
        (PlaybackMode::Engine, _) => "mpv",
        (PlaybackMode::Native, Locale::Ar) => "مشغل خارجي",
        (PlaybackMode::Native, Locale::En) => "external player",
    }
}

impl PlayerPane<'_> {
    fn lines(&self) -> Vec<Line<'static>> {
        let overlay = self.overlay;
        if overlay.is_visible() {
            let mut lines = Vec::new();
            if let Some(logo) = overlay.logo() {
                lines.push(Line::from(Span::styled(
                    format!("◆ {}", logo),
                    Style::default().fg(C_LOGO),
                )));
            }
            let text = overlay.display_text(self.locale).to_string();
            let style = if overlay.message().is_some() {
                Style::default().fg(C_ERROR).add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(C_PRIMARY).add_modifier(Modifier::BOLD)
            };
            lines.push(Line::from(Span::styled(text, style)));
            if overlay.message().is_none() {
                lines.push(Line::from(Span::styled(
                    "⋯",
                    Style::default().fg(C_CONNECTING),
                )));
            }
            return lines;
        }

        match (self.state, self.channel) {
            (SessionState::Playing { url, mode }, channel) => {
                let name = channel.map(|c| c.name.clone()).unwrap_or_default();
                vec![
                    Line::from(Span::styled(
                        format!("▶ {}", name),
                        Style::default().fg(C_PLAYING).add_modifier(Modifier::BOLD),
                    )),
                    Line::from(Span::styled(url.clone(), Style::default().fg(C_SECONDARY))),
                    Line::from(Span::styled(mode_label(*mode, self.locale), style_muted())),
                ]
            }
            _ => {
                let hint = match self.locale {
                    Locale::Ar => "Enter للتشغيل · / للبحث · s للإيقاف · y لنسخ الرابط · q للخروج",
                    Locale::En => "Enter play · / search · s stop · y copy url · q quit",
                };
                vec![Line::from(Span::styled(hint, style_muted()))]
            }
        }
    }

    pub fn draw(&self, frame: &mut Frame, area: Rect) {
        let title = match self.locale {
            Locale::Ar => "المشغل",
            Locale::En => "player",
        };
        let block = pane_chrome(title, false, badge(self.state));
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let lines = self.lines();
        // Vertically centre the content.
        let top = inner.height.saturating_sub(lines.len() as u16) / 2;
        let body = Rect {
            y: inner.y + top,
            height: inner.height - top,
            ..inner
        };
        frame.render_widget(
            Paragraph::new(lines)
                .alignment(Alignment::Center)
                .wrap(Wrap { trim: true }),
            body,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tv_core::Message;

    fn text(lines: &[Line]) -> String {
        lines
            .iter()
            .map(|l| l.spans.iter().map(|s| s.content.as_ref()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn test_loading_overlay_shows_channel() {
        let mut overlay = Overlay::default();
        let channel = ChannelRecord::new("Al Jazeera", "u").with_logo("aj.png");
        overlay.show_loading(&channel);
        let state = SessionState::Idle;
        let pane = PlayerPane {
            overlay: &overlay,
            state: &state,
            channel: Some(&channel),
            locale: Locale::En,
        };
        let shown = text(&pane.lines());
        assert!(shown.contains("aj.png"));
        assert!(shown.contains("Al Jazeera"));
    }

    #[test]
    fn test_failure_message_replaces_channel() {
        let mut overlay = Overlay::default();
        overlay.show_message(Message::PlaybackFailed);
        let state = SessionState::Disposed;
        let pane = PlayerPane {
            overlay: &overlay,
            state: &state,
            channel: None,
            locale: Locale::Ar,
        };
        assert_eq!(text(&pane.lines()), "حدث خطأ أثناء تحميل القناة.");
        assert_eq!(badge(&state).map(|b| b.text), Some("ERR"));
    }

    #[test]
    fn test_playing_shows_mode() {
        let overlay = Overlay::default();
        let state = SessionState::Playing {
            url: "http://tv.test/a.m3u8".into(),
            mode: PlaybackMode::Native,
        };
        let channel = ChannelRecord::new("BBC", "http://tv.test/a.m3u8");
        let pane = PlayerPane {
            overlay: &overlay,
            state: &state,
            channel: Some(&channel),
            locale: Locale::En,
        };
        let shown = text(&pane.lines());
        assert!(shown.contains("▶ BBC"));
        assert!(shown.contains("external player"));
    }
}
