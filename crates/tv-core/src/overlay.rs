//! Player overlay state and the user-visible strings that can land in it.

use tv_proto::{ChannelRecord, Locale};

use crate::pager::Placeholder;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Message {
    Loading,
    CatalogLoadFailed,
    NoResults,
    PlaybackFailed,
    Unsupported,
}

impl Message {
    pub fn text(self, locale: Locale) -> &'static str {
        match (self, locale) {
            (Self::Loading, Locale::Ar) => "جارٍ تحميل القنوات...",
            (Self::Loading, Locale::En) => "Loading channels...",
            (Self::CatalogLoadFailed, Locale::Ar) => "فشل تحميل قائمة القنوات.",
            (Self::CatalogLoadFailed, Locale::En) => "Failed to load the channel list.",
            (Self::NoResults, Locale::Ar) => "لا توجد قنوات مطابقة.",
            (Self::NoResults, Locale::En) => "No matching channels.",
            (Self::PlaybackFailed, Locale::Ar) => "حدث خطأ أثناء تحميل القناة.",
            (Self::PlaybackFailed, Locale::En) => "An error occurred while loading the channel.",
            (Self::Unsupported, Locale::Ar) => "المشغل لا يدعم تشغيل هذا النوع من البث.",
            (Self::Unsupported, Locale::En) => "This player cannot play this type of stream.",
        }
    }
}

impl From<Placeholder> for Message {
    fn from(placeholder: Placeholder) -> Self {
        match placeholder {
            Placeholder::Loading => Self::Loading,
            Placeholder::NoResults => Self::NoResults,
            Placeholder::CatalogLoadFailed => Self::CatalogLoadFailed,
        }
    }
}

/// What the player area shows on top of (or instead of) the video.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overlay {
    visible: bool,
    title: String,
    logo: Option<String>,
    message: Option<Message>,
}

impl Overlay {
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Channel name, or empty when a message has replaced it.
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Logo to draw; `None` when hidden.
    pub fn logo(&self) -> Option<&str> {
        self.logo.as_deref()
    }

    pub fn message(&self) -> Option<Message> {
        self.message
    }

    /// Current channel info with the loading overlay up.
    pub fn show_loading(&mut self, record: &ChannelRecord) {
        self.title = record.name.clone();
        self.logo = record.has_logo().then(|| record.logo_or_placeholder().to_string());
        self.message = None;
        self.visible = true;
    }

    pub fn hide(&mut self) {
        self.visible = false;
    }

    /// Replace the channel info with `message` and hide the logo.
    pub fn show_message(&mut self, message: Message) {
        self.title.clear();
        self.logo = None;
        self.message = Some(message);
        self.visible = true;
    }

    /// Text for the title line in `locale`.
    pub fn display_text(&self, locale: Locale) -> &str {
        match self.message {
            Some(message) => message.text(locale),
            None => &self.title,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loading_hides_placeholder_logo() {
        let mut overlay = Overlay::default();
        overlay.show_loading(&ChannelRecord::new("BBC", "a"));
        assert!(overlay.is_visible());
        assert_eq!(overlay.title(), "BBC");
        assert_eq!(overlay.logo(), None);

        overlay.show_loading(&ChannelRecord::new("CNN", "b").with_logo("cnn.png"));
        assert_eq!(overlay.logo(), Some("cnn.png"));
    }

    #[test]
    fn test_message_replaces_title() {
        let mut overlay = Overlay::default();
        overlay.show_loading(&ChannelRecord::new("CNN", "b").with_logo("cnn.png"));
        overlay.hide();
        overlay.show_message(Message::PlaybackFailed);
        assert!(overlay.is_visible());
        assert_eq!(overlay.logo(), None);
        assert_eq!(
            overlay.display_text(Locale::En),
            "An error occurred while loading the channel."
        );
        assert_eq!(overlay.display_text(Locale::Ar), "حدث خطأ أثناء تحميل القناة.");
    }
}
