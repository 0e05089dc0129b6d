//! Scripted engine, sink and list view that record every call.

#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use tv_core::{
    EngineFactory, ListView, MediaSink, PlaybackSession, Placeholder, SessionId, StreamEngine,
};
use tv_proto::config::EngineConfig;
use tv_proto::ChannelRecord;

/// Shared record of everything the fakes were asked to do.
#[derive(Debug, Default)]
pub struct Calls {
    pub log: Vec<String>,
    /// Engine handles created and not yet destroyed.
    pub live: usize,
    pub created: usize,
    /// Sources the sink is currently bound to, engine or native.
    pub bound: usize,
}

pub type Shared = Rc<RefCell<Calls>>;

pub struct FakeEngine {
    id: SessionId,
    calls: Shared,
    attached: bool,
    destroyed: bool,
}

impl StreamEngine for FakeEngine {
    fn load_source(&mut self, url: &str) {
        self.calls.borrow_mut().log.push(format!("{} load {}", self.id, url));
    }

    fn attach_media(&mut self) {
        self.attached = true;
        let mut calls = self.calls.borrow_mut();
        calls.bound += 1;
        calls.log.push(format!("{} attach", self.id));
    }

    fn start_load(&mut self) {
        self.calls.borrow_mut().log.push(format!("{} start_load", self.id));
    }

    fn recover_media_error(&mut self) {
        self.calls.borrow_mut().log.push(format!("{} recover", self.id));
    }

    fn destroy(&mut self) {
        assert!(!self.destroyed, "engine {} destroyed twice", self.id);
        self.destroyed = true;
        let mut calls = self.calls.borrow_mut();
        calls.live -= 1;
        if self.attached {
            calls.bound -= 1;
        }
        calls.log.push(format!("{} destroy", self.id));
    }
}

pub struct FakeFactory {
    pub supported: bool,
    pub calls: Shared,
}

impl EngineFactory for FakeFactory {
    type Engine = FakeEngine;

    fn is_supported(&self) -> bool {
        self.supported
    }

    fn create(&mut self, session: SessionId, _config: &EngineConfig) -> FakeEngine {
        let mut calls = self.calls.borrow_mut();
        calls.live += 1;
        calls.created += 1;
        calls.log.push(format!("{} create", session));
        FakeEngine {
            id: session,
            calls: self.calls.clone(),
            attached: false,
            destroyed: false,
        }
    }
}

pub struct FakeSink {
    pub native: bool,
    pub calls: Shared,
    pub source: Option<String>,
}

impl MediaSink for FakeSink {
    fn play(&mut self, session: SessionId) {
        self.calls.borrow_mut().log.push(format!("{} play", session));
    }

    fn pause(&mut self) {
        self.calls.borrow_mut().log.push("pause".to_string());
    }

    fn set_source(&mut self, session: SessionId, url: &str) {
        let mut calls = self.calls.borrow_mut();
        if self.source.is_none() {
            calls.bound += 1;
        }
        calls.log.push(format!("{} set_source {}", session, url));
        self.source = Some(url.to_string());
    }

    fn clear_source(&mut self) {
        let mut calls = self.calls.borrow_mut();
        if self.source.take().is_some() {
            calls.bound -= 1;
        }
        calls.log.push("clear_source".to_string());
    }

    fn can_play_type(&self, _mime: &str) -> bool {
        self.native
    }
}

#[derive(Debug, Default)]
pub struct FakeView {
    pub rows: Vec<ChannelRecord>,
    pub placeholder: Option<Placeholder>,
    pub more: bool,
    pub highlight: Option<usize>,
}

impl ListView for FakeView {
    fn clear(&mut self) {
        self.rows.clear();
        self.placeholder = None;
    }

    fn append_batch(&mut self, items: &[ChannelRecord]) {
        self.rows.extend_from_slice(items);
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

/// A session whose engine is available (`engine`) or that falls back to the
/// sink (`native`).
pub fn session(engine: bool, native: bool) -> (PlaybackSession<FakeFactory, FakeSink>, Shared) {
    let calls = Shared::default();
    let factory = FakeFactory {
        supported: engine,
        calls: calls.clone(),
    };
    let sink = FakeSink {
        native,
        calls: calls.clone(),
        source: None,
    };
    (
        PlaybackSession::new(factory, sink, EngineConfig::default()),
        calls,
    )
}

pub fn channels(names: &[&str]) -> Vec<ChannelRecord> {
    names
        .iter()
        .enumerate()
        .map(|(i, name)| ChannelRecord::new(*name, format!("http://tv.test/{}.m3u8", i)))
        .collect()
}
