//! The page lifecycle bus. Components publish typed [`Event`]s into an
//! [`EventBus`]; the owning site drains the queue after each operation and hands
//! every event to the [`Listener`]s interested in its [`EventKind`].
//! Publishing never calls a listener directly, so no component is re-entered
//! while it is still running.

use crate::article::ArticleRef;
use crate::config::SiteConfig;
use crate::document::Document;
use crate::fetch::Fetcher;
use crate::timers::Timers;
use crate::url::PageId;
use chrono::{DateTime, Utc};
use std::collections::VecDeque;
use std::rc::Rc;

#[derive(Clone, Debug)]
pub enum Event {
    /// The article collection finished loading.
    ArticlesLoaded(Rc<[ArticleRef]>),

    /// A fragment was swapped into the content container.
    PageLoaded(PageId),

    /// The runtime site configuration finished loading.
    ConfigLoaded(Rc<SiteConfig>),
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::ArticlesLoaded(_) => EventKind::ArticlesLoaded,
            Event::PageLoaded(_) => EventKind::PageLoaded,
            Event::ConfigLoaded(_) => EventKind::ConfigLoaded,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventKind {
    ArticlesLoaded,
    PageLoaded,
    ConfigLoaded,
}

/// Queued events, plus a log of everything dispatched so far when the bus
/// was built with [`EventBus::recording`].
#[derive(Debug, Default)]
pub struct EventBus {
    queue: VecDeque<Event>,
    log: Option<Vec<Event>>,
}

impl EventBus {
    pub fn new() -> EventBus {
        EventBus::default()
    }

    /// A bus that keeps every dispatched event for [`EventBus::log`].
    pub fn recording() -> EventBus {
        EventBus {
            queue: VecDeque::new(),
            log: Some(Vec::new()),
        }
    }

    /// Queues `event` for dispatch.
    pub fn publish(&mut self, event: Event) {
        self.queue.push_back(event);
    }

    /// Takes the next queued event and records it as dispatched.
    pub fn next(&mut self) -> Option<Event> {
        let event = self.queue.pop_front()?;
        if let Some(log) = &mut self.log {
            log.push(event.clone());
        }
        Some(event)
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Every dispatched event, oldest first. Empty unless recording.
    pub fn log(&self) -> &[Event] {
        self.log.as_deref().unwrap_or_default()
    }

    /// The kinds of the dispatched events, oldest first.
    pub fn kinds(&self) -> Vec<EventKind> {
        self.log().iter().map(Event::kind).collect()
    }
}

/// Everything a component may touch while handling an operation or event.
pub struct Context<'a> {
    pub document: &'a mut dyn Document,
    pub fetcher: &'a mut dyn Fetcher,
    pub events: &'a mut EventBus,
    pub timers: &'a mut Timers,

    /// The instant time-window filters measure from.
    pub now: DateTime<Utc>,
}

/// A subscriber on the lifecycle bus.
pub trait Listener {
    /// The event kinds this listener wants to receive.
    fn interests(&self) -> &'static [EventKind];

    fn on_event(&mut self, event: &Event, cx: &mut Context);
}

/// Hands `event` to `listener` if it subscribed to the event's kind.
pub fn deliver(listener: &mut dyn Listener, event: &Event, cx: &mut Context) {
    if listener.interests().contains(&event.kind()) {
        listener.on_event(event, cx);
    }
}
