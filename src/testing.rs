//! test doubles shared by the unit tests.
//! handles are `Rc`-backed clones so a test can keep observing a fake after
//! handing it to the scheduler.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

use anyhow::{anyhow, Result};

use crate::cache::{CacheHealth, CacheStore, MemoryCache};
use crate::clock::Clock;
use crate::display::{Display, Frame};
use crate::domain::RawPayload;
use crate::fetch::{HttpResponse, Transport};
use crate::link::Link;
use crate::publish::Publisher;
use crate::scheduler::UpdateChannel;

#[derive(Clone, Default)]
pub struct ManualClock(Rc<Cell<u64>>);

impl ManualClock {
    pub fn at(now: u64) -> Self {
        Self(Rc::new(Cell::new(now)))
    }

    pub fn set(&self, now: u64) {
        self.0.set(now);
    }

    pub fn advance(&self, secs: u64) {
        self.0.set(self.0.get() + secs);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> u64 {
        self.0.get()
    }
}

/// replays queued responses; an empty queue answers like a dead network
#[derive(Clone, Default)]
pub struct ScriptedTransport {
    responses: Rc<RefCell<VecDeque<Result<HttpResponse, String>>>>,
    calls: Rc<Cell<usize>>,
}

impl ScriptedTransport {
    pub fn push_ok(&self, status: u16, body: &str) {
        self.responses
            .borrow_mut()
            .push_back(Ok(HttpResponse { status, body: body.to_string() }));
    }

    pub fn push_err(&self, message: &str) {
        self.responses.borrow_mut().push_back(Err(message.to_string()));
    }

    pub fn calls(&self) -> usize {
        self.calls.get()
    }
}

impl Transport for ScriptedTransport {
    async fn get(&self, _url: &str) -> Result<HttpResponse> {
        self.calls.set(self.calls.get() + 1);
        match self.responses.borrow_mut().pop_front() {
            Some(Ok(response)) => Ok(response),
            Some(Err(message)) => Err(anyhow!(message)),
            None => Err(anyhow!("no scripted response")),
        }
    }
}

#[derive(Clone)]
pub struct ToggleLink(Rc<Cell<bool>>);

impl ToggleLink {
    pub fn up() -> Self {
        Self(Rc::new(Cell::new(true)))
    }

    pub fn down() -> Self {
        Self(Rc::new(Cell::new(false)))
    }

    pub fn set(&self, up: bool) {
        self.0.set(up);
    }
}

impl Link for ToggleLink {
    fn is_up(&self) -> bool {
        self.0.get()
    }
}

#[derive(Default)]
struct PublisherLog {
    connected: bool,
    /// connection state after the next reconnect()
    connect_succeeds: bool,
    reconnects: usize,
    services: usize,
    sent: Vec<(String, String)>,
}

#[derive(Clone, Default)]
pub struct RecordingPublisher(Rc<RefCell<PublisherLog>>);

impl RecordingPublisher {
    pub fn connected() -> Self {
        let publisher = Self::default();
        publisher.0.borrow_mut().connected = true;
        publisher.0.borrow_mut().connect_succeeds = true;
        publisher
    }

    pub fn disconnected() -> Self {
        Self::default()
    }

    pub fn set_connected(&self, connected: bool) {
        self.0.borrow_mut().connected = connected;
    }

    pub fn set_connect_succeeds(&self, succeeds: bool) {
        self.0.borrow_mut().connect_succeeds = succeeds;
    }

    pub fn reconnects(&self) -> usize {
        self.0.borrow().reconnects
    }

    pub fn services(&self) -> usize {
        self.0.borrow().services
    }

    pub fn sent(&self) -> Vec<(String, String)> {
        self.0.borrow().sent.clone()
    }

    pub fn sent_to(&self, topic: &str) -> Vec<serde_json::Value> {
        self.0
            .borrow()
            .sent
            .iter()
            .filter(|(t, _)| t == topic)
            .map(|(_, payload)| serde_json::from_str(payload).unwrap())
            .collect()
    }
}

impl Publisher for RecordingPublisher {
    fn is_connected(&self) -> bool {
        self.0.borrow().connected
    }

    async fn reconnect(&mut self) {
        let mut log = self.0.borrow_mut();
        log.reconnects += 1;
        log.connected = log.connect_succeeds;
    }

    async fn service(&mut self) {
        self.0.borrow_mut().services += 1;
    }

    fn publish(&mut self, topic: &str, payload: &str) -> bool {
        let mut log = self.0.borrow_mut();
        if !log.connected {
            return false;
        }
        log.sent.push((topic.to_string(), payload.to_string()));
        true
    }
}

#[derive(Clone, Default)]
pub struct RecordingDisplay(Rc<RefCell<Vec<Frame>>>);

impl RecordingDisplay {
    pub fn frames(&self) -> Vec<Frame> {
        self.0.borrow().clone()
    }

    pub fn last(&self) -> Option<Frame> {
        self.0.borrow().last().cloned()
    }
}

impl Display for RecordingDisplay {
    fn show(&mut self, frame: &Frame) {
        self.0.borrow_mut().push(frame.clone());
    }
}

/// MemoryCache behind a shared handle
#[derive(Clone, Default)]
pub struct SharedCache(Rc<RefCell<MemoryCache>>);

impl SharedCache {
    pub fn with_payload(body: &str) -> Self {
        Self(Rc::new(RefCell::new(MemoryCache::with_payload(RawPayload::new(body)))))
    }

    pub fn writes(&self) -> usize {
        self.0.borrow().writes()
    }

    pub fn contents(&self) -> Option<RawPayload> {
        self.0.borrow_mut().read()
    }
}

impl CacheStore for SharedCache {
    fn write(&mut self, payload: &RawPayload) {
        self.0.borrow_mut().write(payload);
    }

    fn read(&mut self) -> Option<RawPayload> {
        self.0.borrow_mut().read()
    }

    fn health(&self) -> CacheHealth {
        self.0.borrow().health()
    }
}

#[derive(Clone, Default)]
pub struct CountingUpdater(Rc<Cell<usize>>);

impl CountingUpdater {
    pub fn count(&self) -> usize {
        self.0.get()
    }
}

impl UpdateChannel for CountingUpdater {
    fn service(&mut self) {
        self.0.set(self.0.get() + 1);
    }
}
