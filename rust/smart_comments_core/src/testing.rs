//! Test doubles and fixtures shared by the unit tests.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use async_trait::async_trait;
use futures::channel::oneshot;

use crate::comments::{Comment, CommentId, SeriesGroup, SeriesId, Snapshot};
use crate::config::WidgetConfig;
use crate::controller::Surface;
use crate::error::{StoreError, ThreadError};
use crate::store::{
    Ack, CommentStore, DeleteRequest, FetchAllRequest, NewSeriesRequest, NotifyRequest, ReplyRequest, StoreRequest,
    StoreResponse, Transport,
};
use crate::view::ViewTree;

pub fn config() -> WidgetConfig {
    WidgetConfig {
        document_id: "doc-1".into(),
        user_name: "Ana".into(),
        fetch_all_url: "/comments/all".into(),
        new_series_url: "/comments/new".into(),
        reply_url: "/comments/reply".into(),
        delete_url: "/comments/delete".into(),
        notify_url: "/comments/notify".into(),
    }
}

pub fn comment(id: &str, series: &str) -> Comment {
    Comment {
        id: CommentId::new(id),
        parent_id: None,
        series_id: SeriesId::new(series),
        author: format!("Author {id}"),
        timestamp: format!("ts-{id}"),
        body: format!("body {id}"),
    }
}

pub fn reply(id: &str, parent: &str, series: &str) -> Comment {
    Comment { parent_id: Some(CommentId::new(parent)), ..comment(id, series) }
}

/// `s1`: 1 <- 2, `s2`: 3.
pub fn two_series() -> Snapshot {
    Snapshot::new(vec![
        SeriesGroup::new(vec![comment("1", "s1"), reply("2", "1", "s1")]),
        SeriesGroup::new(vec![comment("3", "s2")]),
    ])
}

/// A recorded call to the mock store.
#[derive(Debug, Clone, PartialEq)]
pub enum MockCall {
    FetchAll(FetchAllRequest),
    CreateSeries(NewSeriesRequest),
    Reply(ReplyRequest),
    Delete(DeleteRequest),
    Notify(NotifyRequest),
}

#[derive(Default)]
struct MockStoreInner {
    calls: Vec<MockCall>,
    fetches: VecDeque<Result<Snapshot, StoreError>>,
    mutation_error: Option<StoreError>,
}

/// Records every call and replays scripted fetch results. Clones share state.
#[derive(Clone, Default)]
pub struct MockStore {
    inner: Rc<RefCell<MockStoreInner>>,
}

impl MockStore {
    pub fn new() -> Self { Self::default() }

    /// Queues the result of the next unanswered fetch-all.
    pub fn with_fetch(self, result: Result<Snapshot, StoreError>) -> Self {
        self.inner.borrow_mut().fetches.push_back(result);
        self
    }

    /// Makes the next mutation fail.
    pub fn with_error(self, err: StoreError) -> Self {
        self.inner.borrow_mut().mutation_error = Some(err);
        self
    }

    pub fn calls(&self) -> Vec<MockCall> { self.inner.borrow().calls.clone() }

    pub fn clear_calls(&self) { self.inner.borrow_mut().calls.clear(); }

    pub fn fetch_count(&self) -> usize {
        self.inner.borrow().calls.iter().filter(|c| matches!(c, MockCall::FetchAll(_))).count()
    }

    fn mutation(&self, call: MockCall) -> Result<Ack, StoreError> {
        let mut inner = self.inner.borrow_mut();
        inner.calls.push(call);
        match inner.mutation_error.take() {
            Some(err) => Err(err),
            None => Ok(Ack::default()),
        }
    }
}

#[async_trait(?Send)]
impl CommentStore for MockStore {
    async fn fetch_all(&self, request: FetchAllRequest) -> Result<Snapshot, StoreError> {
        let mut inner = self.inner.borrow_mut();
        inner.calls.push(MockCall::FetchAll(request));
        inner.fetches.pop_front().unwrap_or_else(|| Err(StoreError::Transport("no scripted fetch".into())))
    }

    async fn create_series(&self, request: NewSeriesRequest) -> Result<Ack, StoreError> {
        self.mutation(MockCall::CreateSeries(request))
    }

    async fn reply(&self, request: ReplyRequest) -> Result<Ack, StoreError> { self.mutation(MockCall::Reply(request)) }

    async fn delete(&self, request: DeleteRequest) -> Result<Ack, StoreError> { self.mutation(MockCall::Delete(request)) }

    async fn notify(&self, request: NotifyRequest) -> Result<Ack, StoreError> { self.mutation(MockCall::Notify(request)) }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceEvent {
    Mounted,
    Cleared,
    Rendered,
    Alert(String),
    Unmounted,
}

#[derive(Default)]
struct SurfaceLog {
    events: Vec<SurfaceEvent>,
    last_tree: Option<ViewTree>,
}

/// Records what the controller asked the surface to do. Clones share state.
#[derive(Clone, Default)]
pub struct RecordingSurface {
    log: Rc<RefCell<SurfaceLog>>,
}

impl RecordingSurface {
    pub fn events(&self) -> Vec<SurfaceEvent> { self.log.borrow().events.clone() }

    pub fn last_tree(&self) -> Option<ViewTree> { self.log.borrow().last_tree.clone() }

    pub fn alerts(&self) -> Vec<String> {
        self.log
            .borrow()
            .events
            .iter()
            .filter_map(|e| match e {
                SurfaceEvent::Alert(m) => Some(m.clone()),
                _ => None,
            })
            .collect()
    }
}

impl Surface for RecordingSurface {
    fn mount(&self) -> Result<(), ThreadError> {
        self.log.borrow_mut().events.push(SurfaceEvent::Mounted);
        Ok(())
    }

    fn clear(&self) {
        let mut log = self.log.borrow_mut();
        log.events.push(SurfaceEvent::Cleared);
        log.last_tree = None;
    }

    fn render(&self, tree: &ViewTree) {
        let mut log = self.log.borrow_mut();
        log.events.push(SurfaceEvent::Rendered);
        log.last_tree = Some(tree.clone());
    }

    fn alert(&self, message: &str) { self.log.borrow_mut().events.push(SurfaceEvent::Alert(message.to_string())); }

    fn unmount(&self) {
        let mut log = self.log.borrow_mut();
        log.events.push(SurfaceEvent::Unmounted);
        log.last_tree = None;
    }
}

/// Transport that answers every request the same way and keeps what it sent.
pub struct ScriptedTransport {
    reply: Result<StoreResponse, StoreError>,
    sent: RefCell<Vec<StoreRequest>>,
}

impl ScriptedTransport {
    pub fn respond(status: u16, body: &str) -> Self {
        Self { reply: Ok(StoreResponse { status, body: body.to_string() }), sent: RefCell::new(Vec::new()) }
    }

    pub fn fail(message: &str) -> Self {
        Self { reply: Err(StoreError::Transport(message.to_string())), sent: RefCell::new(Vec::new()) }
    }

    pub fn sent(&self) -> Vec<StoreRequest> { self.sent.borrow().clone() }
}

#[async_trait(?Send)]
impl Transport for ScriptedTransport {
    async fn send(&self, request: StoreRequest) -> Result<StoreResponse, StoreError> {
        self.sent.borrow_mut().push(request);
        self.reply.clone()
    }
}

/// Store whose fetch-all calls wait until the test answers them, in the
/// order they were issued. Mutations succeed immediately.
#[derive(Default)]
pub struct GatedStore {
    pending: RefCell<VecDeque<oneshot::Receiver<Result<Snapshot, StoreError>>>>,
}

impl GatedStore {
    /// Returns the store plus one answer handle per expected fetch.
    pub fn new(fetches: usize) -> (Self, Vec<oneshot::Sender<Result<Snapshot, StoreError>>>) {
        let (senders, receivers): (Vec<_>, VecDeque<_>) = (0..fetches).map(|_| oneshot::channel()).unzip();
        (Self { pending: RefCell::new(receivers) }, senders)
    }
}

#[async_trait(?Send)]
impl CommentStore for GatedStore {
    async fn fetch_all(&self, _request: FetchAllRequest) -> Result<Snapshot, StoreError> {
        let gate = self.pending.borrow_mut().pop_front();
        match gate {
            Some(gate) => gate.await.unwrap_or_else(|_| Err(StoreError::Transport("answer dropped".into()))),
            None => Err(StoreError::Transport("no gated fetch".into())),
        }
    }

    async fn create_series(&self, _request: NewSeriesRequest) -> Result<Ack, StoreError> { Ok(Ack::default()) }

    async fn reply(&self, _request: ReplyRequest) -> Result<Ack, StoreError> { Ok(Ack::default()) }

    async fn delete(&self, _request: DeleteRequest) -> Result<Ack, StoreError> { Ok(Ack::default()) }

    async fn notify(&self, _request: NotifyRequest) -> Result<Ack, StoreError> { Ok(Ack::default()) }
}
