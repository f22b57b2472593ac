//! Thread lifecycle: activation, resync cycles and mutating actions.
//!
//! Every successful mutation is followed by a full fetch and a full
//! re-render; nothing is patched locally. Resync cycles are numbered and a
//! completion older than the newest applied one is dropped, so overlapping
//! cycles can no longer paint stale data over fresh data.

use std::cell::{Cell, RefCell};

use tracing::{debug, error, info, warn};

use crate::comments::{CommentId, Snapshot};
use crate::config::WidgetConfig;
use crate::error::{StoreError, ThreadError};
use crate::interaction::{Command, UiAction};
use crate::model::ThreadModel;
use crate::store::{CommentStore, DeleteRequest, FetchAllRequest, NewSeriesRequest, NotifyRequest, ReplyRequest};
use crate::view::{ThreadView, ViewTree};

/// Where the thread is drawn. The browser binding implements this over the
/// DOM; tests record the calls.
pub trait Surface {
    /// Ensures the thread container exists under the host target.
    fn mount(&self) -> Result<(), ThreadError>;
    /// Empties the container.
    fn clear(&self);
    /// Replaces the container content with `tree`.
    fn render(&self, tree: &ViewTree);
    /// Tells the user something went wrong with their input.
    fn alert(&self, message: &str);
    /// Detaches the container from the host document.
    fn unmount(&self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    Uninitialized,
    Ready,
}

/// Sequence number of one resync cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ResyncTicket(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResyncOutcome {
    /// The fetched snapshot replaced the model and was rendered.
    Applied,
    /// The fetch failed; the container was cleared.
    Failed,
    /// A newer cycle already completed; this result was dropped.
    Stale,
}

pub struct ThreadController<S, V> {
    config: WidgetConfig,
    store: S,
    surface: V,
    state: Cell<ControllerState>,
    model: RefCell<ThreadModel>,
    view: RefCell<ThreadView>,
    issued: Cell<u64>,
    applied: Cell<u64>,
}

impl<S: CommentStore, V: Surface> ThreadController<S, V> {
    /// Validates `config` and mounts the container. Incomplete configuration
    /// is refused before anything touches the host document or the network.
    pub fn init(config: WidgetConfig, store: S, surface: V) -> Result<Self, ThreadError> {
        if let Err(e) = config.validate() {
            error!(error = %e, "refusing to activate comment thread");
            return Err(e.into());
        }
        surface.mount()?;
        info!(document = %config.document_id, "comment thread activated");
        Ok(Self {
            config,
            store,
            surface,
            state: Cell::new(ControllerState::Ready),
            model: RefCell::new(ThreadModel::new()),
            view: RefCell::new(ThreadView::new()),
            issued: Cell::new(0),
            applied: Cell::new(0),
        })
    }

    /// Initial load after [`ThreadController::init`].
    pub async fn start(&self) -> Result<ResyncOutcome, ThreadError> { self.request_all_comments().await }

    pub fn state(&self) -> ControllerState { self.state.get() }
    pub fn config(&self) -> &WidgetConfig { &self.config }
    pub fn store(&self) -> &S { &self.store }
    pub fn surface(&self) -> &V { &self.surface }

    fn ensure_ready(&self) -> Result<(), ThreadError> {
        match self.state.get() {
            ControllerState::Ready => Ok(()),
            ControllerState::Uninitialized => Err(ThreadError::NotReady),
        }
    }

    pub fn comments(&self) -> Option<Snapshot> { self.model.borrow().get().cloned() }

    pub fn set_comments(&self, snapshot: Snapshot) -> Result<(), ThreadError> {
        self.model.borrow_mut().set(snapshot)?;
        Ok(())
    }

    pub fn set_comments_json(&self, json: &str) -> Result<(), ThreadError> {
        self.model.borrow_mut().set_json(json)?;
        Ok(())
    }

    pub fn clear_comments(&self) { self.model.borrow_mut().clear(); }

    /// Current rendering of model plus ephemeral state.
    pub fn view_tree(&self) -> ViewTree {
        let model = self.model.borrow();
        self.view.borrow().render(model.get(), &self.config.user_name)
    }

    /// Current rendering as markup, wrapped in the thread container.
    pub fn to_html(&self) -> String { crate::html::to_html_in_container(&self.view_tree()) }

    /// Re-renders the container from scratch.
    pub fn redraw(&self) {
        let tree = self.view_tree();
        self.surface.clear();
        self.surface.render(&tree);
    }

    /// Opens a new resync cycle.
    pub fn begin_resync(&self) -> ResyncTicket {
        let next = self.issued.get() + 1;
        self.issued.set(next);
        ResyncTicket(next)
    }

    /// Applies the result of the cycle identified by `ticket`.
    /// Results landing after teardown are dropped as stale.
    pub fn complete_resync(&self, ticket: ResyncTicket, result: Result<Snapshot, StoreError>) -> ResyncOutcome {
        if self.state.get() != ControllerState::Ready {
            debug!(cycle = ticket.0, "dropping resync for a removed thread");
            return ResyncOutcome::Stale;
        }
        if ticket.0 <= self.applied.get() {
            debug!(cycle = ticket.0, newest = self.applied.get(), "dropping stale resync");
            return ResyncOutcome::Stale;
        }
        self.applied.set(ticket.0);
        match result {
            Ok(snapshot) => {
                self.model.borrow_mut().clear();
                self.surface.clear();
                if let Err(e) = self.model.borrow_mut().set(snapshot) {
                    warn!(cycle = ticket.0, error = %e, "store returned a malformed thread");
                }
                self.view.borrow_mut().reset();
                let tree = self.view_tree();
                self.surface.render(&tree);
                ResyncOutcome::Applied
            }
            Err(e) => {
                warn!(cycle = ticket.0, error = %e, "fetching comments failed");
                self.surface.clear();
                ResyncOutcome::Failed
            }
        }
    }

    /// Fetch-all followed by a full re-render.
    pub async fn request_all_comments(&self) -> Result<ResyncOutcome, ThreadError> {
        self.ensure_ready()?;
        let ticket = self.begin_resync();
        let request = FetchAllRequest { file_id: self.config.document_id.clone() };
        let result = self.store.fetch_all(request).await;
        Ok(self.complete_resync(ticket, result))
    }

    fn ensure_known(&self, id: &CommentId) -> Result<(), ThreadError> {
        let known = self.model.borrow().get().is_some_and(|s| s.find(id).is_some());
        if known {
            Ok(())
        } else {
            error!(comment = %id, "cannot resolve comment for action");
            Err(ThreadError::UnknownComment(id.clone()))
        }
    }

    /// Shared tail of every mutation: a failed store call is logged and the
    /// display left alone, a successful one triggers exactly one resync.
    async fn resync_after<T>(&self, operation: &'static str, result: Result<T, StoreError>) -> Result<(), ThreadError> {
        match result {
            Ok(_) => {
                self.request_all_comments().await?;
                Ok(())
            }
            Err(e) => {
                warn!(operation, error = %e, "comment store rejected request");
                Err(e.into())
            }
        }
    }

    pub async fn request_new_comment_series(&self, body: &str) -> Result<(), ThreadError> {
        self.ensure_ready()?;
        let request = NewSeriesRequest {
            body: body.to_string(),
            name: self.config.user_name.clone(),
            file_id: self.config.document_id.clone(),
        };
        let result = self.store.create_series(request).await;
        self.resync_after("create_series", result).await
    }

    pub async fn reply(&self, parent: &CommentId, body: &str) -> Result<(), ThreadError> {
        self.ensure_ready()?;
        self.ensure_known(parent)?;
        let request = ReplyRequest { parent: parent.clone(), body: body.to_string(), name: self.config.user_name.clone() };
        let result = self.store.reply(request).await;
        self.resync_after("reply", result).await
    }

    pub async fn delete(&self, id: &CommentId) -> Result<(), ThreadError> {
        self.ensure_ready()?;
        self.ensure_known(id)?;
        let result = self.store.delete(DeleteRequest { id: id.clone() }).await;
        self.resync_after("delete", result).await
    }

    pub async fn notify(&self, id: &CommentId, email: &str) -> Result<(), ThreadError> {
        self.ensure_ready()?;
        self.ensure_known(id)?;
        let result = self.store.notify(NotifyRequest { id: id.clone(), to_email: email.to_string() }).await;
        self.resync_after("notify", result).await
    }

    /// Routes a user interaction through the view state machine and runs the
    /// resulting command.
    pub async fn dispatch(&self, action: UiAction) -> Result<(), ThreadError> {
        self.ensure_ready()?;
        let reaction = {
            let model = self.model.borrow();
            let outcome = self.view.borrow_mut().handle(action, model.get());
            match outcome {
                Ok(reaction) => reaction,
                Err(e) => {
                    error!(error = %e, "interaction aborted");
                    return Err(e);
                }
            }
        };
        if reaction.redraw {
            self.redraw();
        }
        match reaction.command {
            None => Ok(()),
            Some(Command::Alert(message)) => {
                self.surface.alert(&message);
                Ok(())
            }
            Some(Command::CreateSeries { body }) => self.request_new_comment_series(&body).await,
            Some(Command::Reply { parent, body }) => self.reply(&parent, &body).await,
            Some(Command::Delete { id }) => self.delete(&id).await,
            Some(Command::Notify { id, email }) => self.notify(&id, &email).await,
        }
    }

    /// Detaches everything the widget rendered and forgets its state.
    pub fn teardown(&self) {
        self.model.borrow_mut().clear();
        self.view.borrow_mut().reset();
        self.surface.unmount();
        self.state.set(ControllerState::Uninitialized);
        info!(document = %self.config.document_id, "comment thread removed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comments::SeriesGroup;
    use crate::interaction::{InputSlot, MenuAction};
    use crate::testing::{comment, config, reply, two_series, GatedStore, MockCall, MockStore, RecordingSurface, SurfaceEvent};
    use crate::view::class;
    use futures::executor::{block_on, LocalPool};
    use futures::task::LocalSpawnExt;
    use std::rc::Rc;

    type Controller = ThreadController<MockStore, RecordingSurface>;

    fn ready(store: MockStore) -> Controller {
        let ctrl = ThreadController::init(config(), store, RecordingSurface::default()).unwrap();
        assert_eq!(block_on(ctrl.start()).unwrap(), ResyncOutcome::Applied);
        ctrl
    }

    fn id(s: &str) -> CommentId { CommentId::new(s) }

    #[test]
    fn incomplete_config_never_mounts_or_fetches() {
        let mut cfg = config();
        cfg.reply_url.clear();
        let surface = RecordingSurface::default();
        let store = MockStore::new();
        let err = ThreadController::init(cfg, store.clone(), surface.clone()).err();
        assert_eq!(err, Some(ThreadError::Config(crate::error::ConfigError::MissingField("replyUrl"))));
        assert!(store.calls().is_empty());
        assert!(surface.events().is_empty());
    }

    #[test]
    fn initial_fetch_renders_snapshot() {
        let ctrl = ready(MockStore::new().with_fetch(Ok(two_series())));
        assert_eq!(ctrl.state(), ControllerState::Ready);
        assert_eq!(ctrl.store().calls(), [MockCall::FetchAll(FetchAllRequest { file_id: "doc-1".into() })]);
        assert_eq!(
            ctrl.surface().events()[..3],
            [SurfaceEvent::Mounted, SurfaceEvent::Cleared, SurfaceEvent::Rendered]
        );
        let tree = ctrl.surface().last_tree().unwrap();
        assert_eq!(tree.series().len(), 2);
        assert_eq!(ctrl.comments(), Some(two_series()));
    }

    #[test]
    fn failed_fetch_clears_display_only() {
        let store = MockStore::new()
            .with_fetch(Ok(two_series()))
            .with_fetch(Err(StoreError::Status { status: 503, detail: "down".into() }));
        let ctrl = ready(store);
        let outcome = block_on(ctrl.request_all_comments()).unwrap();
        assert_eq!(outcome, ResyncOutcome::Failed);
        assert_eq!(ctrl.surface().events().last(), Some(&SurfaceEvent::Cleared));
        assert_eq!(ctrl.comments(), Some(two_series()));
    }

    #[test]
    fn delete_confirm_deletes_then_fetches_once() {
        let store = MockStore::new().with_fetch(Ok(two_series())).with_fetch(Ok(Snapshot::new(vec![
            SeriesGroup::new(vec![comment("1", "s1")]),
            SeriesGroup::new(vec![comment("3", "s2")]),
        ])));
        let ctrl = ready(store);
        block_on(ctrl.dispatch(UiAction::ToggleMenu(id("2")))).unwrap();
        block_on(ctrl.dispatch(UiAction::ChooseMenu(id("2"), MenuAction::Delete))).unwrap();
        ctrl.store().clear_calls();

        block_on(ctrl.dispatch(UiAction::ConfirmDelete(id("2")))).unwrap();
        assert_eq!(
            ctrl.store().calls(),
            [
                MockCall::Delete(DeleteRequest { id: id("2") }),
                MockCall::FetchAll(FetchAllRequest { file_id: "doc-1".into() }),
            ]
        );
        let tree = ctrl.surface().last_tree().unwrap();
        assert!(tree.comment("2").is_none());
        assert!(tree.find_all(class::DELETE_POPUP).is_empty());
    }

    #[test]
    fn cancel_prompt_makes_no_calls_and_restores_comment() {
        let ctrl = ready(MockStore::new().with_fetch(Ok(two_series())));
        block_on(ctrl.dispatch(UiAction::ChooseMenu(id("2"), MenuAction::Delete))).unwrap();
        let dimmed = ctrl.surface().last_tree().unwrap();
        assert!(dimmed.comment("2").unwrap().has_class(class::BLACKOUT));

        ctrl.store().clear_calls();
        block_on(ctrl.dispatch(UiAction::CancelPopup(id("2")))).unwrap();
        assert!(ctrl.store().calls().is_empty());
        let restored = ctrl.surface().last_tree().unwrap();
        let entry = restored.comment("2").unwrap();
        assert!(!entry.has_class(class::BLACKOUT));
        assert!(entry.find_all(class::DELETE_POPUP).is_empty());
    }

    #[test]
    fn invalid_notify_email_alerts_without_calling_store() {
        let ctrl = ready(MockStore::new().with_fetch(Ok(two_series())));
        block_on(ctrl.dispatch(UiAction::ChooseMenu(id("1"), MenuAction::Notify))).unwrap();
        block_on(ctrl.dispatch(UiAction::Input(InputSlot::NotifyEmail(id("1")), "not-an-email".into()))).unwrap();
        ctrl.store().clear_calls();
        block_on(ctrl.dispatch(UiAction::ConfirmNotify(id("1")))).unwrap();
        assert!(ctrl.store().calls().is_empty());
        assert_eq!(ctrl.surface().alerts(), ["Not a valid email"]);
    }

    #[test]
    fn valid_notify_email_is_sent_literally() {
        let store = MockStore::new().with_fetch(Ok(two_series())).with_fetch(Ok(two_series()));
        let ctrl = ready(store);
        block_on(ctrl.dispatch(UiAction::ChooseMenu(id("1"), MenuAction::Notify))).unwrap();
        block_on(ctrl.dispatch(UiAction::Input(InputSlot::NotifyEmail(id("1")), "user@example.com".into()))).unwrap();
        ctrl.store().clear_calls();
        block_on(ctrl.dispatch(UiAction::ConfirmNotify(id("1")))).unwrap();
        assert_eq!(
            ctrl.store().calls()[0],
            MockCall::Notify(NotifyRequest { id: id("1"), to_email: "user@example.com".into() })
        );
        assert_eq!(ctrl.store().fetch_count(), 1);
    }

    #[test]
    fn reply_and_new_series_carry_user_name() {
        let store = MockStore::new().with_fetch(Ok(two_series())).with_fetch(Ok(two_series())).with_fetch(Ok(two_series()));
        let ctrl = ready(store);
        ctrl.store().clear_calls();

        block_on(ctrl.dispatch(UiAction::ToggleReply(id("3")))).unwrap();
        block_on(ctrl.dispatch(UiAction::Input(InputSlot::Reply(id("3")), "agreed".into()))).unwrap();
        block_on(ctrl.dispatch(UiAction::SubmitReply(id("3")))).unwrap();

        block_on(ctrl.dispatch(UiAction::Input(InputSlot::NewSeries, "new topic".into()))).unwrap();
        block_on(ctrl.dispatch(UiAction::SubmitNewSeries)).unwrap();

        let calls = ctrl.store().calls();
        assert_eq!(calls[0], MockCall::Reply(ReplyRequest { parent: id("3"), body: "agreed".into(), name: "Ana".into() }));
        assert!(matches!(calls[1], MockCall::FetchAll(_)));
        assert_eq!(
            calls[2],
            MockCall::CreateSeries(NewSeriesRequest { body: "new topic".into(), name: "Ana".into(), file_id: "doc-1".into() })
        );
        assert!(matches!(calls[3], MockCall::FetchAll(_)));
        assert_eq!(calls.len(), 4);
    }

    #[test]
    fn failed_mutation_leaves_display_untouched() {
        let store = MockStore::new()
            .with_fetch(Ok(two_series()))
            .with_error(StoreError::Status { status: 500, detail: "nope".into() });
        let ctrl = ready(store);
        let rendered = ctrl.surface().events().len();
        let err = block_on(ctrl.delete(&id("2"))).unwrap_err();
        assert!(matches!(err, ThreadError::Store(StoreError::Status { status: 500, .. })));
        assert_eq!(ctrl.surface().events().len(), rendered);
        assert_eq!(ctrl.store().fetch_count(), 1);
    }

    #[test]
    fn unknown_comment_aborts_before_request() {
        let ctrl = ready(MockStore::new().with_fetch(Ok(two_series())));
        ctrl.store().clear_calls();
        let err = block_on(ctrl.notify(&id("77"), "user@example.com")).unwrap_err();
        assert_eq!(err, ThreadError::UnknownComment(id("77")));
        assert!(block_on(ctrl.dispatch(UiAction::ConfirmDelete(id("77")))).is_err());
        assert!(ctrl.store().calls().is_empty());
    }

    #[test]
    fn overlapping_resyncs_keep_the_newest_cycle() {
        let ctrl = ready(MockStore::new().with_fetch(Ok(two_series())));
        let older = ctrl.begin_resync();
        let newer = ctrl.begin_resync();
        let fresh = Snapshot::new(vec![SeriesGroup::new(vec![comment("9", "s9")])]);

        // newer cycle completes first, older one lands afterwards
        assert_eq!(ctrl.complete_resync(newer, Ok(fresh.clone())), ResyncOutcome::Applied);
        assert_eq!(ctrl.complete_resync(older, Ok(two_series())), ResyncOutcome::Stale);
        assert_eq!(ctrl.comments(), Some(fresh));
        assert!(ctrl.surface().last_tree().unwrap().comment("9").is_some());
    }

    #[test]
    fn fetches_answered_in_reverse_keep_the_newer_cycle() {
        let (store, mut answers) = GatedStore::new(2);
        let ctrl = Rc::new(ThreadController::init(config(), store, RecordingSurface::default()).unwrap());
        let outcomes = Rc::new(RefCell::new(Vec::new()));
        let mut pool = LocalPool::new();
        for _ in 0..2 {
            let ctrl = Rc::clone(&ctrl);
            let outcomes = Rc::clone(&outcomes);
            pool.spawner()
                .spawn_local(async move {
                    let outcome = ctrl.request_all_comments().await.unwrap();
                    outcomes.borrow_mut().push(outcome);
                })
                .unwrap();
        }
        pool.run_until_stalled();
        assert!(outcomes.borrow().is_empty());

        let second = answers.pop().unwrap();
        let first = answers.pop().unwrap();
        let newer = Snapshot::new(vec![SeriesGroup::new(vec![comment("1", "s1"), reply("2", "1", "s1")])]);
        second.send(Ok(newer.clone())).unwrap();
        pool.run_until_stalled();
        first.send(Ok(Snapshot::new(vec![SeriesGroup::new(vec![comment("1", "s1")])]))).unwrap();
        pool.run_until_stalled();

        assert_eq!(*outcomes.borrow(), [ResyncOutcome::Applied, ResyncOutcome::Stale]);
        assert_eq!(ctrl.comments(), Some(newer));
        assert!(ctrl.surface().last_tree().unwrap().comment("2").is_some());
    }

    #[test]
    fn in_order_resyncs_both_apply() {
        let ctrl = ready(MockStore::new().with_fetch(Ok(two_series())));
        let first = ctrl.begin_resync();
        let second = ctrl.begin_resync();
        let grown = Snapshot::new(vec![SeriesGroup::new(vec![comment("1", "s1"), reply("2", "1", "s1"), reply("4", "2", "s1")])]);
        assert_eq!(ctrl.complete_resync(first, Ok(two_series())), ResyncOutcome::Applied);
        assert_eq!(ctrl.complete_resync(second, Ok(grown.clone())), ResyncOutcome::Applied);
        assert_eq!(ctrl.comments(), Some(grown));
    }

    #[test]
    fn resync_drops_open_popups() {
        let store = MockStore::new().with_fetch(Ok(two_series())).with_fetch(Ok(two_series()));
        let ctrl = ready(store);
        block_on(ctrl.dispatch(UiAction::ToggleMenu(id("1")))).unwrap();
        assert_eq!(ctrl.surface().last_tree().unwrap().find_all(class::MENU).len(), 1);
        block_on(ctrl.request_all_comments()).unwrap();
        assert!(ctrl.surface().last_tree().unwrap().find_all(class::MENU).is_empty());
    }

    #[test]
    fn teardown_detaches_and_refuses_further_actions() {
        let ctrl = ready(MockStore::new().with_fetch(Ok(two_series())));
        ctrl.teardown();
        assert_eq!(ctrl.state(), ControllerState::Uninitialized);
        assert_eq!(ctrl.surface().events().last(), Some(&SurfaceEvent::Unmounted));
        assert!(ctrl.comments().is_none());
        assert_eq!(block_on(ctrl.request_all_comments()), Err(ThreadError::NotReady));
        assert_eq!(block_on(ctrl.dispatch(UiAction::SubmitNewSeries)), Err(ThreadError::NotReady));
    }

    #[test]
    fn resync_landing_after_teardown_is_dropped() {
        let ctrl = ready(MockStore::new().with_fetch(Ok(two_series())));
        let pending = ctrl.begin_resync();
        ctrl.teardown();
        let events = ctrl.surface().events().len();
        assert_eq!(ctrl.complete_resync(pending, Ok(two_series())), ResyncOutcome::Stale);
        assert!(ctrl.comments().is_none());
        assert_eq!(ctrl.surface().events().len(), events);
    }

    #[test]
    fn model_accessors_round_trip() {
        let ctrl = ready(MockStore::new().with_fetch(Ok(Snapshot::default())));
        ctrl.set_comments(two_series()).unwrap();
        assert_eq!(ctrl.comments(), Some(two_series()));
        ctrl.clear_comments();
        assert_eq!(ctrl.comments(), None);
        assert!(ctrl.set_comments_json("\"nope\"").is_err());
        ctrl.set_comments_json(&two_series().to_json()).unwrap();
        assert_eq!(ctrl.comments(), Some(two_series()));
        let html = ctrl.to_html();
        assert!(html.starts_with("<div class=\"smart-comments-container\">"));
        assert!(html.contains("smart-comments-new-series"));
    }
}
