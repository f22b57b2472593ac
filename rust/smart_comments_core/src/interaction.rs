//! Interaction state machine of the thread view.
//!
//! At most one popup (context menu, delete confirmation or notify prompt) is
//! open at a time; opening one replaces whatever occupied the slot. The reply
//! composer has its own slot with toggle semantics.

use std::sync::OnceLock;

use regex::Regex;
use tracing::{debug, warn};

use crate::comments::{CommentId, Snapshot};
use crate::error::ThreadError;
use crate::view::ThreadView;

/// Message shown when the notify address fails validation.
pub const INVALID_EMAIL_MESSAGE: &str = "Not a valid email";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuAction {
    Notify,
    Delete,
}

impl MenuAction {
    pub fn as_str(self) -> &'static str {
        match self {
            MenuAction::Notify => "notify",
            MenuAction::Delete => "delete",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            MenuAction::Notify => "Notify",
            MenuAction::Delete => "Delete",
        }
    }
}

/// Which draft a text input edits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputSlot {
    NewSeries,
    Reply(CommentId),
    NotifyEmail(CommentId),
}

/// User interactions, produced by handlers built at render time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiAction {
    ToggleMenu(CommentId),
    ChooseMenu(CommentId, MenuAction),
    ConfirmDelete(CommentId),
    ConfirmNotify(CommentId),
    CancelPopup(CommentId),
    ToggleReply(CommentId),
    CancelReply(CommentId),
    SubmitReply(CommentId),
    SubmitNewSeries,
    Input(InputSlot, String),
}

impl UiAction {
    /// Comment the action is bound to, if any.
    pub fn comment(&self) -> Option<&CommentId> {
        match self {
            UiAction::ToggleMenu(id)
            | UiAction::ChooseMenu(id, _)
            | UiAction::ConfirmDelete(id)
            | UiAction::ConfirmNotify(id)
            | UiAction::CancelPopup(id)
            | UiAction::ToggleReply(id)
            | UiAction::CancelReply(id)
            | UiAction::SubmitReply(id) => Some(id),
            UiAction::SubmitNewSeries | UiAction::Input(..) => None,
        }
    }
}

/// Content of the exclusive popup slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Popup {
    Menu(CommentId),
    ConfirmDelete(CommentId),
    Notify { comment: CommentId, email: String },
}

impl Popup {
    pub fn comment(&self) -> &CommentId {
        match self {
            Popup::Menu(id) | Popup::ConfirmDelete(id) => id,
            Popup::Notify { comment, .. } => comment,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyComposer {
    pub parent: CommentId,
    pub draft: String,
}

/// Work the controller has to carry out on behalf of the view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    CreateSeries { body: String },
    Reply { parent: CommentId, body: String },
    Delete { id: CommentId },
    Notify { id: CommentId, email: String },
    Alert(String),
}

/// Result of feeding one action to the view.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Reaction {
    /// Ephemeral state changed and the container must be re-rendered.
    pub redraw: bool,
    pub command: Option<Command>,
}

impl Reaction {
    fn redraw() -> Self { Self { redraw: true, command: None } }
    fn command(command: Command) -> Self { Self { redraw: false, command: Some(command) } }
}

impl ThreadView {
    /// Applies `action` to the ephemeral state. Actions bound to a comment
    /// that is not in `snapshot` are binding defects and are rejected.
    pub fn handle(&mut self, action: UiAction, snapshot: Option<&Snapshot>) -> Result<Reaction, ThreadError> {
        if let Some(id) = action.comment() {
            if snapshot.and_then(|s| s.find(id)).is_none() {
                return Err(ThreadError::UnknownComment(id.clone()));
            }
        }
        let is_last = |id: &CommentId| snapshot.is_some_and(|s| s.is_last(id));

        let reaction = match action {
            UiAction::ToggleMenu(id) => {
                // a second click anywhere on a menu icon closes the open menu
                if matches!(self.popup, Some(Popup::Menu(_))) {
                    self.popup = None;
                } else {
                    self.popup = Some(Popup::Menu(id));
                }
                Reaction::redraw()
            }
            UiAction::ChooseMenu(id, MenuAction::Notify) => {
                self.popup = Some(Popup::Notify { comment: id, email: String::new() });
                Reaction::redraw()
            }
            UiAction::ChooseMenu(id, MenuAction::Delete) => {
                if is_last(&id) {
                    self.popup = Some(Popup::ConfirmDelete(id));
                } else {
                    warn!(comment = %id, "delete offered for a comment that has replies; ignoring");
                    self.popup = None;
                }
                Reaction::redraw()
            }
            UiAction::ConfirmDelete(id) => match &self.popup {
                Some(Popup::ConfirmDelete(target)) if *target == id => Reaction::command(Command::Delete { id }),
                _ => Reaction::default(),
            },
            UiAction::ConfirmNotify(id) => match &self.popup {
                Some(Popup::Notify { comment, email }) if *comment == id => {
                    if is_valid_email(email) {
                        Reaction::command(Command::Notify { id, email: email.clone() })
                    } else {
                        Reaction::command(Command::Alert(INVALID_EMAIL_MESSAGE.to_string()))
                    }
                }
                _ => Reaction::default(),
            },
            UiAction::CancelPopup(id) => {
                if self.popup.as_ref().is_some_and(|p| *p.comment() == id) {
                    self.popup = None;
                    Reaction::redraw()
                } else {
                    Reaction::default()
                }
            }
            UiAction::ToggleReply(id) => {
                if self.reply.is_some() {
                    self.reply = None;
                    Reaction::redraw()
                } else if is_last(&id) {
                    self.reply = Some(ReplyComposer { parent: id, draft: String::new() });
                    Reaction::redraw()
                } else {
                    debug!(comment = %id, "reply requested on a comment that is not the last of its series");
                    Reaction::default()
                }
            }
            UiAction::CancelReply(id) => {
                if self.reply.as_ref().is_some_and(|r| r.parent == id) {
                    self.reply = None;
                    Reaction::redraw()
                } else {
                    Reaction::default()
                }
            }
            UiAction::SubmitReply(id) => match &self.reply {
                Some(r) if r.parent == id && !r.draft.is_empty() => {
                    Reaction::command(Command::Reply { parent: id, body: r.draft.clone() })
                }
                _ => Reaction::default(),
            },
            UiAction::SubmitNewSeries => {
                if self.new_series_draft.is_empty() {
                    Reaction::default()
                } else {
                    Reaction::command(Command::CreateSeries { body: self.new_series_draft.clone() })
                }
            }
            UiAction::Input(slot, value) => {
                self.update_draft(slot, value);
                Reaction::default()
            }
        };
        Ok(reaction)
    }

    fn update_draft(&mut self, slot: InputSlot, value: String) {
        match slot {
            InputSlot::NewSeries => self.new_series_draft = value,
            InputSlot::Reply(id) => {
                if let Some(r) = self.reply.as_mut().filter(|r| r.parent == id) {
                    r.draft = value;
                }
            }
            InputSlot::NotifyEmail(id) => {
                if let Some(Popup::Notify { comment, email }) = self.popup.as_mut() {
                    if *comment == id {
                        *email = value;
                    }
                }
            }
        }
    }
}

/// Accepts `local@labels.tld` where the final segment is 2-4 letters or
/// 1-3 digits, optionally with a bracketed numeric host. Word characters are
/// ASCII only.
pub fn is_valid_email(input: &str) -> bool {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| {
            Regex::new(
                r"^([A-Za-z0-9_.\-]+)@((\[[0-9]{1,3}\.[0-9]{1,3}\.[0-9]{1,3}\.)|(([A-Za-z0-9_\-]+\.)+))([a-zA-Z]{2,4}|[0-9]{1,3})(\]?)$",
            )
            .ok()
        })
        .as_ref()
        .is_some_and(|re| re.is_match(input))
}
