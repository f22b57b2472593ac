//! Threaded comment widget core.
//!
//! Keeps a grouped snapshot of a document's comment series in sync with a
//! remote comment store and derives a renderable view of it. Platform
//! bindings provide a [`store::Transport`] and a [`controller::Surface`].

pub mod comments;
pub mod config;
pub mod controller;
pub mod error;
pub mod html;
pub mod interaction;
pub mod model;
pub mod store;
pub mod view;

#[cfg(test)]
pub(crate) mod testing;

pub use comments::{Comment, CommentId, SeriesGroup, SeriesId, Snapshot};
pub use config::WidgetConfig;
pub use controller::{ControllerState, ResyncOutcome, ResyncTicket, Surface, ThreadController};
pub use error::{ConfigError, SnapshotError, StoreError, ThreadError};
pub use interaction::{Command, InputSlot, MenuAction, Popup, Reaction, UiAction};
pub use model::ThreadModel;
pub use store::{CommentStore, Endpoints, HttpCommentStore, Method, StoreRequest, StoreResponse, Transport};
pub use view::{Element, InputBinding, ThreadView, ViewNode, ViewTree};
