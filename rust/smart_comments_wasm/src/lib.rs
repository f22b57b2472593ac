//! Browser binding for the smart comments thread widget.
//!
//! ```javascript
//! import init, { CommentWidget } from './smart_comments_wasm.js';
//!
//! await init();
//! const widget = new CommentWidget('#sidebar', {
//!     documentId: 'doc-42', userName: 'Ana',
//!     fetchAllUrl: '/comments', newSeriesUrl: '/comments/new',
//!     replyUrl: '/comments/reply', deleteUrl: '/comments/delete',
//!     notifyUrl: '/comments/notify',
//! });
//! // later
//! widget.remove();
//! ```

#[cfg(target_arch = "wasm32")]
mod dom;
#[cfg(target_arch = "wasm32")]
mod fetch;
#[cfg(target_arch = "wasm32")]
mod logging;
#[cfg(target_arch = "wasm32")]
mod widget;

#[cfg(target_arch = "wasm32")]
pub use widget::*;

/// Appends an encoded query string to `url`, keeping any query it already has.
pub fn with_query(url: &str, query: &str) -> String {
    if query.is_empty() {
        return url.to_string();
    }
    let sep = if url.contains('?') {
        if url.ends_with('?') || url.ends_with('&') { "" } else { "&" }
    } else {
        "?"
    };
    format!("{url}{sep}{query}")
}
