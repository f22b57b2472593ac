//! Virtual view tree for the thread and the renderer that derives it from a
//! snapshot plus the ephemeral interaction state.
//!
//! The tree is platform-neutral: the browser binding turns it into DOM nodes,
//! [`crate::html`] turns it into markup. Handlers are [`UiAction`] values that
//! already carry the acting comment's identity.

use crate::comments::{Comment, Snapshot};
use crate::interaction::{InputSlot, MenuAction, Popup, ReplyComposer, UiAction};

/// Class names used by the rendered thread.
pub mod class {
    pub const CONTAINER: &str = "smart-comments-container";
    pub const SERIES: &str = "smart-comments-series";
    pub const NEW_SERIES: &str = "smart-comments-new-series";
    pub const COMMENT: &str = "smart-comments-comment";
    pub const FLAT: &str = "flat";
    pub const EDIT: &str = "edit";
    pub const USER: &str = "smart-comments-user";
    pub const MENU_ICON: &str = "smart-comments-menu-icon";
    pub const MENU: &str = "smart-comments-menu";
    pub const TIMELINE: &str = "smart-comments-timeline";
    pub const BODY: &str = "smart-comments-body";
    pub const REPLYING: &str = "smart-comments-replying";
    pub const REPLY_INPUT: &str = "smart-comments-reply-input";
    pub const NEW_SERIES_INPUT: &str = "smart-comments-new-series-input";
    pub const BUTTONS: &str = "smart-comments-buttons";
    pub const BLACKOUT: &str = "smart-comments-blackout";
    pub const DELETE_POPUP: &str = "smart-comments-delete-popup";
    pub const NOTIFY_POPUP: &str = "smart-comments-notify-popup";
    pub const EMAIL_INPUT: &str = "smart-comments-email-input";
}

pub const ATTR_SERIES_ID: &str = "data-series-id";
pub const ATTR_COMMENT_ID: &str = "data-comment-id";
pub const ATTR_ACTION: &str = "data-action";

#[derive(Debug, Clone, PartialEq)]
pub enum ViewNode {
    Element(Element),
    /// Plain text, escaped on output.
    Text(String),
    /// Store-escaped rich text, inserted as is.
    Markup(String),
}

/// Text input bound to a draft in the interaction state.
#[derive(Debug, Clone, PartialEq)]
pub struct InputBinding {
    pub slot: InputSlot,
    pub value: String,
    /// Grow the input to fit its content while typing.
    pub auto_grow: bool,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Element {
    pub tag: &'static str,
    pub classes: Vec<&'static str>,
    pub attrs: Vec<(&'static str, String)>,
    pub children: Vec<ViewNode>,
    pub on_click: Option<UiAction>,
    /// The click handler runs without cancelling the browser's default
    /// action, so links in store markup stay followable.
    pub allow_default: bool,
    pub input: Option<InputBinding>,
}

impl Element {
    pub fn new(tag: &'static str) -> Self { Self { tag, ..Self::default() } }

    pub fn class(mut self, class: &'static str) -> Self {
        self.classes.push(class);
        self
    }

    pub fn attr(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.attrs.push((name, value.into()));
        self
    }

    pub fn child(mut self, child: impl Into<ViewNode>) -> Self {
        self.children.push(child.into());
        self
    }

    pub fn text(self, text: impl Into<String>) -> Self { self.child(ViewNode::Text(text.into())) }

    pub fn on_click(mut self, action: UiAction) -> Self {
        self.on_click = Some(action);
        self
    }

    pub fn allow_default(mut self) -> Self {
        self.allow_default = true;
        self
    }

    pub fn bind(mut self, slot: InputSlot, value: &str, auto_grow: bool) -> Self {
        self.input = Some(InputBinding { slot, value: value.to_string(), auto_grow });
        self
    }

    pub fn has_class(&self, class: &str) -> bool { self.classes.iter().any(|c| *c == class) }

    pub fn get_attr(&self, name: &str) -> Option<&str> {
        self.attrs.iter().find(|(n, _)| *n == name).map(|(_, v)| v.as_str())
    }

    /// Direct element children.
    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|c| match c {
            ViewNode::Element(e) => Some(e),
            _ => None,
        })
    }

    /// Descendant elements carrying `class`, in document order.
    pub fn find_all<'a>(&'a self, class: &str) -> Vec<&'a Element> {
        let mut out = Vec::new();
        collect(self.elements(), class, &mut out);
        out
    }

    /// Concatenated text and markup below this element.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        for child in &self.children {
            match child {
                ViewNode::Element(e) => out.push_str(&e.text_content()),
                ViewNode::Text(t) | ViewNode::Markup(t) => out.push_str(t),
            }
        }
        out
    }
}

impl From<Element> for ViewNode {
    fn from(e: Element) -> Self { ViewNode::Element(e) }
}

fn collect<'a>(elements: impl Iterator<Item = &'a Element>, class: &str, out: &mut Vec<&'a Element>) {
    for e in elements {
        if e.has_class(class) {
            out.push(e);
        }
        collect(e.elements(), class, out);
    }
}

/// Children of the thread container.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ViewTree {
    pub nodes: Vec<ViewNode>,
}

impl ViewTree {
    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.nodes.iter().filter_map(|n| match n {
            ViewNode::Element(e) => Some(e),
            _ => None,
        })
    }

    pub fn find_all<'a>(&'a self, class: &str) -> Vec<&'a Element> {
        let mut out = Vec::new();
        collect(self.elements(), class, &mut out);
        out
    }

    /// Series containers holding fetched comments, without the composer.
    pub fn series(&self) -> Vec<&Element> {
        self.elements().filter(|e| e.has_class(class::SERIES) && !e.has_class(class::NEW_SERIES)).collect()
    }

    /// Rendered entry of one comment.
    pub fn comment(&self, id: &str) -> Option<&Element> {
        self.find_all(class::COMMENT).into_iter().find(|e| e.get_attr(ATTR_COMMENT_ID) == Some(id))
    }
}

/// Ephemeral UI state. Lives only between two resyncs and is never part of
/// the thread model.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ThreadView {
    pub(crate) popup: Option<Popup>,
    pub(crate) reply: Option<ReplyComposer>,
    pub(crate) new_series_draft: String,
}

impl ThreadView {
    pub fn new() -> Self { Self::default() }

    pub fn popup(&self) -> Option<&Popup> { self.popup.as_ref() }
    pub fn reply_composer(&self) -> Option<&ReplyComposer> { self.reply.as_ref() }
    pub fn new_series_draft(&self) -> &str { &self.new_series_draft }

    /// Drops every open popup, composer and draft.
    pub fn reset(&mut self) { *self = Self::default(); }

    /// Full render: one container per series, one entry per comment, then the
    /// new-series composer.
    pub fn render(&self, snapshot: Option<&Snapshot>, user_name: &str) -> ViewTree {
        let mut nodes: Vec<ViewNode> = Vec::new();
        for group in snapshot.into_iter().flat_map(Snapshot::iter) {
            let Some(series_id) = group.series_id() else { continue };
            let last = group.len() - 1;
            let mut container = Element::new("div").class(class::SERIES).attr(ATTR_SERIES_ID, series_id.as_str());
            for (i, comment) in group.iter().enumerate() {
                container = container.child(self.comment_entry(comment, i == last));
            }
            nodes.push(container.into());
        }
        nodes.push(self.new_series_composer(user_name).into());
        ViewTree { nodes }
    }

    fn comment_entry(&self, comment: &Comment, is_last: bool) -> Element {
        let id = &comment.id;
        let mut entry = Element::new("div").class(class::COMMENT).class(class::FLAT).attr(ATTR_COMMENT_ID, id.as_str());

        match &self.popup {
            Some(Popup::ConfirmDelete(target)) if target == id => {
                entry = entry.class(class::BLACKOUT).child(delete_prompt(comment));
            }
            Some(Popup::Notify { comment: target, email }) if target == id => {
                entry = entry.class(class::BLACKOUT).child(notify_prompt(comment, email));
            }
            _ => {}
        }

        let mut icon = Element::new("span").class(class::MENU_ICON).text("\u{22ee}").on_click(UiAction::ToggleMenu(id.clone()));
        if matches!(&self.popup, Some(Popup::Menu(target)) if target == id) {
            icon = icon.child(context_menu(comment, is_last));
        }

        let header = Element::new("header")
            .child(Element::new("h4").class(class::USER).text(comment.author.as_str()).child(icon))
            .child(Element::new("p").class(class::TIMELINE).text(comment.timestamp.as_str()));
        entry = entry.child(header);

        let composer = self.reply.as_ref().filter(|r| &r.parent == id);
        let mut body = Element::new("section").class(class::BODY).child(ViewNode::Markup(comment.body.clone()));
        if is_last {
            body = body.on_click(UiAction::ToggleReply(id.clone())).allow_default();
        }
        if composer.is_some() {
            body = body.class(class::REPLYING);
        }
        entry = entry.child(body);

        if let Some(composer) = composer {
            entry = entry
                .child(
                    Element::new("textarea")
                        .class(class::REPLY_INPUT)
                        .attr("name", "reply")
                        .bind(InputSlot::Reply(id.clone()), &composer.draft, true),
                )
                .child(
                    Element::new("div")
                        .class(class::BUTTONS)
                        .child(Element::new("button").text("Reply").on_click(UiAction::SubmitReply(id.clone())))
                        .child(Element::new("button").text("Cancel").on_click(UiAction::CancelReply(id.clone()))),
                );
        }
        entry
    }

    fn new_series_composer(&self, user_name: &str) -> Element {
        Element::new("div").class(class::SERIES).class(class::NEW_SERIES).child(
            Element::new("div")
                .class(class::COMMENT)
                .class(class::EDIT)
                .child(Element::new("header").child(Element::new("h4").class(class::USER).text(user_name)))
                .child(
                    Element::new("textarea")
                        .class(class::NEW_SERIES_INPUT)
                        .attr("name", "comment")
                        .bind(InputSlot::NewSeries, &self.new_series_draft, true),
                )
                .child(
                    Element::new("div")
                        .class(class::BUTTONS)
                        .child(Element::new("button").text("Comment").on_click(UiAction::SubmitNewSeries)),
                ),
        )
    }
}

/// Last comments offer notify and delete, earlier ones notify only.
pub fn menu_actions(is_last: bool) -> &'static [MenuAction] {
    if is_last {
        &[MenuAction::Notify, MenuAction::Delete]
    } else {
        &[MenuAction::Notify]
    }
}

fn context_menu(comment: &Comment, is_last: bool) -> Element {
    menu_actions(is_last).iter().fold(Element::new("ul").class(class::MENU), |menu, action| {
        menu.child(
            Element::new("li")
                .attr(ATTR_ACTION, action.as_str())
                .text(action.label())
                .on_click(UiAction::ChooseMenu(comment.id.clone(), *action)),
        )
    })
}

fn delete_prompt(comment: &Comment) -> Element {
    Element::new("div").class(class::DELETE_POPUP).text("Delete this comment?").child(
        Element::new("div")
            .class(class::BUTTONS)
            .child(Element::new("button").text("Delete").on_click(UiAction::ConfirmDelete(comment.id.clone())))
            .child(Element::new("button").text("Cancel").on_click(UiAction::CancelPopup(comment.id.clone()))),
    )
}

fn notify_prompt(comment: &Comment, email: &str) -> Element {
    Element::new("div")
        .class(class::NOTIFY_POPUP)
        .child(Element::new("label").text("Enter Email:"))
        .child(
            Element::new("input")
                .class(class::EMAIL_INPUT)
                .attr("type", "text")
                .attr("placeholder", "example@example.com")
                .bind(InputSlot::NotifyEmail(comment.id.clone()), email, false),
        )
        .child(
            Element::new("div")
                .class(class::BUTTONS)
                .child(Element::new("button").text("Notify").on_click(UiAction::ConfirmNotify(comment.id.clone())))
                .child(Element::new("button").text("Cancel").on_click(UiAction::CancelPopup(comment.id.clone()))),
        )
}

/// Renders loose comments as flat entries, e.g. to preview a subset of a
/// thread outside the main container.
pub fn render_comments(comments: &[Comment]) -> ViewTree {
    let view = ThreadView::default();
    ViewTree { nodes: comments.iter().map(|c| view.comment_entry(c, false).into()).collect() }
}

/// Height an auto-growing input needs so its content fits without scrolling.
/// Inputs only grow; `None` means the current height already fits.
pub fn grown_height(offset_height: i32, client_height: i32, scroll_height: i32) -> Option<i32> {
    let borders = (offset_height - client_height).max(0);
    let needed = scroll_height + borders;
    (needed > offset_height).then_some(needed)
}
