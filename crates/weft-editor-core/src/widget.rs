//! Capability interface for the host text widget.
//!
//! The view never talks to a concrete editor. Anything that can report content
//! and selection changes and accept a new value and selection can be driven by
//! a [`SequenceView`](crate::SequenceView): a browser editor binding, a native
//! text control, or the [`HeadlessWidget`](crate::HeadlessWidget) used by the
//! CLI and the tests.

use miette::Diagnostic;
use thiserror::Error;

/// Error reported by a widget when it cannot apply an update.
#[derive(Debug, Clone, Error, Diagnostic)]
#[error("{0}")]
#[diagnostic(code(weft::widget))]
pub struct WidgetError(pub String);

impl From<&str> for WidgetError {
    fn from(s: &str) -> Self {
        WidgetError(s.to_string())
    }
}

impl From<String> for WidgetError {
    fn from(s: String) -> Self {
        WidgetError(s)
    }
}

/// Row/column position as reported by line-oriented widgets.
///
/// Columns count chars, not bytes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Position {
    pub row: usize,
    pub column: usize,
}

impl Position {
    pub fn new(row: usize, column: usize) -> Self {
        Self { row, column }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChangeAction {
    Insert,
    Remove,
}

/// A content change as the widget reports it.
///
/// `lines` holds the inserted or removed text split on line breaks, so
/// `["ab", ""]` is `"ab\n"`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContentChange {
    pub action: ChangeAction,
    pub start: Position,
    pub end: Position,
    pub lines: Vec<String>,
}

impl ContentChange {
    /// The changed text with line breaks restored.
    pub fn text(&self) -> String {
        self.lines.join("\n")
    }
}

/// Selection in widget coordinates. `start` never comes after `end`;
/// `backwards` records that the caret sits at `start`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct WidgetSelection {
    pub start: Position,
    pub end: Position,
    pub backwards: bool,
}

impl WidgetSelection {
    pub fn collapsed(at: Position) -> Self {
        Self {
            start: at,
            end: at,
            backwards: false,
        }
    }

    pub fn is_collapsed(&self) -> bool {
        self.start == self.end
    }
}

pub type ContentHandler = Box<dyn Fn(&ContentChange)>;
pub type SelectionHandler = Box<dyn Fn(&WidgetSelection)>;

/// What the bridge needs from a text widget.
///
/// Methods take `&self`: widgets are handles onto UI state and may call the
/// registered handlers synchronously from inside `set_value` or
/// `set_selection`. Implementations must not hold internal borrows while
/// invoking handlers.
pub trait TextWidget {
    /// Register a handler called for every content change.
    fn on_content_change(&self, handler: ContentHandler);

    /// Register a handler called whenever the selection moves.
    fn on_selection_change(&self, handler: SelectionHandler);

    /// Replace the whole buffer.
    fn set_value(&self, text: &str) -> Result<(), WidgetError>;

    /// Move the selection.
    fn set_selection(&self, selection: WidgetSelection) -> Result<(), WidgetError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_change_text_rejoins_lines() {
        let change = ContentChange {
            action: ChangeAction::Insert,
            start: Position::new(0, 0),
            end: Position::new(1, 0),
            lines: vec!["ab".into(), "".into()],
        };
        assert_eq!(change.text(), "ab\n");
    }

    #[test]
    fn test_widget_error_from_str() {
        let err = WidgetError::from("detached");
        assert_eq!(err.to_string(), "detached");
    }
}
