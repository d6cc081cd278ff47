//! A widget with no UI, backed by a rope.
//!
//! Behaves like a line-oriented editor control: every change to its buffer,
//! programmatic or not, is reported to the content handlers, and every caret
//! move to the selection handlers. Hosts without a real editor (the CLI,
//! tests) drive the view through it.

use std::cell::RefCell;
use std::ops::Range;
use std::rc::Rc;

use crate::text::TextRope;
use crate::widget::{
    ChangeAction, ContentChange, ContentHandler, Position, SelectionHandler, TextWidget,
    WidgetError, WidgetSelection,
};

#[derive(Default)]
pub struct HeadlessWidget {
    buffer: RefCell<TextRope>,
    selection: RefCell<WidgetSelection>,
    content_handlers: RefCell<Vec<Rc<dyn Fn(&ContentChange)>>>,
    selection_handlers: RefCell<Vec<Rc<dyn Fn(&WidgetSelection)>>>,
}

impl HeadlessWidget {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current buffer contents.
    pub fn value(&self) -> String {
        self.buffer.borrow().to_string()
    }

    pub fn selection(&self) -> WidgetSelection {
        *self.selection.borrow()
    }

    /// Selection as visible char offsets.
    pub fn selection_offsets(&self) -> Range<usize> {
        let selection = self.selection();
        let buffer = self.buffer.borrow();
        buffer.position_to_offset(selection.start)..buffer.position_to_offset(selection.end)
    }

    /// Type `text` at a char offset, as a user would: the caret is placed at
    /// `offset` first and ends up after the inserted text.
    pub fn insert(&self, offset: usize, text: &str) {
        if text.is_empty() {
            return;
        }
        self.place_caret(offset);
        let change = {
            let mut buffer = self.buffer.borrow_mut();
            let offset = offset.min(buffer.len_chars());
            let start = buffer.offset_to_position(offset);
            buffer.insert(offset, text);
            let end = buffer.offset_to_position(offset + text.chars().count());
            ContentChange {
                action: ChangeAction::Insert,
                start,
                end,
                lines: split_lines(text),
            }
        };
        self.move_caret(change.end);
        self.emit_content(&change);
        self.emit_selection();
    }

    /// Delete a char range the way backspace does: the caret is placed at the
    /// end of the range first and ends up at its start.
    pub fn delete(&self, range: Range<usize>) {
        if range.start >= range.end {
            return;
        }
        self.place_caret(range.end);
        let change = {
            let mut buffer = self.buffer.borrow_mut();
            let end = range.end.min(buffer.len_chars());
            let start = range.start.min(end);
            if start == end {
                return;
            }
            let removed = buffer.slice(start..end).unwrap_or_default();
            let change = ContentChange {
                action: ChangeAction::Remove,
                start: buffer.offset_to_position(start),
                end: buffer.offset_to_position(end),
                lines: split_lines(&removed),
            };
            buffer.delete(start..end);
            change
        };
        self.move_caret(change.start);
        self.emit_content(&change);
        self.emit_selection();
    }

    /// Select a char range, as a user would. `head < anchor` selects
    /// backwards.
    pub fn select(&self, anchor: usize, head: usize) {
        {
            let buffer = self.buffer.borrow();
            let (start, end) = (anchor.min(head), anchor.max(head));
            *self.selection.borrow_mut() = WidgetSelection {
                start: buffer.offset_to_position(start),
                end: buffer.offset_to_position(end),
                backwards: head < anchor,
            };
        }
        self.emit_selection();
    }

    fn place_caret(&self, offset: usize) {
        let at = {
            let buffer = self.buffer.borrow();
            buffer.offset_to_position(offset)
        };
        if self.selection() != WidgetSelection::collapsed(at) {
            self.move_caret(at);
            self.emit_selection();
        }
    }

    fn move_caret(&self, at: Position) {
        *self.selection.borrow_mut() = WidgetSelection::collapsed(at);
    }

    fn emit_content(&self, change: &ContentChange) {
        let handlers = self.content_handlers.borrow().clone();
        for handler in handlers {
            handler(change);
        }
    }

    fn emit_selection(&self) {
        let selection = self.selection();
        let handlers = self.selection_handlers.borrow().clone();
        for handler in handlers {
            handler(&selection);
        }
    }
}

impl TextWidget for HeadlessWidget {
    fn on_content_change(&self, handler: ContentHandler) {
        self.content_handlers.borrow_mut().push(Rc::from(handler));
    }

    fn on_selection_change(&self, handler: SelectionHandler) {
        self.selection_handlers.borrow_mut().push(Rc::from(handler));
    }

    /// Replaces the buffer the way editor controls do: a removal of the old
    /// contents followed by an insertion of the new, both reported.
    fn set_value(&self, text: &str) -> Result<(), WidgetError> {
        let (removed, inserted) = {
            let mut buffer = self.buffer.borrow_mut();
            let old = buffer.to_string();
            let removed = (!old.is_empty()).then(|| ContentChange {
                action: ChangeAction::Remove,
                start: Default::default(),
                end: buffer.offset_to_position(buffer.len_chars()),
                lines: split_lines(&old),
            });
            *buffer = TextRope::from_str(text);
            let inserted = (!text.is_empty()).then(|| ContentChange {
                action: ChangeAction::Insert,
                start: Default::default(),
                end: buffer.offset_to_position(buffer.len_chars()),
                lines: split_lines(text),
            });
            (removed, inserted)
        };

        for change in removed.iter().chain(inserted.iter()) {
            self.emit_content(change);
        }
        Ok(())
    }

    fn set_selection(&self, selection: WidgetSelection) -> Result<(), WidgetError> {
        {
            let buffer = self.buffer.borrow();
            let clamp = |p| buffer.offset_to_position(buffer.position_to_offset(p));
            *self.selection.borrow_mut() = WidgetSelection {
                start: clamp(selection.start),
                end: clamp(selection.end),
                backwards: selection.backwards,
            };
        }
        self.emit_selection();
        Ok(())
    }
}

fn split_lines(text: &str) -> Vec<String> {
    text.split('\n').map(str::to_string).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_insert_reports_change() {
        let widget = HeadlessWidget::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        widget.on_content_change(Box::new(move |change| sink.borrow_mut().push(change.clone())));

        widget.insert(0, "ab\nc");
        widget.delete(1..3);

        let seen = seen.borrow();
        assert_eq!(seen[0].action, ChangeAction::Insert);
        assert_eq!(seen[0].lines, vec!["ab".to_string(), "c".to_string()]);
        assert_eq!(seen[1].action, ChangeAction::Remove);
        assert_eq!(seen[1].text(), "b\n");
        assert_eq!(widget.value(), "ac");
        assert_eq!(widget.selection_offsets(), 1..1);
    }

    #[test]
    fn test_set_value_reports_changes() {
        let widget = HeadlessWidget::new();
        let count = Rc::new(Cell::new(0));
        let counter = count.clone();
        widget.on_content_change(Box::new(move |_| counter.set(counter.get() + 1)));

        widget.set_value("abc").unwrap();
        assert_eq!(count.get(), 1);
        widget.set_value("xyz").unwrap();
        assert_eq!(count.get(), 3);
        assert_eq!(widget.value(), "xyz");
    }

    #[test]
    fn test_select_backwards() {
        let widget = HeadlessWidget::new();
        widget.set_value("hello").unwrap();
        widget.select(4, 1);
        assert!(widget.selection().backwards);
        assert_eq!(widget.selection_offsets(), 1..4);
    }

    #[test]
    fn test_set_selection_clamps() {
        let widget = HeadlessWidget::new();
        widget.set_value("hi").unwrap();
        widget
            .set_selection(WidgetSelection::collapsed(Position::new(3, 9)))
            .unwrap();
        assert_eq!(widget.selection_offsets(), 2..2);
    }
}
