//! `SequenceView`: keeps a text widget and a [`Sequence`] in step.
//!
//! Local edits arrive as widget content changes, get diffed into operations,
//! applied optimistically and queued for the host to send. Remote updates are
//! applied to the sequence and pushed back into the widget. Selections are
//! held as node anchors so they survive both.

use std::cell::{Ref, RefCell};
use std::rc::{Rc, Weak};

use tracing::{debug, trace, warn};

use crate::diff::Edit;
use crate::error::SyncError;
use crate::guard::{Suppression, SuppressionGuard};
use crate::operation::{Operation, RemoteUpdate};
use crate::selection::AnchorSelection;
use crate::sequence::{ApplyReport, Sequence};
use crate::text::TextRope;
use crate::widget::{ContentChange, TextWidget, WidgetSelection};

struct ViewState {
    sequence: Sequence,
    selection: AnchorSelection,
    outbox: Vec<Operation>,
}

struct ViewInner<W> {
    widget: W,
    suppression: Suppression,
    state: RefCell<ViewState>,
}

/// Bridge between a [`TextWidget`] and a [`Sequence`].
///
/// Single-threaded: widget handlers, selection handlers and remote updates
/// each run to completion on the thread that owns the view.
pub struct SequenceView<W: TextWidget> {
    inner: Rc<ViewInner<W>>,
}

impl<W: TextWidget + 'static> SequenceView<W> {
    /// Take over `widget`, register the change handlers and show `sequence`.
    ///
    /// The caret starts after the last visible character.
    pub fn attach(widget: W, sequence: Sequence) -> Result<Self, SyncError> {
        let inner = Rc::new(ViewInner {
            widget,
            suppression: Suppression::new(),
            state: RefCell::new(ViewState {
                sequence,
                selection: AnchorSelection::at_end(),
                outbox: Vec::new(),
            }),
        });

        let weak: Weak<ViewInner<W>> = Rc::downgrade(&inner);
        inner.widget.on_content_change(Box::new(move |change| {
            if let Some(inner) = weak.upgrade() {
                inner.content_changed(change);
            }
        }));

        let weak: Weak<ViewInner<W>> = Rc::downgrade(&inner);
        inner.widget.on_selection_change(Box::new(move |selection| {
            if let Some(inner) = weak.upgrade() {
                inner.cursor_changed(selection);
            }
        }));

        let view = Self { inner };
        view.sync()?;
        Ok(view)
    }
}

impl<W: TextWidget> SequenceView<W> {
    pub fn widget(&self) -> &W {
        &self.inner.widget
    }

    /// Borrow the underlying sequence.
    ///
    /// # Panics
    ///
    /// If called from inside a widget handler while the view is processing an
    /// edit.
    pub fn sequence(&self) -> Ref<'_, Sequence> {
        Ref::map(self.inner.state.borrow(), |state| &state.sequence)
    }

    /// The visible text.
    pub fn text(&self) -> String {
        self.inner.state.borrow().sequence.text()
    }

    pub fn selection(&self) -> AnchorSelection {
        self.inner.state.borrow().selection
    }

    /// Whether widget notifications are currently being ignored.
    pub fn is_suppressed(&self) -> bool {
        self.inner.suppression.is_active()
    }

    /// Ignore widget notifications until the guard is dropped.
    ///
    /// For hosts that write to the widget themselves.
    pub fn suppress(&self) -> SuppressionGuard<'_> {
        self.inner.suppression.enter()
    }

    /// Drain operations produced by local edits, oldest first.
    pub fn take_outgoing(&self) -> Vec<Operation> {
        std::mem::take(&mut self.inner.state.borrow_mut().outbox)
    }

    /// Apply an update from the merge service, then re-sync the widget.
    pub fn apply_remote(&self, update: RemoteUpdate) -> Result<ApplyReport, SyncError> {
        let mut state = self
            .inner
            .state
            .try_borrow_mut()
            .map_err(|_| SyncError::Busy)?;

        let report = match update {
            RemoteUpdate::Snapshot(nodes) => {
                let inserted = nodes.len();
                state.sequence.replace(nodes);
                ApplyReport {
                    inserted,
                    ..ApplyReport::default()
                }
            }
            RemoteUpdate::Operations(ops) => state.sequence.apply(&ops),
        };

        self.inner.sync_locked(&mut state)?;
        Ok(report)
    }

    /// Push the visible text and the anchored selection into the widget.
    ///
    /// Widget notifications raised by this call are ignored.
    pub fn sync(&self) -> Result<(), SyncError> {
        let mut state = self
            .inner
            .state
            .try_borrow_mut()
            .map_err(|_| SyncError::Busy)?;
        self.inner.sync_locked(&mut state)
    }

    /// Diff and apply a content change as if the widget had reported it.
    pub fn content_changed(&self, change: &ContentChange) {
        self.inner.content_changed(change);
    }

    /// Record a selection as if the widget had reported it.
    pub fn cursor_changed(&self, selection: &WidgetSelection) {
        self.inner.cursor_changed(selection);
    }
}

impl<W: TextWidget> ViewInner<W> {
    fn content_changed(&self, change: &ContentChange) {
        if self.suppression.is_active() {
            trace!("ignoring content change raised by sync");
            return;
        }
        let Ok(mut state) = self.state.try_borrow_mut() else {
            warn!("content change arrived while the view was busy, dropping it");
            return;
        };

        let before = TextRope::from(state.sequence.text());
        let edit = Edit::from_change(change, &before);
        let ops = state.sequence.diff(&edit);
        if ops.is_empty() {
            if !edit.is_empty() {
                // Nothing recorded, so put the widget back in step.
                warn!(
                    kind = ?edit.kind,
                    len = edit.len(),
                    "edit produced no operations, reverting widget"
                );
                if let Err(error) = self.sync_locked(&mut state) {
                    warn!(%error, "failed to revert widget");
                }
            }
            return;
        }

        state.sequence.apply(&ops);
        debug!(ops = ops.len(), "queued local operations");
        state.outbox.extend(ops);

        if let Err(error) = self.sync_locked(&mut state) {
            warn!(%error, "failed to re-sync widget after local edit");
        }
    }

    fn cursor_changed(&self, selection: &WidgetSelection) {
        if self.suppression.is_active() {
            return;
        }
        let Ok(mut state) = self.state.try_borrow_mut() else {
            warn!("selection change arrived while the view was busy, dropping it");
            return;
        };

        let text = TextRope::from(state.sequence.text());
        let start = text.position_to_offset(selection.start);
        let end = text.position_to_offset(selection.end);
        let (start, end) = (start.min(end), start.max(end));

        state.selection = AnchorSelection::new(
            state.sequence.anchor_at(start),
            state.sequence.anchor_at(end),
            selection.backwards,
        );
        trace!(start, end, selection = ?state.selection, "captured selection");
    }

    fn sync_locked(&self, state: &mut ViewState) -> Result<(), SyncError> {
        let _guard = self.suppression.enter();

        let text = state.sequence.text();
        let rope = TextRope::from_str(&text);
        let start = state.sequence.resolve(state.selection.start);
        let end = state.sequence.resolve(state.selection.end);
        let (start, end) = (start.min(end), start.max(end));

        self.widget.set_value(&text)?;
        self.widget.set_selection(WidgetSelection {
            start: rope.offset_to_position(start),
            end: rope.offset_to_position(end),
            backwards: state.selection.reverse,
        })?;

        trace!(chars = rope.len_chars(), start, end, "synced widget");
        Ok(())
    }
}
