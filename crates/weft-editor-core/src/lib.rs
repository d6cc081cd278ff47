//! weft-editor-core: the bridge between a text widget and a replicated
//! character sequence.
//!
//! This crate provides:
//! - `Sequence` - the tombstoned node list, diffing and operation application
//! - `SequenceView<W>` - keeps a `TextWidget` in step with a `Sequence`
//! - `Operation` / `Node` - the wire vocabulary shared with the merge service
//! - `HeadlessWidget` - a rope-backed widget for hosts without a UI

mod diff;
mod error;
mod guard;
mod headless;
mod node;
mod operation;
mod selection;
mod sequence;
pub mod text;
mod view;
pub mod widget;

pub use diff::{Edit, EditKind};
pub use error::SyncError;
pub use guard::{Suppression, SuppressionGuard};
pub use headless::HeadlessWidget;
pub use node::{Node, NodeId, ReplicaClock, ReplicaId};
pub use operation::{Operation, Protocol, RemoteUpdate};
pub use selection::{Anchor, AnchorSelection};
pub use sequence::{ApplyReport, Sequence};
pub use smol_str::SmolStr;
pub use text::TextRope;
pub use view::SequenceView;
pub use widget::{
    ChangeAction, ContentChange, Position, TextWidget, WidgetError, WidgetSelection,
};
