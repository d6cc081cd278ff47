//! Error types for view synchronization.

use miette::Diagnostic;
use thiserror::Error;

use crate::widget::WidgetError;

/// Errors that can occur while pushing the sequence into the widget.
#[derive(Error, Debug, Diagnostic)]
#[non_exhaustive]
pub enum SyncError {
    /// The widget refused the new value or selection.
    #[error("widget rejected update")]
    #[diagnostic(code(weft::sync::widget))]
    Widget(#[from] WidgetError),

    /// A widget handler is still running against the view state.
    #[error("view state is busy")]
    #[diagnostic(
        code(weft::sync::busy),
        help("widgets must not call back into the view while a handler holds it")
    )]
    Busy,
}
