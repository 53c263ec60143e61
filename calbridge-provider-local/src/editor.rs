//! Interactive event editing.

use async_trait::async_trait;

use crate::store::NativeEvent;

/// How the user left the editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditAction {
    Saved,
    Cancelled,
    Deleted,
}

/// Broadcast once an editor presented by the local backend is dismissed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditingEnded {
    pub action: EditAction,
}

/// A UI that lets the user create or edit an event.
///
/// Implementations are responsible for running on whatever execution
/// context their UI requires, and for saving the event themselves.
#[async_trait]
pub trait EventEditor: Send + Sync {
    /// Show the editor pre-filled with `draft` (blank when `None`) and
    /// resolve when the user dismisses it.
    async fn edit(&self, draft: Option<NativeEvent>) -> EditAction;
}
