//! calbridge-provider-local - the device-local calendar backend.
//!
//! `LocalBackend` implements the calbridge capability interface on top of a
//! `CalendarStore`. Two stores ship with the crate:
//! - `DirectoryStore` keeps one .ics file per event in a directory
//! - `MemoryStore` keeps events in process memory

mod backend;
mod directory;
mod editor;
mod gate;
mod html;
mod ics;
mod memory;
mod store;

pub use backend::{EVENT_ADDED, EVENT_REMOVED, LocalBackend};
pub use directory::DirectoryStore;
pub use editor::{EditAction, EditingEnded, EventEditor};
pub use gate::LocalAuthorizationGate;
pub use html::{looks_like_html, plain_text};
pub use memory::MemoryStore;
pub use store::{CalendarStore, NativeEvent};
