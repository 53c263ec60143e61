//! Google Calendar implementations of the remote collaborators.

mod browser;
mod oauth;
mod retry;
mod service;
mod session_store;

pub use browser::BrowserSurface;
pub use oauth::{GoogleSessionProvider, SCOPES, redirect_uri};
pub use retry::RetryPolicy;
pub use service::{GoogleCalendarService, GoogleServiceFactory};
pub use session_store::SessionStore;
