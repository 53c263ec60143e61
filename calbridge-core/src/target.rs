//! Backend targets and the presentation surface handle.

use std::fmt;
use std::sync::Arc;

/// Google's alias for the signed-in user's main calendar
pub const DEFAULT_CALENDAR_ID: &str = "primary";

/// Caller-supplied anchor for interactive prompts.
///
/// The core never looks inside it; it only hands it the prompts that need a
/// user (today: the account sign-in page).
pub trait PresentationSurface: Send + Sync {
    /// Show the sign-in page at `url` to the user.
    fn present_sign_in(&self, url: &str) -> std::io::Result<()>;
}

/// Which backend an operation is addressed to.
#[derive(Clone)]
pub enum BackendTarget {
    /// The device-local calendar store
    Native,
    /// A cloud calendar reached through a signed-in account
    Remote(RemoteTarget),
}

impl BackendTarget {
    pub fn remote(surface: Arc<dyn PresentationSurface>, client_id: impl Into<String>) -> Self {
        BackendTarget::Remote(RemoteTarget::new(surface, client_id))
    }
}

/// Parameters of a remote target.
#[derive(Clone)]
pub struct RemoteTarget {
    pub surface: Arc<dyn PresentationSurface>,
    pub client_id: String,
    pub calendar_id: String,
}

impl RemoteTarget {
    pub fn new(surface: Arc<dyn PresentationSurface>, client_id: impl Into<String>) -> Self {
        RemoteTarget {
            surface,
            client_id: client_id.into(),
            calendar_id: DEFAULT_CALENDAR_ID.to_string(),
        }
    }

    pub fn with_calendar_id(mut self, calendar_id: impl Into<String>) -> Self {
        self.calendar_id = calendar_id.into();
        self
    }
}

impl fmt::Debug for RemoteTarget {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("RemoteTarget")
            .field("client_id", &self.client_id)
            .field("calendar_id", &self.calendar_id)
            .finish_non_exhaustive()
    }
}

impl fmt::Debug for BackendTarget {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            BackendTarget::Native => write!(f, "Native"),
            BackendTarget::Remote(remote) => f.debug_tuple("Remote").field(remote).finish(),
        }
    }
}

impl fmt::Display for BackendTarget {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            BackendTarget::Native => write!(f, "native"),
            BackendTarget::Remote(remote) => write!(f, "remote:{}", remote.calendar_id),
        }
    }
}
