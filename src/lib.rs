//! calbridge - add, remove and list events across a device-local calendar
//! and a Google account through one call surface.
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use calbridge::CalendarDispatcher;
//! use calbridge_core::config::CalbridgeConfig;
//! use calbridge_core::target::BackendTarget;
//! use calbridge_core::{AddMethod, EventModel};
//! use calbridge_provider_google::google::BrowserSurface;
//!
//! # async fn run(event: EventModel) -> anyhow::Result<()> {
//! let dispatcher = CalendarDispatcher::from_config(&CalbridgeConfig::load()?)?;
//! let targets = [
//!     BackendTarget::Native,
//!     BackendTarget::remote(Arc::new(BrowserSurface), "client-id.apps.googleusercontent.com"),
//! ];
//!
//! dispatcher
//!     .add(
//!         AddMethod::Easy(event),
//!         &targets,
//!         |target, status| println!("{target}: {status}"),
//!         |target, error| eprintln!("{target}: {error}"),
//!     )
//!     .await;
//! # Ok(())
//! # }
//! ```

mod dispatcher;
pub mod logging;

pub use dispatcher::CalendarDispatcher;
