//! ICS file generation and parsing for the directory store.
//!
//! Start and end are written as floating wall-clock times in the store's
//! zone, the way a device calendar keeps them.

mod generate;
mod parse;

pub use generate::generate_ics;
pub use parse::parse_event;
