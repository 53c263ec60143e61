//! Conversion between `EventModel` and Google's event record.

mod from_google;
mod to_google;

pub use from_google::FromGoogle;
pub use to_google::ToGoogle;
