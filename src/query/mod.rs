//! Request/response helpers on top of free-text chat.

mod markers;
mod wait;

pub(crate) use markers::CaptureWindow;
pub use markers::Markers;
pub use wait::await_first_match;
