//! # fleetwatch-proto
//!
//! The seam between fleetwatch and whatever client library actually speaks
//! the game protocol.
//!
//! ## Features
//!
//! - [`SessionEvent`]: everything a live session can report (join, side-panel
//!   changes, chat lines, disconnects, kicks, protocol errors, device codes)
//! - [`WorldConnection`] / [`Connector`]: the handle and factory traits a
//!   protocol adapter implements
//! - [`Objective`]: side-panel snapshots with ordered, cleaned text lines
//! - [`format`]: stripping of `§` formatting codes
//!
//! Nothing in this crate performs I/O. Adapters live elsewhere and feed
//! events through the [`EventStream`] returned by [`Connector::connect`].

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod conn;
pub mod display;
pub mod error;
pub mod event;
pub mod format;

pub use self::conn::{AuthMode, ConnectOptions, Connector, EventStream, WorldConnection};
pub use self::display::{DisplaySlot, Objective, ScoreEntry};
pub use self::error::{ProtoError, Result};
pub use self::event::{DeviceCode, SessionEvent};
pub use self::format::FormattedStringExt;
