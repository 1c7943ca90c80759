//! Wire types for the two external protocols statusbulb speaks.
//!
//! This crate contains the serde-serializable shapes exchanged with a W3C
//! WebDriver server (chromedriver) over HTTP and with a Yeelight bulb over its
//! LAN JSON-line protocol.
//!
//! # Design Philosophy
//!
//! Types in this crate are:
//! * Pure data: no I/O, only (de)serialization and small encoding helpers
//! * 1:1 with the wire: field names match what the peers send and expect
//! * Stable: changes only when a peer's protocol changes
//!
//! Clients that actually talk to the peers live in `statusbulb-runtime`.

pub mod webdriver;
pub mod yeelight;

pub use webdriver::*;
pub use yeelight::*;
