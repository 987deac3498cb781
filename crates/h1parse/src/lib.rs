#![warn(missing_docs)]
//! Incremental, event-driven HTTP/1.x parser.
//!
//! This crate turns an unframed byte stream of request or response data
//! into a stream of fine-grained parse events: zero-payload signals
//! (message-begin, header-field-complete, ...) and payload fragments
//! (url bytes, header bytes, body bytes) delivered without retention.
//! Data may arrive in fragments of any size, including one byte at a
//! time; event order is identical for every partition of the same
//! stream. The parser performs no I/O and interprets no semantics
//! beyond framing.
//!
//! # Key types
//!
//! - [`Parser`] — the facade: feed bytes with
//!   [`parse()`](Parser::parse), declare end-of-stream with
//!   [`finish()`](Parser::finish), suspend and resume, inspect the
//!   observable [`ParserState`].
//! - [`Handler`] — trait receiving [`Signal`]s and
//!   [`PayloadKind`]-tagged fragments; [`Callbacks`] is a closure-based
//!   implementation.
//! - [`LenientFlags`] — opt-in deviations for non-compliant peers.
//! - [`Error`] / [`ErrorCode`] — stable numeric codes with `HPE_*`
//!   names; errors latch until [`Parser::reset`], and the two pause
//!   codes are cleared by [`Parser::resume`] /
//!   [`Parser::resume_after_upgrade`].
//!
//! # Example
//!
//! ```
//! use h1parse::{Callbacks, Mode, Parser, PayloadAction, PayloadKind};
//!
//! let mut url = Vec::new();
//! let mut callbacks = Callbacks::new().on_payload(|kind, bytes| {
//!     if kind == PayloadKind::Url {
//!         url.extend_from_slice(bytes);
//!     }
//!     PayloadAction::Proceed
//! });
//!
//! let mut parser = Parser::new(Mode::Request);
//! // Fragment boundaries are arbitrary; state carries across calls.
//! parser.parse(&mut callbacks, b"GET /to").unwrap();
//! parser.parse(&mut callbacks, b"ols HTTP/1.1\r\n\r\n").unwrap();
//! drop(callbacks);
//! assert_eq!(url, b"/tools");
//! ```
//!
//! # Feature flags
//!
//! - **`tracing`** — emit `tracing::warn!` events on lenient discard
//!   paths (data dropped after a close-terminated message, etc.)

mod error;
mod event;
mod lenient;
mod machine;
mod method;
mod parser;

#[cfg(test)]
mod tests;

#[cfg(feature = "tracing")]
macro_rules! trace_warn {
    ($($arg:tt)*) => { ::tracing::warn!($($arg)*) }
}
#[cfg(not(feature = "tracing"))]
macro_rules! trace_warn {
    ($($arg:tt)*) => {};
}
pub(crate) use trace_warn;

pub use error::{Error, ErrorCode};
pub use event::{
    Callbacks,
    Handler,
    HeadersAction,
    PayloadAction,
    PayloadKind,
    Signal,
    SignalAction,
};
pub use lenient::LenientFlags;
pub use method::Method;
pub use parser::{Mode, Parser, ParserState};
