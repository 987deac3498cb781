//! Parse events and the callback surface.
//!
//! The parser communicates with its caller through two event families:
//! zero-payload [`Signal`]s that mark grammar boundaries, and
//! [`PayloadKind`]-tagged byte fragments. Fragment bytes borrow from the
//! buffer passed to `parse()` and are only valid for the duration of the
//! callback; a handler that needs them later must copy.

use crate::error::ErrorCode;
use crate::parser::ParserState;

/// A zero-payload event marking a boundary in the HTTP/1.x grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Signal {
    /// A new message has started.
    MessageBegin,
    /// The current message is fully parsed.
    MessageComplete,
    /// The parser is about to begin the next message on the same stream.
    /// Fires exactly once between two consecutive messages.
    Reset,
    /// The request target is complete.
    UrlComplete,
    /// The request method is complete.
    MethodComplete,
    /// The protocol name (`HTTP`) is complete.
    ProtocolComplete,
    /// The version (`major.minor`) is complete.
    VersionComplete,
    /// The response reason phrase is complete (possibly empty).
    StatusComplete,
    /// A header (or trailer) field name is complete.
    HeaderFieldComplete,
    /// A header (or trailer) field value is complete (possibly empty).
    HeaderValueComplete,
    /// A chunk-size line is complete; the chunk size is readable from
    /// [`ParserState::content_length`].
    ChunkHeader,
    /// A chunk (including the terminating zero-length chunk) is complete.
    ChunkComplete,
    /// A chunk-extension name is complete.
    ChunkExtensionNameComplete,
    /// A chunk-extension value is complete (possibly empty).
    ChunkExtensionValueComplete,
}

impl Signal {
    /// The error code surfaced when a handler rejects this signal.
    pub(crate) fn cb_error(self) -> ErrorCode {
        match self {
            Signal::MessageBegin => ErrorCode::CbMessageBegin,
            Signal::MessageComplete => ErrorCode::CbMessageComplete,
            Signal::Reset => ErrorCode::CbReset,
            Signal::UrlComplete => ErrorCode::CbUrlComplete,
            Signal::MethodComplete => ErrorCode::CbMethodComplete,
            Signal::ProtocolComplete => ErrorCode::CbProtocolComplete,
            Signal::VersionComplete => ErrorCode::CbVersionComplete,
            Signal::StatusComplete => ErrorCode::CbStatusComplete,
            Signal::HeaderFieldComplete => ErrorCode::CbHeaderFieldComplete,
            Signal::HeaderValueComplete => ErrorCode::CbHeaderValueComplete,
            Signal::ChunkHeader => ErrorCode::CbChunkHeader,
            Signal::ChunkComplete => ErrorCode::CbChunkComplete,
            Signal::ChunkExtensionNameComplete => ErrorCode::CbChunkExtensionNameComplete,
            Signal::ChunkExtensionValueComplete => ErrorCode::CbChunkExtensionValueComplete,
        }
    }
}

/// Classification of a payload fragment.
///
/// Consecutive fragments of the same kind belong to the same logical
/// field until the matching `*Complete` signal fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PayloadKind {
    /// Request method bytes.
    Method,
    /// Request target bytes.
    Url,
    /// Protocol name bytes (`HTTP`).
    Protocol,
    /// Version bytes (`1.1`).
    Version,
    /// Response reason-phrase bytes.
    Status,
    /// Header (or trailer) field name bytes.
    HeaderField,
    /// Header (or trailer) field value bytes.
    HeaderValue,
    /// Body bytes (identity or chunk data).
    Body,
    /// Chunk-extension name bytes.
    ChunkExtensionName,
    /// Chunk-extension value bytes.
    ChunkExtensionValue,
}

impl PayloadKind {
    /// The error code surfaced when a handler rejects a fragment of this
    /// kind. `Body` has no completion signal and maps to `HPE_USER`.
    pub(crate) fn cb_error(self) -> Option<ErrorCode> {
        match self {
            PayloadKind::Method => Some(ErrorCode::CbMethodComplete),
            PayloadKind::Url => Some(ErrorCode::CbUrlComplete),
            PayloadKind::Protocol => Some(ErrorCode::CbProtocolComplete),
            PayloadKind::Version => Some(ErrorCode::CbVersionComplete),
            PayloadKind::Status => Some(ErrorCode::CbStatusComplete),
            PayloadKind::HeaderField => Some(ErrorCode::CbHeaderFieldComplete),
            PayloadKind::HeaderValue => Some(ErrorCode::CbHeaderValueComplete),
            PayloadKind::Body => None,
            PayloadKind::ChunkExtensionName => Some(ErrorCode::CbChunkExtensionNameComplete),
            PayloadKind::ChunkExtensionValue => Some(ErrorCode::CbChunkExtensionValueComplete),
        }
    }
}

/// What a signal handler asks the parser to do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SignalAction {
    /// Keep parsing.
    #[default]
    Proceed,
    /// Suspend parsing. `parse` returns `HPE_PAUSED` until
    /// [`Parser::resume`](crate::Parser::resume) is called; the bytes
    /// already consumed include the event that paused.
    Pause,
    /// Abort parsing with the signal's `HPE_CB_*` error.
    Error,
}

/// What a payload handler asks the parser to do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PayloadAction {
    /// Keep parsing.
    #[default]
    Proceed,
    /// Abort parsing with the payload slot's `HPE_CB_*` error.
    Error,
    /// Abort parsing with `HPE_USER`.
    UserError,
}

/// What the headers-complete handler asks the parser to do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HeadersAction {
    /// Frame the body from the parsed headers.
    #[default]
    Proceed,
    /// Abort parsing with `HPE_CB_HEADERS_COMPLETE`.
    Error,
    /// Treat the message as bodyless regardless of framing headers and
    /// continue with the next message. Meant for responses to HEAD and
    /// for pipelined bodyless requests.
    AssumeNoBody,
    /// As [`HeadersAction::AssumeNoBody`], and additionally surface
    /// `HPE_PAUSED_UPGRADE` after message-complete so the caller can
    /// hand the remaining bytes to another protocol.
    AssumeNoBodyAndPauseUpgrade,
}

/// Receiver for parse events.
///
/// All methods default to proceeding, so an implementation only overrides
/// the events it cares about. The handler is passed `&mut` to every
/// `parse`/`finish` call rather than being stored inside the parser,
/// which keeps ownership acyclic when a handler also owns downstream
/// state (a message builder, a metrics sink).
pub trait Handler {
    /// A grammar boundary was crossed.
    fn on_signal(&mut self, _signal: Signal) -> SignalAction {
        SignalAction::Proceed
    }

    /// A payload fragment was extracted. `bytes` is only valid for the
    /// duration of this call.
    fn on_payload(&mut self, _kind: PayloadKind, _bytes: &[u8]) -> PayloadAction {
        PayloadAction::Proceed
    }

    /// The header section is complete. `state` is a snapshot of the
    /// parser's observable state, taken after body framing was decided.
    fn on_headers_complete(&mut self, _state: &ParserState) -> HeadersAction {
        HeadersAction::Proceed
    }
}

type SignalFn<'h> = Box<dyn FnMut(Signal) -> SignalAction + 'h>;
type PayloadFn<'h> = Box<dyn FnMut(PayloadKind, &[u8]) -> PayloadAction + 'h>;
type HeadersFn<'h> = Box<dyn FnMut(&ParserState) -> HeadersAction + 'h>;

/// A closure-based [`Handler`]: the callback table of the facade.
///
/// Unset slots default to proceeding.
///
/// ```
/// use h1parse::{Callbacks, Mode, Parser, Signal, SignalAction};
///
/// let mut signals = Vec::new();
/// let mut callbacks = Callbacks::new().on_signal(|signal| {
///     signals.push(signal);
///     SignalAction::Proceed
/// });
///
/// let mut parser = Parser::new(Mode::Request);
/// parser.parse(&mut callbacks, b"GET / HTTP/1.1\r\n\r\n").unwrap();
/// drop(callbacks);
/// assert_eq!(signals.first(), Some(&Signal::MessageBegin));
/// assert_eq!(signals.last(), Some(&Signal::MessageComplete));
/// ```
#[derive(Default)]
pub struct Callbacks<'h> {
    signal: Option<SignalFn<'h>>,
    payload: Option<PayloadFn<'h>>,
    headers_complete: Option<HeadersFn<'h>>,
}

impl<'h> Callbacks<'h> {
    /// An empty table: every event proceeds.
    pub fn new() -> Self {
        Self::default()
    }

    /// Install the signal slot.
    pub fn on_signal(mut self, f: impl FnMut(Signal) -> SignalAction + 'h) -> Self {
        self.signal = Some(Box::new(f));
        self
    }

    /// Install the payload slot.
    pub fn on_payload(mut self, f: impl FnMut(PayloadKind, &[u8]) -> PayloadAction + 'h) -> Self {
        self.payload = Some(Box::new(f));
        self
    }

    /// Install the headers-complete slot.
    pub fn on_headers_complete(mut self, f: impl FnMut(&ParserState) -> HeadersAction + 'h) -> Self {
        self.headers_complete = Some(Box::new(f));
        self
    }
}

impl Handler for Callbacks<'_> {
    fn on_signal(&mut self, signal: Signal) -> SignalAction {
        match &mut self.signal {
            Some(f) => f(signal),
            None => SignalAction::Proceed,
        }
    }

    fn on_payload(&mut self, kind: PayloadKind, bytes: &[u8]) -> PayloadAction {
        match &mut self.payload {
            Some(f) => f(kind, bytes),
            None => PayloadAction::Proceed,
        }
    }

    fn on_headers_complete(&mut self, state: &ParserState) -> HeadersAction {
        match &mut self.headers_complete {
            Some(f) => f(state),
            None => HeadersAction::Proceed,
        }
    }
}
