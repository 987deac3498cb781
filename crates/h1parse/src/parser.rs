//! The parser facade.
//!
//! [`Parser`] owns the automaton registers and exposes the public
//! operations: feed bytes, finish at end-of-stream, pause and resume,
//! reset, and snapshot the observable state. It holds no I/O and no
//! buffers; payload fragments borrow from the slice passed to
//! [`Parser::parse`].

use crate::error::{Error, ErrorCode};
use crate::event::Handler;
use crate::lenient::LenientFlags;
use crate::machine::{self, State};
use crate::method::Method;

/// What kind of traffic the parser expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Parse requests only.
    Request,
    /// Parse responses only.
    Response,
    /// Detect request vs response from the first bytes of each message.
    #[default]
    Auto,
}

/// Which interesting header the current field resolved to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) enum HeaderKind {
    #[default]
    General,
    ContentLength,
    /// Content-Length value after trailing whitespace began; digits are
    /// no longer legal.
    ContentLengthWs,
    TransferEncoding,
    Connection,
    Upgrade,
}

/// Small fixed scratch buffer for cross-fragment token matching
/// (method tokens, interesting header names, connection option tokens).
/// Overflow simply disables matching; nothing user-visible is lost
/// because payload fragments are emitted independently.
#[derive(Debug, Clone)]
pub(crate) struct Scratch {
    buf: [u8; 32],
    len: u8,
    overflowed: bool,
}

impl Scratch {
    fn new() -> Self {
        Self {
            buf: [0; 32],
            len: 0,
            overflowed: false,
        }
    }

    pub(crate) fn clear(&mut self) {
        self.len = 0;
        self.overflowed = false;
    }

    pub(crate) fn push(&mut self, byte: u8) {
        if (self.len as usize) < self.buf.len() {
            self.buf[self.len as usize] = byte;
            self.len += 1;
        } else {
            self.overflowed = true;
        }
    }

    pub(crate) fn as_slice(&self) -> &[u8] {
        &self.buf[..self.len as usize]
    }

    pub(crate) fn overflowed(&self) -> bool {
        self.overflowed
    }

    /// Case-insensitive comparison against an all-lowercase token.
    pub(crate) fn eq_token(&self, token: &[u8]) -> bool {
        !self.overflowed && self.as_slice().eq_ignore_ascii_case(token)
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.len == 0 && !self.overflowed
    }
}

/// Read-only snapshot of the parser's observable state.
///
/// Handed to the headers-complete callback and returned by
/// [`Parser::state`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParserState {
    /// The resolved mode: [`Mode::Auto`] until the first bytes of the
    /// current message disambiguate.
    pub mode: Mode,
    /// HTTP major version, 0 until parsed.
    pub http_major: u8,
    /// HTTP minor version, 0 until parsed.
    pub http_minor: u8,
    /// The request method; `None` for responses and until parsed.
    pub method: Option<Method>,
    /// The response status code; 0 for requests and until parsed.
    pub status_code: u16,
    /// True when the current message upgrades the connection
    /// (CONNECT, `Upgrade` + `Connection: upgrade`, or a 101 response).
    pub upgrade: bool,
    /// Declared `Content-Length`, or the current chunk size while a
    /// chunked body is being parsed. 0 until parsed.
    pub content_length: u64,
    /// Whether the connection can carry another message after this one.
    pub should_keep_alive: bool,
    /// True when the body is terminated by connection close rather than
    /// length or chunking.
    pub message_needs_eof: bool,
}

impl ParserState {
    /// Canonical reason phrase for [`status_code`](Self::status_code),
    /// if the code is assigned one.
    pub fn status_name(&self) -> Option<&'static str> {
        http::StatusCode::from_u16(self.status_code)
            .ok()
            .and_then(|s| s.canonical_reason())
    }
}

/// Incremental, event-driven HTTP/1.x parser.
///
/// A single instance parses many pipelined messages; an implicit reset
/// runs between messages and [`Parser::reset`] restarts from scratch.
/// The instance must be driven from one thread at a time, and handlers
/// must not re-enter their own parser.
pub struct Parser {
    mode: Mode,
    lenient: LenientFlags,
    latched: Option<Error>,

    pub(crate) state: State,
    /// Mode of the current message; `Auto` until disambiguated.
    pub(crate) resolved: Mode,

    pub(crate) http_major: u8,
    pub(crate) http_minor: u8,
    pub(crate) method: Option<Method>,
    pub(crate) status_code: u16,
    /// Declared content length, then the chunk-size register while a
    /// chunked body is in progress.
    pub(crate) content_length: u64,
    pub(crate) content_length_seen: bool,

    pub(crate) chunked: bool,
    pub(crate) te_seen: bool,
    pub(crate) conn_close: bool,
    pub(crate) conn_keep_alive: bool,
    pub(crate) conn_upgrade: bool,
    pub(crate) upgrade_header: bool,
    pub(crate) upgrade: bool,
    pub(crate) skip_body: bool,
    pub(crate) in_trailers: bool,
    pub(crate) message_needs_eof: bool,

    pub(crate) bytes_parsed: u64,

    pub(crate) scratch: Scratch,
    pub(crate) header_kind: HeaderKind,
    /// Progress through a fixed literal (`HTTP/`), or the status-code
    /// digit count. Only one use is live at a time.
    pub(crate) literal_pos: u8,
}

impl Parser {
    /// Create a parser for the given traffic kind.
    pub fn new(mode: Mode) -> Self {
        Self {
            mode,
            lenient: LenientFlags::empty(),
            latched: None,
            state: State::Start,
            resolved: mode,
            http_major: 0,
            http_minor: 0,
            method: None,
            status_code: 0,
            content_length: 0,
            content_length_seen: false,
            chunked: false,
            te_seen: false,
            conn_close: false,
            conn_keep_alive: false,
            conn_upgrade: false,
            upgrade_header: false,
            upgrade: false,
            skip_body: false,
            in_trailers: false,
            message_needs_eof: false,
            bytes_parsed: 0,
            scratch: Scratch::new(),
            header_kind: HeaderKind::General,
            literal_pos: 0,
        }
    }

    /// Apply a lenient-flag set atomically, replacing the previous set.
    pub fn set_lenient(&mut self, flags: LenientFlags) {
        self.lenient = flags;
    }

    /// The current lenient-flag set.
    pub fn lenient(&self) -> LenientFlags {
        self.lenient
    }

    /// Feed a fragment of the byte stream, invoking handler callbacks
    /// synchronously as events are extracted.
    ///
    /// Returns the number of bytes consumed, which is `data.len()`
    /// unless parsing suspended or failed partway. Errors latch: every
    /// subsequent call returns the same error until the suspension is
    /// resumed or the parser is [`reset`](Self::reset). An empty slice
    /// is a valid no-op feed.
    pub fn parse<H: Handler>(&mut self, handler: &mut H, data: &[u8]) -> Result<usize, Error> {
        if let Some(err) = &self.latched {
            return Err(err.clone());
        }
        machine::run(self, handler, data).inspect_err(|err| {
            self.latched = Some(err.clone());
        })
    }

    /// Declare end-of-stream.
    ///
    /// Commits a read-until-close body (emitting message-complete) and
    /// succeeds between messages; fails with `HPE_INVALID_EOF_STATE`
    /// anywhere the grammar still requires input.
    pub fn finish<H: Handler>(&mut self, handler: &mut H) -> Result<(), Error> {
        if let Some(err) = &self.latched {
            return Err(err.clone());
        }
        machine::finish(self, handler).inspect_err(|err| {
            self.latched = Some(err.clone());
        })
    }

    /// Suspend parsing. Subsequent [`parse`](Self::parse) calls return
    /// `HPE_PAUSED` until [`resume`](Self::resume).
    pub fn pause(&mut self) {
        if self.latched.is_none() {
            self.latched = Some(Error::new(ErrorCode::Paused));
        }
    }

    /// Clear an `HPE_PAUSED` suspension. Other latched errors are left
    /// in place.
    pub fn resume(&mut self) {
        if matches!(&self.latched, Some(e) if e.code == ErrorCode::Paused) {
            self.latched = None;
        }
    }

    /// Clear an `HPE_PAUSED_UPGRADE` suspension, resuming HTTP parsing
    /// after a refused or completed upgrade.
    pub fn resume_after_upgrade(&mut self) {
        if matches!(&self.latched, Some(e) if e.code == ErrorCode::PausedUpgrade) {
            self.latched = None;
        }
    }

    /// Return to the initial state, preserving the mode and the lenient
    /// flags. Clears any latched error.
    pub fn reset(&mut self) {
        let mode = self.mode;
        let lenient = self.lenient;
        *self = Parser::new(mode);
        self.lenient = lenient;
    }

    /// The error currently latched, if any.
    pub fn last_error(&self) -> Option<&Error> {
        self.latched.as_ref()
    }

    /// Total bytes consumed since construction or the last
    /// [`reset`](Self::reset). After a pause this tells the caller where
    /// the unconsumed remainder starts.
    pub fn bytes_parsed(&self) -> u64 {
        self.bytes_parsed
    }

    /// Snapshot the observable state.
    pub fn state(&self) -> ParserState {
        ParserState {
            mode: self.resolved,
            http_major: self.http_major,
            http_minor: self.http_minor,
            method: self.method,
            status_code: self.status_code,
            upgrade: self.upgrade,
            content_length: self.content_length,
            should_keep_alive: self.should_keep_alive(),
            message_needs_eof: self.message_needs_eof,
        }
    }

    /// Whether the stream can carry another message after the current
    /// one (RFC 7230 §6.3 defaults plus the parsed `Connection`
    /// options).
    pub(crate) fn should_keep_alive(&self) -> bool {
        let keep = if self.http_major > 0 && self.http_minor > 0 {
            // HTTP/1.1+: persistent unless explicitly closed
            !self.conn_close
        } else {
            self.conn_keep_alive
        };
        keep && !self.message_needs_eof
    }

    /// Clear per-message registers between pipelined messages. Lifetime
    /// state (mode, lenient flags, byte counter) survives.
    pub(crate) fn reset_message(&mut self) {
        self.resolved = self.mode;
        self.http_major = 0;
        self.http_minor = 0;
        self.method = None;
        self.status_code = 0;
        self.content_length = 0;
        self.content_length_seen = false;
        self.chunked = false;
        self.te_seen = false;
        self.conn_close = false;
        self.conn_keep_alive = false;
        self.conn_upgrade = false;
        self.upgrade_header = false;
        self.upgrade = false;
        self.skip_body = false;
        self.in_trailers = false;
        self.message_needs_eof = false;
        self.scratch.clear();
        self.header_kind = HeaderKind::General;
        self.literal_pos = 0;
    }
}

impl std::fmt::Debug for Parser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Parser")
            .field("mode", &self.mode)
            .field("state", &self.state)
            .field("lenient", &self.lenient)
            .field("latched", &self.latched)
            .field("bytes_parsed", &self.bytes_parsed)
            .finish_non_exhaustive()
    }
}
