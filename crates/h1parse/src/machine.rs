//! The HTTP/1.x protocol automaton.
//!
//! A byte-driven state machine over the grammar of RFC 7230 request and
//! status lines, header sections, and the three body framings
//! (Content-Length, chunked, read-until-close). The machine consumes a
//! caller-provided slice, emits signals and payload fragments through a
//! [`Handler`], and retains nothing except fixed-size registers — the
//! current state, the content-length/chunk-size counter, and a small
//! scratch buffer for tokens that must be matched across fragment
//! boundaries.
//!
//! Structural bytes are handled one at a time; payload runs (target,
//! header values, body and chunk data) are consumed as whole regions so
//! large bodies cost one callback per feed, not one per byte.

use crate::error::{Error, ErrorCode};
use crate::event::{Handler, HeadersAction, PayloadAction, PayloadKind, Signal, SignalAction};
use crate::lenient::LenientFlags;
use crate::method::Method;
use crate::parser::{HeaderKind, Mode, Parser};
use crate::trace_warn;

/// Fine-grained automaton states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum State {
    /// Between messages; blank CRLF lines are skipped here.
    Start,
    /// Auto mode: matching the `HTTP/` literal to tell a status line
    /// from a request line. `literal_pos` tracks progress.
    ReqOrRes,
    /// Inside the request method token.
    Method,
    /// Spaces between method and target.
    BeforeUrl,
    /// Inside the request target.
    Url,
    /// Matching `HTTP/` after the target.
    ReqHttp,
    ReqVersionMajor,
    ReqVersionDot,
    ReqVersionMinor,
    /// Expect the request-line CR.
    ReqLineEnd,
    ReqLineAlmostDone,
    /// Matching `HTTP/` at the start of a status line.
    ResHttp,
    ResVersionMajor,
    ResVersionDot,
    ResVersionMinor,
    /// Expect the space before the status code.
    ResAfterVersion,
    /// Inside the three status digits; `literal_pos` counts them.
    ResStatusCode,
    /// Expect the space before the reason phrase, or the line end.
    ResAfterStatusCode,
    /// Inside the reason phrase.
    ResReason,
    ResLineAlmostDone,
    /// At the start of a header (or trailer) line.
    HeaderFieldStart,
    HeaderField,
    /// Skipping optional whitespace before the value.
    HeaderValueStart,
    HeaderValue,
    HeaderValueAlmostDone,
    /// Final CR of the header section seen; expect LF.
    HeadersAlmostDone,
    /// Fixed-length body; `content_length` counts down.
    BodyIdentity,
    /// Read-until-close body; only `finish()` ends it.
    BodyIdentityEof,
    /// First hex digit of a chunk size.
    ChunkSizeStart,
    ChunkSize,
    /// Tolerated spaces after the chunk size (lenient).
    ChunkSizeSpaces,
    /// After `;`, expecting an extension name.
    ChunkExtStart,
    ChunkExtName,
    ChunkExtValueStart,
    ChunkExtValue,
    ChunkExtQuotedValue,
    /// After the closing quote of an extension value.
    ChunkExtQuoteDone,
    /// CR of the chunk-size line seen; expect LF.
    ChunkSizeAlmostDone,
    ChunkData,
    /// Expect the CR after chunk data.
    ChunkDataCr,
    /// Expect the LF after chunk data.
    ChunkDataLf,
    /// The terminating zero-length chunk completed; message-complete is
    /// pending and fires without consuming input.
    ZeroChunkDone,
    /// Message complete; the next byte decides keep-alive vs closed.
    MessageDone,
    /// No further messages are possible on this stream.
    Closed,
}

const HTTP_LITERAL: &[u8; 5] = b"HTTP/";

/// RFC 7230 `tchar`.
fn is_token(b: u8) -> bool {
    b.is_ascii_alphanumeric()
        || matches!(
            b,
            b'!' | b'#'
                | b'$'
                | b'%'
                | b'&'
                | b'\''
                | b'*'
                | b'+'
                | b'-'
                | b'.'
                | b'^'
                | b'_'
                | b'`'
                | b'|'
                | b'~'
        )
}

fn is_method_char(b: u8) -> bool {
    b.is_ascii_uppercase() || b == b'-'
}

/// Anything visible, plus obs-text. Excludes SP, CTLs, and DEL.
fn is_url_char(b: u8) -> bool {
    b > 0x20 && b != 0x7F
}

/// Header values and reason phrases: HT, SP, visible, obs-text.
fn is_value_char(b: u8) -> bool {
    b == b'\t' || (b >= 0x20 && b != 0x7F)
}

fn hex_digit(b: u8) -> Option<u64> {
    match b {
        b'0'..=b'9' => Some((b - b'0') as u64),
        b'a'..=b'f' => Some((b - b'a' + 10) as u64),
        b'A'..=b'F' => Some((b - b'A' + 10) as u64),
        _ => None,
    }
}

fn invalid_method() -> Error {
    Error::with_reason(ErrorCode::InvalidMethod, "Invalid method encountered")
}

fn invalid_version() -> Error {
    Error::with_reason(ErrorCode::InvalidVersion, "Invalid HTTP version")
}

fn invalid_chunk(reason: &'static str) -> Error {
    Error::with_reason(ErrorCode::InvalidChunkSize, reason)
}

fn lf_expected(reason: &'static str) -> Error {
    Error::with_reason(ErrorCode::LfExpected, reason)
}

/// Deliver a signal, translating the handler's verdict.
fn signal<H: Handler>(h: &mut H, s: Signal) -> Result<(), Error> {
    match h.on_signal(s) {
        SignalAction::Proceed => Ok(()),
        SignalAction::Pause => Err(Error::new(ErrorCode::Paused)),
        SignalAction::Error => Err(Error::new(s.cb_error())),
    }
}

/// Deliver a payload fragment, translating the handler's verdict.
/// Empty fragments are suppressed.
fn payload<H: Handler>(h: &mut H, kind: PayloadKind, bytes: &[u8]) -> Result<(), Error> {
    if bytes.is_empty() {
        return Ok(());
    }
    match h.on_payload(kind, bytes) {
        PayloadAction::Proceed => Ok(()),
        PayloadAction::Error => Err(match kind.cb_error() {
            Some(code) => Error::new(code),
            None => Error::with_reason(ErrorCode::User, "Span callback error in body handler"),
        }),
        PayloadAction::UserError => Err(Error::new(ErrorCode::User)),
    }
}

/// Drive the automaton over `data`. Returns the number of bytes
/// consumed; the lifetime byte counter is updated even on error.
pub(crate) fn run<H: Handler>(p: &mut Parser, h: &mut H, data: &[u8]) -> Result<usize, Error> {
    let mut pos = 0usize;
    let result = run_inner(p, h, data, &mut pos);
    p.bytes_parsed += pos as u64;
    result.map(|()| pos)
}

/// Declare end-of-stream. Legal between messages and inside a
/// read-until-close body (which it commits).
pub(crate) fn finish<H: Handler>(p: &mut Parser, h: &mut H) -> Result<(), Error> {
    match p.state {
        State::Start | State::MessageDone | State::Closed => Ok(()),
        State::BodyIdentityEof | State::ZeroChunkDone => message_done(p, h),
        _ => Err(Error::with_reason(
            ErrorCode::InvalidEofState,
            "Invalid EOF state",
        )),
    }
}

fn run_inner<H: Handler>(
    p: &mut Parser,
    h: &mut H,
    data: &[u8],
    pos: &mut usize,
) -> Result<(), Error> {
    loop {
        // A completed zero-length chunk leaves message-complete pending;
        // deliver it before touching (or requiring) input, so even an
        // empty feed after a pause taken at chunk-complete makes
        // progress.
        if p.state == State::ZeroChunkDone {
            message_done(p, h)?;
            continue;
        }
        if *pos >= data.len() {
            break;
        }
        let byte = data[*pos];
        match p.state {
            // Handled above without consuming input.
            State::ZeroChunkDone => {}

            State::Start => match byte {
                b'\r' | b'\n' => *pos += 1,
                _ => {
                    p.state = match p.resolved {
                        Mode::Request => {
                            p.scratch.clear();
                            State::Method
                        }
                        Mode::Response => {
                            p.literal_pos = 0;
                            State::ResHttp
                        }
                        Mode::Auto => {
                            p.literal_pos = 0;
                            State::ReqOrRes
                        }
                    };
                    signal(h, Signal::MessageBegin)?;
                }
            },

            State::ReqOrRes => {
                if byte == HTTP_LITERAL[p.literal_pos as usize] {
                    p.literal_pos += 1;
                    *pos += 1;
                    if p.literal_pos as usize == HTTP_LITERAL.len() {
                        p.resolved = Mode::Response;
                        p.state = State::ResVersionMajor;
                        payload(h, PayloadKind::Protocol, b"HTTP")?;
                        signal(h, Signal::ProtocolComplete)?;
                    }
                } else {
                    // A request whose method starts with the matched
                    // prefix; replay that prefix from the literal.
                    let matched = p.literal_pos as usize;
                    p.resolved = Mode::Request;
                    p.state = State::Method;
                    p.literal_pos = 0;
                    p.scratch.clear();
                    for &b in &HTTP_LITERAL[..matched] {
                        p.scratch.push(b);
                    }
                    payload(h, PayloadKind::Method, &HTTP_LITERAL[..matched])?;
                }
            }

            State::Method => {
                let start = *pos;
                while *pos < data.len() && is_method_char(data[*pos]) {
                    p.scratch.push(data[*pos]);
                    *pos += 1;
                }
                payload(h, PayloadKind::Method, &data[start..*pos])?;
                if *pos >= data.len() {
                    continue;
                }
                match data[*pos] {
                    b' ' => {
                        if p.scratch.overflowed() {
                            return Err(invalid_method());
                        }
                        let method =
                            Method::from_token(p.scratch.as_slice()).ok_or_else(invalid_method)?;
                        p.method = Some(method);
                        p.scratch.clear();
                        p.state = State::BeforeUrl;
                        *pos += 1;
                        signal(h, Signal::MethodComplete)?;
                    }
                    _ => return Err(invalid_method()),
                }
            }

            State::BeforeUrl => match byte {
                b' ' => *pos += 1,
                b if is_url_char(b) => p.state = State::Url,
                _ => {
                    return Err(Error::with_reason(
                        ErrorCode::InvalidUrl,
                        "Invalid characters in url",
                    ))
                }
            },

            State::Url => {
                let start = *pos;
                while *pos < data.len() && is_url_char(data[*pos]) {
                    *pos += 1;
                }
                payload(h, PayloadKind::Url, &data[start..*pos])?;
                if *pos >= data.len() {
                    continue;
                }
                match data[*pos] {
                    b' ' => {
                        p.state = State::ReqHttp;
                        p.literal_pos = 0;
                        *pos += 1;
                        signal(h, Signal::UrlComplete)?;
                    }
                    b'\r' | b'\n' => {
                        return Err(Error::with_reason(
                            ErrorCode::InvalidVersion,
                            "Expected HTTP version",
                        ))
                    }
                    _ => {
                        return Err(Error::with_reason(
                            ErrorCode::InvalidUrl,
                            "Invalid characters in url",
                        ))
                    }
                }
            }

            State::ReqHttp | State::ResHttp => {
                if byte == HTTP_LITERAL[p.literal_pos as usize] {
                    p.literal_pos += 1;
                    *pos += 1;
                    if p.literal_pos as usize == HTTP_LITERAL.len() {
                        p.state = if p.state == State::ReqHttp {
                            State::ReqVersionMajor
                        } else {
                            State::ResVersionMajor
                        };
                        payload(h, PayloadKind::Protocol, b"HTTP")?;
                        signal(h, Signal::ProtocolComplete)?;
                    }
                } else {
                    return Err(Error::with_reason(
                        ErrorCode::InvalidConstant,
                        "Expected HTTP/",
                    ));
                }
            }

            State::ReqVersionMajor | State::ResVersionMajor => match byte {
                b'0'..=b'9' => {
                    p.http_major = byte - b'0';
                    p.state = if p.state == State::ReqVersionMajor {
                        State::ReqVersionDot
                    } else {
                        State::ResVersionDot
                    };
                    let start = *pos;
                    *pos += 1;
                    payload(h, PayloadKind::Version, &data[start..*pos])?;
                }
                _ => return Err(invalid_version()),
            },

            State::ReqVersionDot | State::ResVersionDot => match byte {
                b'.' => {
                    p.state = if p.state == State::ReqVersionDot {
                        State::ReqVersionMinor
                    } else {
                        State::ResVersionMinor
                    };
                    let start = *pos;
                    *pos += 1;
                    payload(h, PayloadKind::Version, &data[start..*pos])?;
                }
                _ => return Err(invalid_version()),
            },

            State::ReqVersionMinor | State::ResVersionMinor => match byte {
                b'0'..=b'9' => {
                    p.http_minor = byte - b'0';
                    if !p.lenient().contains(LenientFlags::VERSION)
                        && !matches!((p.http_major, p.http_minor), (0, 9) | (1, 0) | (1, 1) | (2, 0))
                    {
                        return Err(invalid_version());
                    }
                    p.state = if p.state == State::ReqVersionMinor {
                        State::ReqLineEnd
                    } else {
                        State::ResAfterVersion
                    };
                    let start = *pos;
                    *pos += 1;
                    payload(h, PayloadKind::Version, &data[start..*pos])?;
                    signal(h, Signal::VersionComplete)?;
                }
                _ => return Err(invalid_version()),
            },

            State::ReqLineEnd => match byte {
                b'\r' => {
                    *pos += 1;
                    p.state = State::ReqLineAlmostDone;
                }
                b'\n' if p.lenient().contains(LenientFlags::OPTIONAL_CR_BEFORE_LF) => {
                    *pos += 1;
                    p.state = State::HeaderFieldStart;
                }
                _ => return Err(invalid_version()),
            },

            State::ReqLineAlmostDone | State::ResLineAlmostDone | State::HeaderValueAlmostDone => {
                match byte {
                    b'\n' => {
                        *pos += 1;
                        p.state = State::HeaderFieldStart;
                    }
                    _ if p.lenient().contains(LenientFlags::OPTIONAL_LF_AFTER_CR) => {
                        // Bare CR accepted as terminator; reprocess the byte.
                        p.state = State::HeaderFieldStart;
                    }
                    _ => return Err(lf_expected("Expected LF after CR")),
                }
            }

            State::ResAfterVersion => match byte {
                b' ' => {
                    *pos += 1;
                    p.literal_pos = 0;
                    p.state = State::ResStatusCode;
                }
                _ => return Err(invalid_version()),
            },

            State::ResStatusCode => match byte {
                b'0'..=b'9' => {
                    if p.literal_pos >= 3 {
                        return Err(Error::with_reason(
                            ErrorCode::InvalidStatus,
                            "Invalid status code",
                        ));
                    }
                    p.status_code = p.status_code * 10 + (byte - b'0') as u16;
                    p.literal_pos += 1;
                    *pos += 1;
                    if p.literal_pos == 3 && p.status_code < 100 {
                        return Err(Error::with_reason(
                            ErrorCode::InvalidStatus,
                            "Invalid status code",
                        ));
                    }
                }
                _ if p.literal_pos == 3 => p.state = State::ResAfterStatusCode,
                _ => {
                    return Err(Error::with_reason(
                        ErrorCode::InvalidStatus,
                        "Invalid status code",
                    ))
                }
            },

            State::ResAfterStatusCode => match byte {
                b' ' => {
                    *pos += 1;
                    p.state = State::ResReason;
                }
                b'\r' => {
                    *pos += 1;
                    p.state = State::ResLineAlmostDone;
                    signal(h, Signal::StatusComplete)?;
                }
                b'\n' if p.lenient().contains(LenientFlags::OPTIONAL_CR_BEFORE_LF) => {
                    *pos += 1;
                    p.state = State::HeaderFieldStart;
                    signal(h, Signal::StatusComplete)?;
                }
                _ => {
                    return Err(Error::with_reason(
                        ErrorCode::InvalidStatus,
                        "Invalid status code",
                    ))
                }
            },

            State::ResReason => {
                let start = *pos;
                while *pos < data.len() && is_value_char(data[*pos]) {
                    *pos += 1;
                }
                payload(h, PayloadKind::Status, &data[start..*pos])?;
                if *pos >= data.len() {
                    continue;
                }
                match data[*pos] {
                    b'\r' => {
                        *pos += 1;
                        p.state = State::ResLineAlmostDone;
                        signal(h, Signal::StatusComplete)?;
                    }
                    b'\n' if p.lenient().contains(LenientFlags::OPTIONAL_CR_BEFORE_LF) => {
                        *pos += 1;
                        p.state = State::HeaderFieldStart;
                        signal(h, Signal::StatusComplete)?;
                    }
                    _ => {
                        return Err(Error::with_reason(
                            ErrorCode::InvalidStatus,
                            "Invalid response status",
                        ))
                    }
                }
            }

            State::HeaderFieldStart => match byte {
                b'\r' => {
                    *pos += 1;
                    p.state = State::HeadersAlmostDone;
                }
                b'\n' if p.lenient().contains(LenientFlags::OPTIONAL_CR_BEFORE_LF) => {
                    p.state = State::HeadersAlmostDone;
                }
                b':' if p.lenient().contains(LenientFlags::HEADERS) => {
                    // Empty field name tolerated; the pair survives to
                    // the events and is dropped by consumers.
                    *pos += 1;
                    p.header_kind = HeaderKind::General;
                    p.scratch.clear();
                    p.literal_pos = 0;
                    p.state = State::HeaderValueStart;
                    signal(h, Signal::HeaderFieldComplete)?;
                }
                b if is_token(b) => {
                    p.scratch.clear();
                    p.header_kind = HeaderKind::General;
                    p.state = State::HeaderField;
                }
                _ => {
                    return Err(Error::with_reason(
                        ErrorCode::InvalidHeaderToken,
                        "Invalid header token",
                    ))
                }
            },

            State::HeaderField => {
                let start = *pos;
                while *pos < data.len() && is_token(data[*pos]) {
                    p.scratch.push(data[*pos]);
                    *pos += 1;
                }
                payload(h, PayloadKind::HeaderField, &data[start..*pos])?;
                if *pos >= data.len() {
                    continue;
                }
                match data[*pos] {
                    b':' => {
                        // Trailer fields never affect framing.
                        p.header_kind = if p.in_trailers {
                            HeaderKind::General
                        } else if p.scratch.eq_token(b"content-length") {
                            HeaderKind::ContentLength
                        } else if p.scratch.eq_token(b"transfer-encoding") {
                            HeaderKind::TransferEncoding
                        } else if p.scratch.eq_token(b"connection") {
                            HeaderKind::Connection
                        } else if p.scratch.eq_token(b"upgrade") {
                            p.upgrade_header = true;
                            HeaderKind::Upgrade
                        } else {
                            HeaderKind::General
                        };
                        p.scratch.clear();
                        p.literal_pos = 0;
                        *pos += 1;
                        p.state = State::HeaderValueStart;
                        signal(h, Signal::HeaderFieldComplete)?;
                    }
                    _ => {
                        return Err(Error::with_reason(
                            ErrorCode::InvalidHeaderToken,
                            "Invalid header token",
                        ))
                    }
                }
            }

            State::HeaderValueStart => match byte {
                b' ' | b'\t' => *pos += 1,
                b'\r' => {
                    finalize_value(p)?;
                    *pos += 1;
                    p.state = State::HeaderValueAlmostDone;
                    signal(h, Signal::HeaderValueComplete)?;
                }
                b'\n' if p.lenient().contains(LenientFlags::OPTIONAL_CR_BEFORE_LF) => {
                    finalize_value(p)?;
                    *pos += 1;
                    p.state = State::HeaderFieldStart;
                    signal(h, Signal::HeaderValueComplete)?;
                }
                _ => {
                    if p.header_kind == HeaderKind::ContentLength && p.content_length_seen {
                        return Err(Error::with_reason(
                            ErrorCode::InvalidContentLength,
                            "Duplicate Content-Length",
                        ));
                    }
                    if p.header_kind == HeaderKind::TransferEncoding {
                        p.te_seen = true;
                    }
                    p.state = State::HeaderValue;
                }
            },

            State::HeaderValue => {
                let lenient_headers = p.lenient().contains(LenientFlags::HEADERS);
                let start = *pos;
                let mut failed = None;
                while *pos < data.len() {
                    let b = data[*pos];
                    if b == b'\r' || b == b'\n' {
                        break;
                    }
                    if !is_value_char(b) && !lenient_headers {
                        failed = Some(Error::with_reason(
                            ErrorCode::InvalidHeaderToken,
                            "Invalid header value char",
                        ));
                        break;
                    }
                    if let Err(e) = value_byte(p, b) {
                        failed = Some(e);
                        break;
                    }
                    *pos += 1;
                }
                payload(h, PayloadKind::HeaderValue, &data[start..*pos])?;
                if let Some(e) = failed {
                    return Err(e);
                }
                if *pos >= data.len() {
                    continue;
                }
                match data[*pos] {
                    b'\r' => {
                        finalize_value(p)?;
                        *pos += 1;
                        p.state = State::HeaderValueAlmostDone;
                        signal(h, Signal::HeaderValueComplete)?;
                    }
                    // b'\n' is the only other possibility
                    _ if p.lenient().contains(LenientFlags::OPTIONAL_CR_BEFORE_LF) => {
                        finalize_value(p)?;
                        *pos += 1;
                        p.state = State::HeaderFieldStart;
                        signal(h, Signal::HeaderValueComplete)?;
                    }
                    _ => {
                        return Err(Error::with_reason(
                            ErrorCode::CrExpected,
                            "Expected CR before LF",
                        ))
                    }
                }
            }

            State::HeadersAlmostDone => {
                if byte == b'\n' {
                    *pos += 1;
                } else if !p.lenient().contains(LenientFlags::OPTIONAL_LF_AFTER_CR) {
                    return Err(lf_expected("Expected LF after CR"));
                }
                if p.in_trailers {
                    p.state = State::ZeroChunkDone;
                    signal(h, Signal::ChunkComplete)?;
                } else {
                    headers_done(p, h)?;
                }
            }

            State::BodyIdentity => {
                let available = (data.len() - *pos) as u64;
                let take = p.content_length.min(available) as usize;
                let start = *pos;
                *pos += take;
                p.content_length -= take as u64;
                let done = p.content_length == 0;
                if done {
                    p.state = State::MessageDone;
                }
                payload(h, PayloadKind::Body, &data[start..*pos])?;
                if done {
                    message_done(p, h)?;
                }
            }

            State::BodyIdentityEof => {
                let start = *pos;
                *pos = data.len();
                payload(h, PayloadKind::Body, &data[start..])?;
            }

            State::ChunkSizeStart => match hex_digit(byte) {
                Some(d) => {
                    p.content_length = d;
                    *pos += 1;
                    p.state = State::ChunkSize;
                }
                None => return Err(invalid_chunk("Invalid character in chunk size")),
            },

            State::ChunkSize => match byte {
                b if hex_digit(b).is_some() => {
                    p.content_length = p
                        .content_length
                        .checked_mul(16)
                        .and_then(|v| v.checked_add(hex_digit(b).unwrap_or(0)))
                        .ok_or_else(|| invalid_chunk("Chunk size overflow"))?;
                    *pos += 1;
                }
                b';' => {
                    *pos += 1;
                    p.state = State::ChunkExtStart;
                }
                b'\r' => {
                    *pos += 1;
                    p.state = State::ChunkSizeAlmostDone;
                }
                b'\n' if p.lenient().contains(LenientFlags::OPTIONAL_CR_BEFORE_LF) => {
                    *pos += 1;
                    chunk_header(p, h)?;
                }
                b' ' | b'\t' if p.lenient().contains(LenientFlags::SPACES_AFTER_CHUNK_SIZE) => {
                    *pos += 1;
                    p.state = State::ChunkSizeSpaces;
                }
                _ => return Err(invalid_chunk("Invalid character in chunk size")),
            },

            State::ChunkSizeSpaces => match byte {
                b' ' | b'\t' => *pos += 1,
                b';' => {
                    *pos += 1;
                    p.state = State::ChunkExtStart;
                }
                b'\r' => {
                    *pos += 1;
                    p.state = State::ChunkSizeAlmostDone;
                }
                b'\n' if p.lenient().contains(LenientFlags::OPTIONAL_CR_BEFORE_LF) => {
                    *pos += 1;
                    chunk_header(p, h)?;
                }
                _ => return Err(invalid_chunk("Invalid character after chunk size")),
            },

            State::ChunkExtStart => {
                if is_token(byte) {
                    p.state = State::ChunkExtName;
                } else {
                    return Err(invalid_chunk("Invalid character in chunk extensions"));
                }
            }

            State::ChunkExtName => {
                let start = *pos;
                while *pos < data.len() && is_token(data[*pos]) {
                    *pos += 1;
                }
                payload(h, PayloadKind::ChunkExtensionName, &data[start..*pos])?;
                if *pos >= data.len() {
                    continue;
                }
                match data[*pos] {
                    b'=' => {
                        *pos += 1;
                        p.state = State::ChunkExtValueStart;
                        signal(h, Signal::ChunkExtensionNameComplete)?;
                    }
                    b';' => {
                        // Valueless extension: keep name/value pairing by
                        // completing an empty value.
                        *pos += 1;
                        p.state = State::ChunkExtStart;
                        signal(h, Signal::ChunkExtensionNameComplete)?;
                        signal(h, Signal::ChunkExtensionValueComplete)?;
                    }
                    b'\r' => {
                        *pos += 1;
                        p.state = State::ChunkSizeAlmostDone;
                        signal(h, Signal::ChunkExtensionNameComplete)?;
                        signal(h, Signal::ChunkExtensionValueComplete)?;
                    }
                    b'\n' if p.lenient().contains(LenientFlags::OPTIONAL_CR_BEFORE_LF) => {
                        *pos += 1;
                        signal(h, Signal::ChunkExtensionNameComplete)?;
                        signal(h, Signal::ChunkExtensionValueComplete)?;
                        chunk_header(p, h)?;
                    }
                    _ => return Err(invalid_chunk("Invalid character in chunk extensions")),
                }
            }

            State::ChunkExtValueStart => match byte {
                b'"' => {
                    *pos += 1;
                    p.state = State::ChunkExtQuotedValue;
                }
                b if is_token(b) => p.state = State::ChunkExtValue,
                b'\r' => {
                    *pos += 1;
                    p.state = State::ChunkSizeAlmostDone;
                    signal(h, Signal::ChunkExtensionValueComplete)?;
                }
                b';' => {
                    *pos += 1;
                    p.state = State::ChunkExtStart;
                    signal(h, Signal::ChunkExtensionValueComplete)?;
                }
                b'\n' if p.lenient().contains(LenientFlags::OPTIONAL_CR_BEFORE_LF) => {
                    *pos += 1;
                    signal(h, Signal::ChunkExtensionValueComplete)?;
                    chunk_header(p, h)?;
                }
                _ => return Err(invalid_chunk("Invalid character in chunk extensions")),
            },

            State::ChunkExtValue => {
                let start = *pos;
                while *pos < data.len() && is_token(data[*pos]) {
                    *pos += 1;
                }
                payload(h, PayloadKind::ChunkExtensionValue, &data[start..*pos])?;
                if *pos >= data.len() {
                    continue;
                }
                match data[*pos] {
                    b';' => {
                        *pos += 1;
                        p.state = State::ChunkExtStart;
                        signal(h, Signal::ChunkExtensionValueComplete)?;
                    }
                    b'\r' => {
                        *pos += 1;
                        p.state = State::ChunkSizeAlmostDone;
                        signal(h, Signal::ChunkExtensionValueComplete)?;
                    }
                    b'\n' if p.lenient().contains(LenientFlags::OPTIONAL_CR_BEFORE_LF) => {
                        *pos += 1;
                        signal(h, Signal::ChunkExtensionValueComplete)?;
                        chunk_header(p, h)?;
                    }
                    _ => return Err(invalid_chunk("Invalid character in chunk extensions")),
                }
            }

            State::ChunkExtQuotedValue => {
                let start = *pos;
                while *pos < data.len() {
                    let b = data[*pos];
                    if b == b'"' || b == b'\r' || b == b'\n' {
                        break;
                    }
                    *pos += 1;
                }
                payload(h, PayloadKind::ChunkExtensionValue, &data[start..*pos])?;
                if *pos >= data.len() {
                    continue;
                }
                match data[*pos] {
                    b'"' => {
                        *pos += 1;
                        p.state = State::ChunkExtQuoteDone;
                        signal(h, Signal::ChunkExtensionValueComplete)?;
                    }
                    _ => return Err(invalid_chunk("Invalid character in chunk extensions")),
                }
            }

            State::ChunkExtQuoteDone => match byte {
                b';' => {
                    *pos += 1;
                    p.state = State::ChunkExtStart;
                }
                b'\r' => {
                    *pos += 1;
                    p.state = State::ChunkSizeAlmostDone;
                }
                b'\n' if p.lenient().contains(LenientFlags::OPTIONAL_CR_BEFORE_LF) => {
                    *pos += 1;
                    chunk_header(p, h)?;
                }
                _ => return Err(invalid_chunk("Invalid character in chunk extensions")),
            },

            State::ChunkSizeAlmostDone => match byte {
                b'\n' => {
                    *pos += 1;
                    chunk_header(p, h)?;
                }
                _ if p.lenient().contains(LenientFlags::OPTIONAL_LF_AFTER_CR) => {
                    chunk_header(p, h)?;
                }
                _ => return Err(lf_expected("Expected LF after chunk size")),
            },

            State::ChunkData => {
                let available = (data.len() - *pos) as u64;
                let take = p.content_length.min(available) as usize;
                let start = *pos;
                *pos += take;
                p.content_length -= take as u64;
                if p.content_length == 0 {
                    p.state = State::ChunkDataCr;
                }
                payload(h, PayloadKind::Body, &data[start..*pos])?;
            }

            State::ChunkDataCr => match byte {
                b'\r' => {
                    *pos += 1;
                    p.state = State::ChunkDataLf;
                }
                b'\n' if p.lenient().contains(LenientFlags::OPTIONAL_CR_BEFORE_LF) => {
                    *pos += 1;
                    p.state = State::ChunkSizeStart;
                    signal(h, Signal::ChunkComplete)?;
                }
                b if hex_digit(b).is_some()
                    && p.lenient().contains(LenientFlags::OPTIONAL_CRLF_AFTER_CHUNK) =>
                {
                    p.state = State::ChunkSizeStart;
                    signal(h, Signal::ChunkComplete)?;
                }
                _ => {
                    return Err(Error::with_reason(
                        ErrorCode::CrExpected,
                        "Missing expected CR after chunk data",
                    ))
                }
            },

            State::ChunkDataLf => match byte {
                b'\n' => {
                    *pos += 1;
                    p.state = State::ChunkSizeStart;
                    signal(h, Signal::ChunkComplete)?;
                }
                _ if p.lenient().contains(LenientFlags::OPTIONAL_LF_AFTER_CR) => {
                    p.state = State::ChunkSizeStart;
                    signal(h, Signal::ChunkComplete)?;
                }
                _ => return Err(lf_expected("Missing expected LF after chunk data")),
            },

            State::MessageDone => {
                let keep =
                    p.should_keep_alive() || p.lenient().contains(LenientFlags::KEEP_ALIVE);
                if keep {
                    p.reset_message();
                    p.state = State::Start;
                    signal(h, Signal::Reset)?;
                } else {
                    p.state = State::Closed;
                }
            }

            State::Closed => {
                if p.lenient().contains(LenientFlags::DATA_AFTER_CLOSE) {
                    trace_warn!(
                        discarded = data.len() - *pos,
                        "data after close-terminated message"
                    );
                    *pos = data.len();
                } else {
                    return Err(Error::with_reason(
                        ErrorCode::ClosedConnection,
                        "Data after `Connection: close`",
                    ));
                }
            }
        }
    }
    Ok(())
}

/// Per-byte processing of interesting header values.
fn value_byte(p: &mut Parser, b: u8) -> Result<(), Error> {
    match p.header_kind {
        HeaderKind::ContentLength => match b {
            b'0'..=b'9' => {
                p.content_length = p
                    .content_length
                    .checked_mul(10)
                    .and_then(|v| v.checked_add((b - b'0') as u64))
                    .ok_or_else(|| {
                        Error::with_reason(ErrorCode::InvalidContentLength, "Content-Length overflow")
                    })?;
                p.literal_pos = p.literal_pos.saturating_add(1);
            }
            b' ' | b'\t' if p.literal_pos > 0 => {
                // Trailing whitespace; no further digits may follow.
                p.header_kind = HeaderKind::ContentLengthWs;
            }
            _ => {
                return Err(Error::with_reason(
                    ErrorCode::InvalidContentLength,
                    "Invalid character in Content-Length",
                ))
            }
        },
        HeaderKind::ContentLengthWs => {
            if !matches!(b, b' ' | b'\t') {
                return Err(Error::with_reason(
                    ErrorCode::InvalidContentLength,
                    "Invalid character in Content-Length",
                ));
            }
        }
        HeaderKind::TransferEncoding | HeaderKind::Connection => match b {
            b',' => flush_value_token(p),
            b' ' | b'\t' => {}
            _ => p.scratch.push(b.to_ascii_lowercase()),
        },
        HeaderKind::Upgrade | HeaderKind::General => {}
    }
    Ok(())
}

/// Close out the current header value: flush any pending option token
/// and commit Content-Length.
fn finalize_value(p: &mut Parser) -> Result<(), Error> {
    match p.header_kind {
        HeaderKind::ContentLength | HeaderKind::ContentLengthWs => {
            if p.literal_pos == 0 {
                return Err(Error::with_reason(
                    ErrorCode::InvalidContentLength,
                    "Empty Content-Length",
                ));
            }
            p.content_length_seen = true;
        }
        HeaderKind::TransferEncoding | HeaderKind::Connection => flush_value_token(p),
        HeaderKind::Upgrade | HeaderKind::General => {}
    }
    p.scratch.clear();
    p.literal_pos = 0;
    Ok(())
}

/// Match one comma-separated option token from a Connection or
/// Transfer-Encoding value.
fn flush_value_token(p: &mut Parser) {
    if p.scratch.is_empty() {
        return;
    }
    match p.header_kind {
        HeaderKind::TransferEncoding => {
            // Chunked must be the final coding; each token overwrites.
            p.chunked = p.scratch.eq_token(b"chunked");
        }
        HeaderKind::Connection => {
            if p.scratch.eq_token(b"close") {
                p.conn_close = true;
            } else if p.scratch.eq_token(b"keep-alive") {
                p.conn_keep_alive = true;
            } else if p.scratch.eq_token(b"upgrade") {
                p.conn_upgrade = true;
            }
        }
        _ => {}
    }
    p.scratch.clear();
}

/// The chunk-size line is complete: emit chunk-header and enter the
/// chunk data (or, for the zero-length chunk, the trailer section).
fn chunk_header<H: Handler>(p: &mut Parser, h: &mut H) -> Result<(), Error> {
    if p.content_length == 0 {
        p.in_trailers = true;
        p.state = State::HeaderFieldStart;
    } else {
        p.state = State::ChunkData;
    }
    signal(h, Signal::ChunkHeader)
}

/// The header section is complete: decide upgrade and body framing,
/// consult the headers-complete handler, and enter the body (or finish
/// the message).
fn headers_done<H: Handler>(p: &mut Parser, h: &mut H) -> Result<(), Error> {
    p.upgrade = match p.resolved {
        Mode::Request => {
            p.method == Some(Method::Connect) || (p.upgrade_header && p.conn_upgrade)
        }
        Mode::Response => p.status_code == 101 && p.upgrade_header,
        Mode::Auto => false,
    };

    if p.te_seen
        && p.content_length_seen
        && !p.lenient().contains(LenientFlags::CHUNKED_LENGTH)
    {
        return Err(Error::with_reason(
            ErrorCode::UnexpectedContentLength,
            "Content-Length can't be present with Transfer-Encoding",
        ));
    }

    if p.te_seen && !p.chunked && p.resolved == Mode::Request {
        if !p.lenient().contains(LenientFlags::TRANSFER_ENCODING) {
            return Err(Error::with_reason(
                ErrorCode::InvalidTransferEncoding,
                "Request has invalid `Transfer-Encoding`",
            ));
        }
        // Lenient: the unsupported coding is ignored for framing.
        p.te_seen = false;
    }

    let bodyless_status = p.resolved == Mode::Response
        && ((100..200).contains(&p.status_code)
            || p.status_code == 204
            || p.status_code == 304);

    p.message_needs_eof = p.resolved == Mode::Response
        && !bodyless_status
        && !p.chunked
        && !p.content_length_seen;

    let snapshot = p.state();
    match h.on_headers_complete(&snapshot) {
        HeadersAction::Proceed => {}
        HeadersAction::Error => return Err(Error::new(ErrorCode::CbHeadersComplete)),
        HeadersAction::AssumeNoBody => p.skip_body = true,
        HeadersAction::AssumeNoBodyAndPauseUpgrade => {
            p.skip_body = true;
            p.upgrade = true;
        }
    }

    if p.skip_body || bodyless_status {
        p.message_needs_eof = false;
        return message_done(p, h);
    }
    if p.chunked {
        p.content_length = 0;
        p.state = State::ChunkSizeStart;
        return Ok(());
    }
    if p.content_length_seen {
        if p.content_length == 0 {
            return message_done(p, h);
        }
        p.state = State::BodyIdentity;
        return Ok(());
    }
    if p.message_needs_eof {
        p.state = State::BodyIdentityEof;
        return Ok(());
    }
    // Requests without framing headers have no body.
    message_done(p, h)
}

/// Emit message-complete and surface the upgrade pause when the message
/// switched protocols.
fn message_done<H: Handler>(p: &mut Parser, h: &mut H) -> Result<(), Error> {
    p.state = State::MessageDone;
    signal(h, Signal::MessageComplete)?;
    if p.upgrade {
        return Err(Error::with_reason(
            ErrorCode::PausedUpgrade,
            "Pause on CONNECT/Upgrade",
        ));
    }
    Ok(())
}
