use super::*;
use rstest::rstest;

/// Recording handler: keeps every event and optionally misbehaves on a
/// chosen one.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Ev {
    Sig(Signal),
    Frag(PayloadKind, Vec<u8>),
    HeadersComplete,
}

#[derive(Default)]
struct Recorder {
    events: Vec<Ev>,
    pause_on: Option<Signal>,
    error_on: Option<Signal>,
    payload_error_on: Option<PayloadKind>,
    payload_user_error_on: Option<PayloadKind>,
    headers_action: Option<HeadersAction>,
}

impl Handler for Recorder {
    fn on_signal(&mut self, signal: Signal) -> SignalAction {
        self.events.push(Ev::Sig(signal));
        if self.pause_on == Some(signal) {
            return SignalAction::Pause;
        }
        if self.error_on == Some(signal) {
            return SignalAction::Error;
        }
        SignalAction::Proceed
    }

    fn on_payload(&mut self, kind: PayloadKind, bytes: &[u8]) -> PayloadAction {
        self.events.push(Ev::Frag(kind, bytes.to_vec()));
        if self.payload_error_on == Some(kind) {
            return PayloadAction::Error;
        }
        if self.payload_user_error_on == Some(kind) {
            return PayloadAction::UserError;
        }
        PayloadAction::Proceed
    }

    fn on_headers_complete(&mut self, _state: &ParserState) -> HeadersAction {
        self.events.push(Ev::HeadersComplete);
        self.headers_action.unwrap_or_default()
    }
}

impl Recorder {
    fn signals(&self) -> Vec<Signal> {
        self.events
            .iter()
            .filter_map(|e| match e {
                Ev::Sig(s) => Some(*s),
                _ => None,
            })
            .collect()
    }

    fn count(&self, signal: Signal) -> usize {
        self.signals().iter().filter(|&&s| s == signal).count()
    }

    /// Concatenation of every fragment of one kind.
    fn concat(&self, kind: PayloadKind) -> Vec<u8> {
        let mut out = Vec::new();
        for e in &self.events {
            if let Ev::Frag(k, bytes) = e {
                if *k == kind {
                    out.extend_from_slice(bytes);
                }
            }
        }
        out
    }

    /// Events with adjacent same-kind fragments merged, for comparing
    /// runs across different input partitions.
    fn coalesced(&self) -> Vec<Ev> {
        let mut out: Vec<Ev> = Vec::new();
        for e in &self.events {
            match (out.last_mut(), e) {
                (Some(Ev::Frag(prev_kind, prev_bytes)), Ev::Frag(kind, bytes))
                    if prev_kind == kind =>
                {
                    prev_bytes.extend_from_slice(bytes);
                }
                _ => out.push(e.clone()),
            }
        }
        out
    }
}

fn parse_ok(mode: Mode, input: &[u8]) -> Recorder {
    let mut rec = Recorder::default();
    let mut parser = Parser::new(mode);
    let consumed = parser.parse(&mut rec, input).expect("parse should succeed");
    assert_eq!(consumed, input.len(), "whole input should be consumed");
    rec
}

fn parse_err(mode: Mode, input: &[u8]) -> (Parser, Recorder, Error) {
    let mut rec = Recorder::default();
    let mut parser = Parser::new(mode);
    let err = parser
        .parse(&mut rec, input)
        .expect_err("parse should fail");
    (parser, rec, err)
}

// =========================================================================
// Request line
// =========================================================================

#[test]
fn test_minimal_request_event_order() {
    let rec = parse_ok(Mode::Request, b"GET / HTTP/1.1\r\n\r\n");

    assert_eq!(
        rec.coalesced(),
        vec![
            Ev::Sig(Signal::MessageBegin),
            Ev::Frag(PayloadKind::Method, b"GET".to_vec()),
            Ev::Sig(Signal::MethodComplete),
            Ev::Frag(PayloadKind::Url, b"/".to_vec()),
            Ev::Sig(Signal::UrlComplete),
            Ev::Frag(PayloadKind::Protocol, b"HTTP".to_vec()),
            Ev::Sig(Signal::ProtocolComplete),
            Ev::Frag(PayloadKind::Version, b"1.1".to_vec()),
            Ev::Sig(Signal::VersionComplete),
            Ev::HeadersComplete,
            Ev::Sig(Signal::MessageComplete),
        ]
    );
}

#[test]
fn test_auto_mode_resolves_request() {
    let rec = parse_ok(Mode::Auto, b"HEAD /x HTTP/1.1\r\n\r\n");
    // The shared "H" prefix with "HTTP/" must be replayed into the method.
    assert_eq!(rec.concat(PayloadKind::Method), b"HEAD");
}

#[test]
fn test_auto_mode_resolves_response() {
    let rec = parse_ok(Mode::Auto, b"HTTP/1.1 204 No Content\r\n\r\n");
    assert_eq!(rec.concat(PayloadKind::Protocol), b"HTTP");
    assert_eq!(rec.concat(PayloadKind::Status), b"No Content");
    assert_eq!(rec.concat(PayloadKind::Method), b"");
}

#[test]
fn test_observable_state_after_request_line() {
    let mut rec = Recorder::default();
    let mut parser = Parser::new(Mode::Request);
    parser
        .parse(&mut rec, b"POST /submit HTTP/1.0\r\n")
        .unwrap();
    let state = parser.state();
    assert_eq!(state.method, Some(Method::Post));
    assert_eq!((state.http_major, state.http_minor), (1, 0));
    assert_eq!(state.mode, Mode::Request);
}

#[rstest]
#[case::invalid_token(b"INVALID METHOD / HTTP/1.1\r\n\r\n".as_slice())]
#[case::lowercase(b"get / HTTP/1.1\r\n\r\n".as_slice())]
#[case::empty(b" / HTTP/1.1\r\n\r\n".as_slice())]
fn test_invalid_method(#[case] input: &[u8]) {
    let (_, _, err) = parse_err(Mode::Request, input);
    assert_eq!(err.code, ErrorCode::InvalidMethod);
    assert_eq!(err.code.code(), 6);
    assert_eq!(err.name(), "HPE_INVALID_METHOD");
    assert_eq!(err.reason.as_deref(), Some("Invalid method encountered"));
}

#[test]
fn test_sticky_error_until_reset() {
    let mut rec = Recorder::default();
    let mut parser = Parser::new(Mode::Request);
    let err = parser
        .parse(&mut rec, b"INVALID METHOD / HTTP/1.1\r\n\r\n")
        .expect_err("invalid method should fail");

    // Subsequent parses return the same error value, even on valid input.
    let again = parser
        .parse(&mut rec, b"GET / HTTP/1.1\r\n\r\n")
        .expect_err("latched error should persist");
    assert_eq!(again, err);

    parser.reset();
    parser
        .parse(&mut rec, b"GET / HTTP/1.1\r\n\r\n")
        .expect("reset should clear the latch");
}

#[rstest]
#[case::unsupported_default(b"GET / HTTP/1.2\r\n\r\n".as_slice(), LenientFlags::empty(), false)]
#[case::accepted_with_lenient(
    b"GET / HTTP/1.2\r\n\r\n".as_slice(),
    LenientFlags::VERSION,
    true
)]
#[case::two_zero(b"GET / HTTP/2.0\r\n\r\n".as_slice(), LenientFlags::empty(), true)]
fn test_version_acceptance(
    #[case] input: &[u8],
    #[case] lenient: LenientFlags,
    #[case] accepted: bool,
) {
    let mut rec = Recorder::default();
    let mut parser = Parser::new(Mode::Request);
    parser.set_lenient(lenient);
    let result = parser.parse(&mut rec, input);
    if accepted {
        result.expect("version should be accepted");
    } else {
        let err = result.expect_err("version should be rejected");
        assert_eq!(err.code, ErrorCode::InvalidVersion);
    }
}

#[test]
fn test_missing_version_is_rejected() {
    let (_, _, err) = parse_err(Mode::Request, b"GET /\r\n\r\n");
    assert_eq!(err.code, ErrorCode::InvalidVersion);
}

#[test]
fn test_url_with_control_byte_is_rejected() {
    let (_, _, err) = parse_err(Mode::Request, b"GET /\x01 HTTP/1.1\r\n\r\n");
    assert_eq!(err.code, ErrorCode::InvalidUrl);
}

// =========================================================================
// Status line
// =========================================================================

#[test]
fn test_response_line_events() {
    let rec = parse_ok(Mode::Response, b"HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\n\r\n");
    assert_eq!(rec.concat(PayloadKind::Version), b"1.1");
    assert_eq!(rec.concat(PayloadKind::Status), b"Not Found");
    assert_eq!(rec.count(Signal::StatusComplete), 1);
}

#[test]
fn test_empty_reason_phrase_still_completes() {
    let rec = parse_ok(Mode::Response, b"HTTP/1.1 200\r\nContent-Length: 0\r\n\r\n");
    assert_eq!(rec.count(Signal::StatusComplete), 1);
    assert_eq!(rec.concat(PayloadKind::Status), b"");
}

#[test]
fn test_status_name_derived_from_code() {
    let mut rec = Recorder::default();
    let mut parser = Parser::new(Mode::Response);
    parser
        .parse(&mut rec, b"HTTP/1.1 200 Anything Goes\r\n")
        .unwrap();
    let state = parser.state();
    assert_eq!(state.status_code, 200);
    assert_eq!(state.status_name(), Some("OK"));
}

#[rstest]
#[case::too_few_digits(b"HTTP/1.1 99 X\r\n\r\n".as_slice())]
#[case::too_many_digits(b"HTTP/1.1 2000 X\r\n\r\n".as_slice())]
#[case::below_100(b"HTTP/1.1 099 X\r\n\r\n".as_slice())]
#[case::not_digits(b"HTTP/1.1 abc X\r\n\r\n".as_slice())]
fn test_invalid_status_code(#[case] input: &[u8]) {
    let (_, _, err) = parse_err(Mode::Response, input);
    assert_eq!(err.code, ErrorCode::InvalidStatus);
}

// =========================================================================
// Headers and framing
// =========================================================================

#[test]
fn test_header_field_value_pairing() {
    let rec = parse_ok(
        Mode::Request,
        b"GET / HTTP/1.1\r\nHost: example.com\r\nAccept: */*\r\n\r\n",
    );
    assert_eq!(rec.count(Signal::HeaderFieldComplete), 2);
    assert_eq!(rec.count(Signal::HeaderValueComplete), 2);
    assert_eq!(rec.concat(PayloadKind::HeaderField), b"HostAccept");
    assert_eq!(rec.concat(PayloadKind::HeaderValue), b"example.com*/*");
}

#[test]
fn test_content_length_body() {
    let rec = parse_ok(
        Mode::Request,
        b"POST /api HTTP/1.1\r\nContent-Length: 5\r\n\r\nhello",
    );
    assert_eq!(rec.concat(PayloadKind::Body), b"hello");
    assert_eq!(rec.count(Signal::MessageComplete), 1);
}

#[test]
fn test_content_length_register_exposed() {
    let mut rec = Recorder::default();
    let mut parser = Parser::new(Mode::Request);
    parser
        .parse(&mut rec, b"POST / HTTP/1.1\r\nContent-Length: 1234\r\n")
        .unwrap();
    assert_eq!(parser.state().content_length, 1234);
}

#[rstest]
#[case::not_a_number(b"POST / HTTP/1.1\r\nContent-Length: 5x\r\n\r\n".as_slice())]
#[case::empty(b"POST / HTTP/1.1\r\nContent-Length:\r\n\r\n".as_slice())]
#[case::digits_after_ws(b"POST / HTTP/1.1\r\nContent-Length: 5 5\r\n\r\n".as_slice())]
#[case::overflow(
    b"POST / HTTP/1.1\r\nContent-Length: 99999999999999999999\r\n\r\n".as_slice()
)]
fn test_invalid_content_length(#[case] input: &[u8]) {
    let (_, _, err) = parse_err(Mode::Request, input);
    assert_eq!(err.code, ErrorCode::InvalidContentLength);
}

#[test]
fn test_duplicate_content_length() {
    let (_, _, err) = parse_err(
        Mode::Request,
        b"POST / HTTP/1.1\r\nContent-Length: 5\r\nContent-Length: 5\r\n\r\n",
    );
    assert_eq!(err.code, ErrorCode::InvalidContentLength);
    assert_eq!(err.reason.as_deref(), Some("Duplicate Content-Length"));
}

#[test]
fn test_content_length_with_chunked_conflicts() {
    let (_, _, err) = parse_err(
        Mode::Request,
        b"POST / HTTP/1.1\r\nTransfer-Encoding: chunked\r\nContent-Length: 5\r\n\r\n",
    );
    assert_eq!(err.code, ErrorCode::UnexpectedContentLength);
}

#[test]
fn test_lenient_chunked_length_prefers_chunked() {
    let mut rec = Recorder::default();
    let mut parser = Parser::new(Mode::Request);
    parser.set_lenient(LenientFlags::CHUNKED_LENGTH);
    parser
        .parse(
            &mut rec,
            b"POST / HTTP/1.1\r\nTransfer-Encoding: chunked\r\nContent-Length: 3\r\n\r\n5\r\nhello\r\n0\r\n\r\n",
        )
        .unwrap();
    assert_eq!(rec.concat(PayloadKind::Body), b"hello");
}

#[test]
fn test_foreign_transfer_encoding_rejected_for_requests() {
    let (_, _, err) = parse_err(
        Mode::Request,
        b"POST / HTTP/1.1\r\nTransfer-Encoding: gzip\r\n\r\n",
    );
    assert_eq!(err.code, ErrorCode::InvalidTransferEncoding);
}

#[test]
fn test_lenient_transfer_encoding_ignores_foreign_coding() {
    let mut rec = Recorder::default();
    let mut parser = Parser::new(Mode::Request);
    parser.set_lenient(LenientFlags::TRANSFER_ENCODING);
    parser
        .parse(&mut rec, b"POST / HTTP/1.1\r\nTransfer-Encoding: gzip\r\n\r\n")
        .unwrap();
    // Without usable framing the request has no body.
    assert_eq!(rec.count(Signal::MessageComplete), 1);
    assert_eq!(rec.concat(PayloadKind::Body), b"");
}

#[test]
fn test_chunked_must_be_final_coding() {
    // "chunked, gzip" does not select chunked framing.
    let (_, _, err) = parse_err(
        Mode::Request,
        b"POST / HTTP/1.1\r\nTransfer-Encoding: chunked, gzip\r\n\r\n",
    );
    assert_eq!(err.code, ErrorCode::InvalidTransferEncoding);
}

#[test]
fn test_gzip_then_chunked_is_chunked() {
    let rec = parse_ok(
        Mode::Request,
        b"POST / HTTP/1.1\r\nTransfer-Encoding: gzip, chunked\r\n\r\n5\r\nhello\r\n0\r\n\r\n",
    );
    assert_eq!(rec.concat(PayloadKind::Body), b"hello");
}

#[test]
fn test_invalid_header_byte() {
    let (_, _, err) = parse_err(Mode::Request, b"GET / HTTP/1.1\r\nBad\x01Name: x\r\n\r\n");
    assert_eq!(err.code, ErrorCode::InvalidHeaderToken);
}

#[test]
fn test_lenient_headers_skips_value_validation() {
    let input = b"GET / HTTP/1.1\r\nWeird: a\x01b\r\n\r\n";
    let (_, _, err) = parse_err(Mode::Request, input);
    assert_eq!(err.code, ErrorCode::InvalidHeaderToken);

    let mut rec = Recorder::default();
    let mut parser = Parser::new(Mode::Request);
    parser.set_lenient(LenientFlags::HEADERS);
    parser.parse(&mut rec, input).unwrap();
    assert_eq!(rec.concat(PayloadKind::HeaderValue), b"a\x01b");
}

// =========================================================================
// Chunked bodies
// =========================================================================

#[test]
fn test_chunked_event_order() {
    let rec = parse_ok(
        Mode::Response,
        b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n5;charset=utf-8\r\nHello\r\n0\r\n\r\n",
    );
    assert_eq!(rec.concat(PayloadKind::ChunkExtensionName), b"charset");
    assert_eq!(rec.concat(PayloadKind::ChunkExtensionValue), b"utf-8");
    assert_eq!(rec.concat(PayloadKind::Body), b"Hello");
    // One chunk-header + chunk-complete per chunk, including the zero
    // chunk.
    assert_eq!(rec.count(Signal::ChunkHeader), 2);
    assert_eq!(rec.count(Signal::ChunkComplete), 2);

    let signals = rec.signals();
    let complete_at = signals
        .iter()
        .position(|&s| s == Signal::MessageComplete)
        .expect("message must complete");
    let last_chunk_at = signals
        .iter()
        .rposition(|&s| s == Signal::ChunkComplete)
        .expect("zero chunk must complete");
    assert!(
        last_chunk_at < complete_at,
        "zero-chunk complete precedes message-complete"
    );
}

#[test]
fn test_chunk_extensions_precede_chunk_header() {
    let rec = parse_ok(
        Mode::Response,
        b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n5;a=b\r\nHello\r\n0\r\n\r\n",
    );
    let signals = rec.signals();
    let ext = signals
        .iter()
        .position(|&s| s == Signal::ChunkExtensionValueComplete)
        .expect("extension value must complete");
    let header = signals
        .iter()
        .position(|&s| s == Signal::ChunkHeader)
        .expect("chunk header must fire");
    assert!(ext < header, "extension events precede chunk-header");
}

#[test]
fn test_chunked_trailers_emit_header_events() {
    let rec = parse_ok(
        Mode::Response,
        b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n3\r\nabc\r\n0\r\nExpires: never\r\n\r\n",
    );
    assert_eq!(rec.concat(PayloadKind::HeaderField), b"Transfer-EncodingExpires");
    assert_eq!(rec.count(Signal::HeaderFieldComplete), 2);
    // headers-complete fires once, for the header section only.
    let headers_complete = rec
        .events
        .iter()
        .filter(|e| matches!(e, Ev::HeadersComplete))
        .count();
    assert_eq!(headers_complete, 1);
}

#[test]
fn test_quoted_chunk_extension_value() {
    let rec = parse_ok(
        Mode::Response,
        b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n3;note=\"a b\"\r\nabc\r\n0\r\n\r\n",
    );
    assert_eq!(rec.concat(PayloadKind::ChunkExtensionValue), b"a b");
}

#[test]
fn test_valueless_chunk_extension_completes_empty_value() {
    let rec = parse_ok(
        Mode::Response,
        b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n3;nocache\r\nabc\r\n0\r\n\r\n",
    );
    assert_eq!(rec.count(Signal::ChunkExtensionNameComplete), 1);
    assert_eq!(rec.count(Signal::ChunkExtensionValueComplete), 1);
    assert_eq!(rec.concat(PayloadKind::ChunkExtensionValue), b"");
}

#[rstest]
#[case::bad_size(b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\nxyz\r\n".as_slice())]
#[case::overflow(
    b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\nfffffffffffffffff\r\n".as_slice()
)]
#[case::space_after_size(
    b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n5 \r\nhello\r\n0\r\n\r\n".as_slice()
)]
fn test_invalid_chunk_size(#[case] input: &[u8]) {
    let (_, _, err) = parse_err(Mode::Response, input);
    assert_eq!(err.code, ErrorCode::InvalidChunkSize);
}

#[test]
fn test_lenient_spaces_after_chunk_size() {
    let mut rec = Recorder::default();
    let mut parser = Parser::new(Mode::Response);
    parser.set_lenient(LenientFlags::SPACES_AFTER_CHUNK_SIZE);
    parser
        .parse(
            &mut rec,
            b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n5  \r\nhello\r\n0\r\n\r\n",
        )
        .unwrap();
    assert_eq!(rec.concat(PayloadKind::Body), b"hello");
}

#[test]
fn test_lenient_optional_crlf_after_chunk() {
    let mut rec = Recorder::default();
    let mut parser = Parser::new(Mode::Response);
    parser.set_lenient(LenientFlags::OPTIONAL_CRLF_AFTER_CHUNK);
    parser
        .parse(
            &mut rec,
            b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n3\r\nabc2\r\nde\r\n0\r\n\r\n",
        )
        .unwrap();
    assert_eq!(rec.concat(PayloadKind::Body), b"abcde");
    assert_eq!(rec.count(Signal::ChunkComplete), 3);
}

#[test]
fn test_missing_crlf_after_chunk_data() {
    let (_, _, err) = parse_err(
        Mode::Response,
        b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n3\r\nabcde\r\n",
    );
    assert_eq!(err.code, ErrorCode::CrExpected);
}

// =========================================================================
// Line terminators
// =========================================================================

#[test]
fn test_bare_lf_rejected_by_default() {
    let (_, _, err) = parse_err(Mode::Request, b"GET / HTTP/1.1\n\n");
    assert_eq!(err.code, ErrorCode::InvalidVersion);
}

#[test]
fn test_lenient_bare_lf_lines() {
    let mut rec = Recorder::default();
    let mut parser = Parser::new(Mode::Request);
    parser.set_lenient(LenientFlags::OPTIONAL_CR_BEFORE_LF);
    parser
        .parse(&mut rec, b"GET / HTTP/1.1\nHost: a\n\n")
        .unwrap();
    assert_eq!(rec.count(Signal::MessageComplete), 1);
    assert_eq!(rec.concat(PayloadKind::HeaderValue), b"a");
}

#[test]
fn test_lenient_bare_cr_lines() {
    let mut rec = Recorder::default();
    let mut parser = Parser::new(Mode::Request);
    parser.set_lenient(LenientFlags::OPTIONAL_LF_AFTER_CR);
    // Bare CR ends each line; the final blank line still needs its LF
    // because a lone CR cannot be distinguished from CRLF without
    // lookahead.
    parser
        .parse(&mut rec, b"GET / HTTP/1.1\rHost: a\r\r\n")
        .unwrap();
    assert_eq!(rec.count(Signal::MessageComplete), 1);
    assert_eq!(rec.concat(PayloadKind::HeaderValue), b"a");
}

#[test]
fn test_bare_cr_rejected_by_default() {
    let (_, _, err) = parse_err(Mode::Request, b"GET / HTTP/1.1\rHost: a\r\r");
    assert_eq!(err.code, ErrorCode::LfExpected);
}

// =========================================================================
// Pipelining, keep-alive, close
// =========================================================================

#[test]
fn test_pipelined_requests_emit_one_reset() {
    let input = b"GET / HTTP/1.1\r\n\r\nGET / HTTP/1.1\r\n\r\n";
    let rec = parse_ok(Mode::Request, input);
    assert_eq!(rec.count(Signal::MessageBegin), 2);
    assert_eq!(rec.count(Signal::MessageComplete), 2);
    assert_eq!(rec.count(Signal::Reset), 1);

    let signals = rec.signals();
    let reset_at = signals.iter().position(|&s| s == Signal::Reset).unwrap();
    let first_complete = signals
        .iter()
        .position(|&s| s == Signal::MessageComplete)
        .unwrap();
    assert!(reset_at > first_complete, "reset follows the first message");
}

#[test]
fn test_connection_close_stops_the_stream() {
    let (_, _, err) = parse_err(
        Mode::Request,
        b"GET / HTTP/1.1\r\nConnection: close\r\n\r\nGET / HTTP/1.1\r\n\r\n",
    );
    assert_eq!(err.code, ErrorCode::ClosedConnection);
    assert_eq!(err.code.code(), 5);
}

#[test]
fn test_lenient_keep_alive_continues_after_close() {
    let mut rec = Recorder::default();
    let mut parser = Parser::new(Mode::Request);
    parser.set_lenient(LenientFlags::KEEP_ALIVE);
    parser
        .parse(
            &mut rec,
            b"GET / HTTP/1.1\r\nConnection: close\r\n\r\nGET / HTTP/1.1\r\n\r\n",
        )
        .unwrap();
    assert_eq!(rec.count(Signal::MessageComplete), 2);
}

#[test]
fn test_lenient_data_after_close_discards() {
    let mut rec = Recorder::default();
    let mut parser = Parser::new(Mode::Request);
    parser.set_lenient(LenientFlags::DATA_AFTER_CLOSE);
    let input = b"GET / HTTP/1.1\r\nConnection: close\r\n\r\ntrailing garbage";
    let consumed = parser.parse(&mut rec, input).unwrap();
    assert_eq!(consumed, input.len(), "garbage is consumed silently");
    assert_eq!(rec.count(Signal::MessageComplete), 1);
}

#[test]
fn test_http10_defaults_to_close() {
    let mut rec = Recorder::default();
    let mut parser = Parser::new(Mode::Request);
    parser
        .parse(&mut rec, b"GET / HTTP/1.0\r\n\r\n")
        .unwrap();
    assert!(!parser.state().should_keep_alive);

    let mut parser = Parser::new(Mode::Request);
    parser
        .parse(&mut rec, b"GET / HTTP/1.0\r\nConnection: keep-alive\r\n\r\n")
        .unwrap();
    assert!(parser.state().should_keep_alive);
}

// =========================================================================
// Read-until-close bodies and finish()
// =========================================================================

#[test]
fn test_response_without_framing_reads_to_eof() {
    let mut rec = Recorder::default();
    let mut parser = Parser::new(Mode::Response);
    parser
        .parse(&mut rec, b"HTTP/1.1 200 OK\r\n\r\npartial body")
        .unwrap();
    assert_eq!(rec.count(Signal::MessageComplete), 0);
    assert!(parser.state().message_needs_eof);

    parser.parse(&mut rec, b" more").unwrap();
    parser.finish(&mut rec).expect("finish commits the body");
    assert_eq!(rec.concat(PayloadKind::Body), b"partial body more");
    assert_eq!(rec.count(Signal::MessageComplete), 1);
}

#[test]
fn test_finish_mid_message_is_invalid_eof_state() {
    let mut rec = Recorder::default();
    let mut parser = Parser::new(Mode::Request);
    parser
        .parse(&mut rec, b"POST / HTTP/1.1\r\nContent-Length: 10\r\n\r\nabc")
        .unwrap();
    let err = parser.finish(&mut rec).expect_err("body is incomplete");
    assert_eq!(err.code, ErrorCode::InvalidEofState);
}

#[test]
fn test_finish_between_messages_is_ok() {
    let mut rec = Recorder::default();
    let mut parser = Parser::new(Mode::Request);
    parser.parse(&mut rec, b"GET / HTTP/1.1\r\n\r\n").unwrap();
    parser.finish(&mut rec).expect("between messages");

    let mut parser = Parser::new(Mode::Request);
    parser.finish(&mut rec).expect("empty stream");
}

// =========================================================================
// Pause / resume / upgrade
// =========================================================================

#[test]
fn test_pause_and_resume_roundtrip() {
    let mut rec = Recorder::default();
    let mut parser = Parser::new(Mode::Request);
    parser.pause();
    let err = parser
        .parse(&mut rec, b"GET / HTTP/1.1\r\n\r\n")
        .expect_err("paused");
    assert_eq!(err.code, ErrorCode::Paused);
    assert_eq!(err.code.code(), 21);

    parser.resume();
    parser
        .parse(&mut rec, b"GET / HTTP/1.1\r\n\r\n")
        .expect("resume clears the pause");
    assert_eq!(rec.count(Signal::MessageComplete), 1);
}

#[test]
fn test_pause_from_callback_keeps_position() {
    let input = b"GET / HTTP/1.1\r\n\r\n";
    let mut rec = Recorder {
        pause_on: Some(Signal::UrlComplete),
        ..Default::default()
    };
    let mut parser = Parser::new(Mode::Request);
    let err = parser.parse(&mut rec, input).expect_err("paused");
    assert_eq!(err.code, ErrorCode::Paused);

    // The consumed prefix covers everything up to and including the
    // pausing event; the caller resumes with the remainder.
    let consumed = parser.bytes_parsed() as usize;
    parser.resume();
    rec.pause_on = None;
    parser
        .parse(&mut rec, &input[consumed..])
        .expect("remainder completes");
    assert_eq!(rec.count(Signal::MessageComplete), 1);
}

#[test]
fn test_connect_pauses_for_upgrade() {
    let mut rec = Recorder::default();
    let mut parser = Parser::new(Mode::Request);
    let err = parser
        .parse(&mut rec, b"CONNECT example.com:443 HTTP/1.1\r\n\r\n")
        .expect_err("CONNECT pauses");
    assert_eq!(err.code, ErrorCode::PausedUpgrade);
    assert_eq!(err.code.code(), 22);
    assert!(parser.state().upgrade);
    assert_eq!(rec.count(Signal::MessageComplete), 1);

    parser.resume_after_upgrade();
    parser
        .parse(&mut rec, b"GET / HTTP/1.1\r\n\r\n")
        .expect("parsing resumes after refused upgrade");
}

#[test]
fn test_upgrade_headers_pause_after_message() {
    let mut rec = Recorder::default();
    let mut parser = Parser::new(Mode::Request);
    let err = parser
        .parse(
            &mut rec,
            b"GET /ws HTTP/1.1\r\nUpgrade: websocket\r\nConnection: Upgrade\r\n\r\n",
        )
        .expect_err("upgrade pauses");
    assert_eq!(err.code, ErrorCode::PausedUpgrade);
    assert!(parser.state().upgrade);
}

#[test]
fn test_101_response_pauses_for_upgrade() {
    let mut rec = Recorder::default();
    let mut parser = Parser::new(Mode::Response);
    let err = parser
        .parse(
            &mut rec,
            b"HTTP/1.1 101 Switching Protocols\r\nUpgrade: websocket\r\nConnection: Upgrade\r\n\r\n",
        )
        .expect_err("101 pauses");
    assert_eq!(err.code, ErrorCode::PausedUpgrade);
}

#[test]
fn test_headers_action_assume_no_body() {
    let mut rec = Recorder {
        headers_action: Some(HeadersAction::AssumeNoBody),
        ..Default::default()
    };
    let mut parser = Parser::new(Mode::Response);
    // Response claims a body; the handler knows it answers a HEAD.
    parser
        .parse(&mut rec, b"HTTP/1.1 200 OK\r\nContent-Length: 100\r\n\r\n")
        .unwrap();
    assert_eq!(rec.count(Signal::MessageComplete), 1);
    assert_eq!(rec.concat(PayloadKind::Body), b"");
}

#[test]
fn test_headers_action_assume_no_body_and_pause_upgrade() {
    let mut rec = Recorder {
        headers_action: Some(HeadersAction::AssumeNoBodyAndPauseUpgrade),
        ..Default::default()
    };
    let mut parser = Parser::new(Mode::Request);
    let err = parser
        .parse(
            &mut rec,
            b"GET /ws HTTP/1.1\r\nUpgrade: websocket\r\nConnection: Upgrade\r\n\r\n",
        )
        .expect_err("handler forces the upgrade pause");
    assert_eq!(err.code, ErrorCode::PausedUpgrade);
    assert!(parser.state().upgrade);

    parser.resume_after_upgrade();
    assert!(parser.last_error().is_none());
}

// =========================================================================
// Callback error codes
// =========================================================================

#[rstest]
#[case::message_begin(Signal::MessageBegin, ErrorCode::CbMessageBegin)]
#[case::method_complete(Signal::MethodComplete, ErrorCode::CbMethodComplete)]
#[case::url_complete(Signal::UrlComplete, ErrorCode::CbUrlComplete)]
#[case::version_complete(Signal::VersionComplete, ErrorCode::CbVersionComplete)]
#[case::message_complete(Signal::MessageComplete, ErrorCode::CbMessageComplete)]
fn test_signal_callback_error_codes(#[case] signal: Signal, #[case] expected: ErrorCode) {
    let mut rec = Recorder {
        error_on: Some(signal),
        ..Default::default()
    };
    let mut parser = Parser::new(Mode::Request);
    let err = parser
        .parse(&mut rec, b"GET / HTTP/1.1\r\n\r\n")
        .expect_err("callback rejected");
    assert_eq!(err.code, expected);
}

#[test]
fn test_headers_complete_callback_error() {
    let mut rec = Recorder {
        headers_action: Some(HeadersAction::Error),
        ..Default::default()
    };
    let mut parser = Parser::new(Mode::Request);
    let err = parser
        .parse(&mut rec, b"GET / HTTP/1.1\r\n\r\n")
        .expect_err("callback rejected");
    assert_eq!(err.code, ErrorCode::CbHeadersComplete);
}

#[test]
fn test_payload_error_maps_to_slot_code() {
    let mut rec = Recorder {
        payload_error_on: Some(PayloadKind::Url),
        ..Default::default()
    };
    let mut parser = Parser::new(Mode::Request);
    let err = parser
        .parse(&mut rec, b"GET / HTTP/1.1\r\n\r\n")
        .expect_err("payload rejected");
    assert_eq!(err.code, ErrorCode::CbUrlComplete);
}

#[test]
fn test_payload_user_error() {
    let mut rec = Recorder {
        payload_user_error_on: Some(PayloadKind::Body),
        ..Default::default()
    };
    let mut parser = Parser::new(Mode::Request);
    let err = parser
        .parse(
            &mut rec,
            b"POST / HTTP/1.1\r\nContent-Length: 5\r\n\r\nhello",
        )
        .expect_err("payload rejected");
    assert_eq!(err.code, ErrorCode::User);
    assert_eq!(err.code.code(), 24);
}

// =========================================================================
// Fragmentation equivalence
// =========================================================================

fn parse_in_pieces(mode: Mode, input: &[u8], piece: usize) -> Recorder {
    let mut rec = Recorder::default();
    let mut parser = Parser::new(mode);
    for chunk in input.chunks(piece) {
        parser.parse(&mut rec, chunk).expect("chunk should parse");
    }
    rec
}

#[rstest]
#[case::one(1)]
#[case::two(2)]
#[case::three(3)]
#[case::seven(7)]
fn test_fragmentation_equivalence(#[case] piece: usize) {
    let input: &[u8] = b"POST /path HTTP/1.1\r\nHost: example.com\r\nTransfer-Encoding: chunked\r\n\r\n5;k=v\r\nHello\r\n6\r\n World\r\n0\r\n\r\n";
    let whole = parse_ok(Mode::Request, input);
    let pieces = parse_in_pieces(Mode::Request, input, piece);
    assert_eq!(
        whole.coalesced(),
        pieces.coalesced(),
        "events must not depend on fragment boundaries"
    );
}

#[test]
fn test_fragmentation_equivalence_auto_response() {
    let input: &[u8] = b"HTTP/1.1 200 OK\r\nContent-Length: 5\r\n\r\nhello";
    let whole = parse_ok(Mode::Auto, input);
    let pieces = parse_in_pieces(Mode::Auto, input, 1);
    assert_eq!(whole.coalesced(), pieces.coalesced());
}

#[test]
fn test_empty_parse_is_a_no_op() {
    let mut rec = Recorder::default();
    let mut parser = Parser::new(Mode::Request);
    assert_eq!(parser.parse(&mut rec, b"").unwrap(), 0);
    parser.parse(&mut rec, b"GET / HT").unwrap();
    assert_eq!(parser.parse(&mut rec, b"").unwrap(), 0);
    parser.parse(&mut rec, b"TP/1.1\r\n\r\n").unwrap();
    assert_eq!(rec.count(Signal::MessageComplete), 1);
}

#[test]
fn test_bytes_parsed_accumulates() {
    let mut rec = Recorder::default();
    let mut parser = Parser::new(Mode::Request);
    parser.parse(&mut rec, b"GET / ").unwrap();
    assert_eq!(parser.bytes_parsed(), 6);
    parser.parse(&mut rec, b"HTTP/1.1\r\n\r\n").unwrap();
    assert_eq!(parser.bytes_parsed(), 18);
}
