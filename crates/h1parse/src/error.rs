//! Parse errors with stable numeric codes.
//!
//! Every failure surfaces as an [`Error`]: a numeric [`ErrorCode`] (the
//! code values are stable across releases), the derived `HPE_*` symbolic
//! name, and an optional human-readable reason. Two errors compare equal
//! when code and reason match.

/// Stable numeric error codes.
///
/// The numbering follows the llhttp convention so that codes travel
/// unchanged through FFI boundaries and log pipelines that already know
/// the `HPE_*` namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
#[non_exhaustive]
pub enum ErrorCode {
    /// No error.
    Ok = 0,
    /// Internal parser inconsistency.
    Internal = 1,
    /// Strict-mode violation.
    Strict = 2,
    /// LF expected after CR.
    LfExpected = 3,
    /// `Content-Length` conflicts with `Transfer-Encoding`.
    UnexpectedContentLength = 4,
    /// Data arrived after a close-terminated message.
    ClosedConnection = 5,
    /// Unknown or malformed request method.
    InvalidMethod = 6,
    /// Malformed request target.
    InvalidUrl = 7,
    /// A fixed protocol literal (`HTTP/`) did not match.
    InvalidConstant = 8,
    /// Unsupported HTTP version.
    InvalidVersion = 9,
    /// Invalid byte in a header field or value.
    InvalidHeaderToken = 10,
    /// Malformed `Content-Length` value.
    InvalidContentLength = 11,
    /// Malformed chunk-size line.
    InvalidChunkSize = 12,
    /// Malformed status line.
    InvalidStatus = 13,
    /// `finish()` called while a message still needs input.
    InvalidEofState = 14,
    /// Unsupported `Transfer-Encoding` value.
    InvalidTransferEncoding = 15,
    /// Message-begin handler returned an error.
    CbMessageBegin = 16,
    /// Headers-complete handler returned an error.
    CbHeadersComplete = 17,
    /// Message-complete handler returned an error.
    CbMessageComplete = 18,
    /// Chunk-header handler returned an error.
    CbChunkHeader = 19,
    /// Chunk-complete handler returned an error.
    CbChunkComplete = 20,
    /// Parsing is suspended; cleared by [`Parser::resume`](crate::Parser::resume).
    Paused = 21,
    /// Parsing is suspended after an upgrade; cleared by
    /// [`Parser::resume_after_upgrade`](crate::Parser::resume_after_upgrade).
    PausedUpgrade = 22,
    /// A payload handler returned a user error.
    User = 24,
    /// CR expected.
    CrExpected = 25,
    /// Url-complete handler returned an error.
    CbUrlComplete = 26,
    /// Status-complete handler returned an error.
    CbStatusComplete = 27,
    /// Header-field-complete handler returned an error.
    CbHeaderFieldComplete = 28,
    /// Header-value-complete handler returned an error.
    CbHeaderValueComplete = 29,
    /// Unexpected space.
    UnexpectedSpace = 30,
    /// Reset handler returned an error.
    CbReset = 31,
    /// Method-complete handler returned an error.
    CbMethodComplete = 32,
    /// Version-complete handler returned an error.
    CbVersionComplete = 33,
    /// Chunk-extension-name-complete handler returned an error.
    CbChunkExtensionNameComplete = 34,
    /// Chunk-extension-value-complete handler returned an error.
    CbChunkExtensionValueComplete = 35,
    /// Protocol-complete handler returned an error.
    CbProtocolComplete = 36,
}

impl ErrorCode {
    /// The stable numeric value of this code.
    pub fn code(self) -> u8 {
        self as u8
    }

    /// The symbolic `HPE_*` name of this code.
    pub fn name(self) -> &'static str {
        match self {
            ErrorCode::Ok => "HPE_OK",
            ErrorCode::Internal => "HPE_INTERNAL",
            ErrorCode::Strict => "HPE_STRICT",
            ErrorCode::LfExpected => "HPE_LF_EXPECTED",
            ErrorCode::UnexpectedContentLength => "HPE_UNEXPECTED_CONTENT_LENGTH",
            ErrorCode::ClosedConnection => "HPE_CLOSED_CONNECTION",
            ErrorCode::InvalidMethod => "HPE_INVALID_METHOD",
            ErrorCode::InvalidUrl => "HPE_INVALID_URL",
            ErrorCode::InvalidConstant => "HPE_INVALID_CONSTANT",
            ErrorCode::InvalidVersion => "HPE_INVALID_VERSION",
            ErrorCode::InvalidHeaderToken => "HPE_INVALID_HEADER_TOKEN",
            ErrorCode::InvalidContentLength => "HPE_INVALID_CONTENT_LENGTH",
            ErrorCode::InvalidChunkSize => "HPE_INVALID_CHUNK_SIZE",
            ErrorCode::InvalidStatus => "HPE_INVALID_STATUS",
            ErrorCode::InvalidEofState => "HPE_INVALID_EOF_STATE",
            ErrorCode::InvalidTransferEncoding => "HPE_INVALID_TRANSFER_ENCODING",
            ErrorCode::CbMessageBegin => "HPE_CB_MESSAGE_BEGIN",
            ErrorCode::CbHeadersComplete => "HPE_CB_HEADERS_COMPLETE",
            ErrorCode::CbMessageComplete => "HPE_CB_MESSAGE_COMPLETE",
            ErrorCode::CbChunkHeader => "HPE_CB_CHUNK_HEADER",
            ErrorCode::CbChunkComplete => "HPE_CB_CHUNK_COMPLETE",
            ErrorCode::Paused => "HPE_PAUSED",
            ErrorCode::PausedUpgrade => "HPE_PAUSED_UPGRADE",
            ErrorCode::User => "HPE_USER",
            ErrorCode::CrExpected => "HPE_CR_EXPECTED",
            ErrorCode::CbUrlComplete => "HPE_CB_URL_COMPLETE",
            ErrorCode::CbStatusComplete => "HPE_CB_STATUS_COMPLETE",
            ErrorCode::CbHeaderFieldComplete => "HPE_CB_HEADER_FIELD_COMPLETE",
            ErrorCode::CbHeaderValueComplete => "HPE_CB_HEADER_VALUE_COMPLETE",
            ErrorCode::UnexpectedSpace => "HPE_UNEXPECTED_SPACE",
            ErrorCode::CbReset => "HPE_CB_RESET",
            ErrorCode::CbMethodComplete => "HPE_CB_METHOD_COMPLETE",
            ErrorCode::CbVersionComplete => "HPE_CB_VERSION_COMPLETE",
            ErrorCode::CbChunkExtensionNameComplete => "HPE_CB_CHUNK_EXTENSION_NAME_COMPLETE",
            ErrorCode::CbChunkExtensionValueComplete => "HPE_CB_CHUNK_EXTENSION_VALUE_COMPLETE",
            ErrorCode::CbProtocolComplete => "HPE_CB_PROTOCOL_COMPLETE",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A parse error: stable code plus optional reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Error {
    /// What went wrong.
    pub code: ErrorCode,
    /// Optional human-readable detail.
    pub reason: Option<String>,
}

impl Error {
    /// Create an error without a reason.
    pub fn new(code: ErrorCode) -> Self {
        Self { code, reason: None }
    }

    /// Create an error carrying a reason string.
    pub fn with_reason(code: ErrorCode, reason: impl Into<String>) -> Self {
        Self {
            code,
            reason: Some(reason.into()),
        }
    }

    /// The symbolic `HPE_*` name, derived from the code.
    pub fn name(&self) -> &'static str {
        self.code.name()
    }

    /// Whether this is one of the two resumable suspensions
    /// (`HPE_PAUSED`, `HPE_PAUSED_UPGRADE`) rather than a hard failure.
    pub fn is_pause(&self) -> bool {
        matches!(self.code, ErrorCode::Paused | ErrorCode::PausedUpgrade)
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.reason {
            Some(reason) => write!(f, "{}: {reason}", self.code),
            None => write!(f, "{}", self.code),
        }
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        assert_eq!(ErrorCode::InvalidMethod.code(), 6);
        assert_eq!(ErrorCode::Paused.code(), 21);
        assert_eq!(ErrorCode::PausedUpgrade.code(), 22);
        assert_eq!(ErrorCode::User.code(), 24);
        assert_eq!(ErrorCode::CbMessageComplete.code(), 18);
    }

    #[test]
    fn names_match_codes() {
        assert_eq!(ErrorCode::InvalidMethod.name(), "HPE_INVALID_METHOD");
        assert_eq!(ErrorCode::Paused.name(), "HPE_PAUSED");
        assert_eq!(ErrorCode::PausedUpgrade.name(), "HPE_PAUSED_UPGRADE");
    }

    #[test]
    fn equality_is_code_and_reason() {
        let a = Error::with_reason(ErrorCode::InvalidMethod, "Invalid method encountered");
        let b = Error::with_reason(ErrorCode::InvalidMethod, "Invalid method encountered");
        let c = Error::new(ErrorCode::InvalidMethod);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn display_includes_reason() {
        let e = Error::with_reason(ErrorCode::InvalidChunkSize, "Chunk size overflow");
        assert_eq!(e.to_string(), "HPE_INVALID_CHUNK_SIZE: Chunk size overflow");
        assert_eq!(Error::new(ErrorCode::Paused).to_string(), "HPE_PAUSED");
    }
}
