//! Lenient parsing flags.
//!
//! Each flag widens the accepted grammar along one documented axis for
//! interoperating with non-compliant peers. None of them change which
//! events are emitted, only which inputs are accepted.

use std::fmt;
use std::ops::BitOr;

/// A set of lenient flags.
///
/// Combine with `|`:
///
/// ```
/// use h1parse::LenientFlags;
///
/// let flags = LenientFlags::KEEP_ALIVE | LenientFlags::OPTIONAL_CR_BEFORE_LF;
/// assert!(flags.contains(LenientFlags::KEEP_ALIVE));
/// assert!(!flags.contains(LenientFlags::HEADERS));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LenientFlags(u16);

impl LenientFlags {
    /// Skip header-value token validation.
    pub const HEADERS: LenientFlags = LenientFlags(1 << 0);
    /// Permit `Transfer-Encoding: chunked` together with `Content-Length`
    /// (chunked wins).
    pub const CHUNKED_LENGTH: LenientFlags = LenientFlags(1 << 1);
    /// After `Connection: close`, keep parsing further messages on the
    /// stream.
    pub const KEEP_ALIVE: LenientFlags = LenientFlags(1 << 2);
    /// Permit `Transfer-Encoding` values other than a final `chunked`.
    pub const TRANSFER_ENCODING: LenientFlags = LenientFlags(1 << 3);
    /// Permit HTTP versions outside 0.9 / 1.0 / 1.1 / 2.0.
    pub const VERSION: LenientFlags = LenientFlags(1 << 4);
    /// Silently discard bytes arriving after a close-terminated message.
    pub const DATA_AFTER_CLOSE: LenientFlags = LenientFlags(1 << 5);
    /// Accept a bare CR as a line terminator.
    pub const OPTIONAL_LF_AFTER_CR: LenientFlags = LenientFlags(1 << 6);
    /// Accept a bare LF as a line terminator.
    pub const OPTIONAL_CR_BEFORE_LF: LenientFlags = LenientFlags(1 << 7);
    /// Allow the next chunk to begin immediately after the prior chunk's
    /// data, without the separating CRLF.
    pub const OPTIONAL_CRLF_AFTER_CHUNK: LenientFlags = LenientFlags(1 << 8);
    /// Tolerate spaces and tabs between the chunk size and the CRLF or
    /// `;`.
    pub const SPACES_AFTER_CHUNK_SIZE: LenientFlags = LenientFlags(1 << 9);

    /// The empty set.
    pub fn empty() -> Self {
        Self(0)
    }

    /// True when every flag in `other` is set in `self`.
    pub fn contains(self, other: LenientFlags) -> bool {
        self.0 & other.0 == other.0
    }

    /// True when no flag is set.
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for LenientFlags {
    type Output = LenientFlags;

    fn bitor(self, rhs: LenientFlags) -> LenientFlags {
        LenientFlags(self.0 | rhs.0)
    }
}

impl fmt::Display for LenientFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const NAMES: [(LenientFlags, &str); 10] = [
            (LenientFlags::HEADERS, "headers"),
            (LenientFlags::CHUNKED_LENGTH, "chunked-length"),
            (LenientFlags::KEEP_ALIVE, "keep-alive"),
            (LenientFlags::TRANSFER_ENCODING, "transfer-encoding"),
            (LenientFlags::VERSION, "version"),
            (LenientFlags::DATA_AFTER_CLOSE, "data-after-close"),
            (LenientFlags::OPTIONAL_LF_AFTER_CR, "optional-lf-after-cr"),
            (LenientFlags::OPTIONAL_CR_BEFORE_LF, "optional-cr-before-lf"),
            (
                LenientFlags::OPTIONAL_CRLF_AFTER_CHUNK,
                "optional-crlf-after-chunk",
            ),
            (
                LenientFlags::SPACES_AFTER_CHUNK_SIZE,
                "spaces-after-chunk-size",
            ),
        ];

        let mut first = true;
        for (flag, name) in NAMES {
            if self.contains(flag) {
                if !first {
                    f.write_str("|")?;
                }
                f.write_str(name)?;
                first = false;
            }
        }
        if first {
            f.write_str("(none)")?;
        }
        Ok(())
    }
}
