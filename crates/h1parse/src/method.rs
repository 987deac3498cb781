//! Known request methods.

/// A recognized HTTP request method.
///
/// The parser validates the method token against this table once the
/// terminating space arrives; unknown tokens fail with
/// `HPE_INVALID_METHOD`. The set covers the HTTP and WebDAV methods plus
/// `PRI` (the cleartext HTTP/2 preface, which is then rejected at the
/// version check unless lenient-version is set).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
#[non_exhaustive]
pub enum Method {
    Delete,
    Get,
    Head,
    Post,
    Put,
    Connect,
    Options,
    Trace,
    Copy,
    Lock,
    Mkcol,
    Move,
    Propfind,
    Proppatch,
    Search,
    Unlock,
    Bind,
    Rebind,
    Unbind,
    Acl,
    Report,
    Mkactivity,
    Checkout,
    Merge,
    MSearch,
    Notify,
    Subscribe,
    Unsubscribe,
    Patch,
    Purge,
    Mkcalendar,
    Link,
    Unlink,
    Source,
    Query,
    Pri,
}

impl Method {
    /// Look up a method token. Matching is exact (methods are
    /// case-sensitive per RFC 7231 §4.1).
    pub fn from_token(token: &[u8]) -> Option<Method> {
        Some(match token {
            b"DELETE" => Method::Delete,
            b"GET" => Method::Get,
            b"HEAD" => Method::Head,
            b"POST" => Method::Post,
            b"PUT" => Method::Put,
            b"CONNECT" => Method::Connect,
            b"OPTIONS" => Method::Options,
            b"TRACE" => Method::Trace,
            b"COPY" => Method::Copy,
            b"LOCK" => Method::Lock,
            b"MKCOL" => Method::Mkcol,
            b"MOVE" => Method::Move,
            b"PROPFIND" => Method::Propfind,
            b"PROPPATCH" => Method::Proppatch,
            b"SEARCH" => Method::Search,
            b"UNLOCK" => Method::Unlock,
            b"BIND" => Method::Bind,
            b"REBIND" => Method::Rebind,
            b"UNBIND" => Method::Unbind,
            b"ACL" => Method::Acl,
            b"REPORT" => Method::Report,
            b"MKACTIVITY" => Method::Mkactivity,
            b"CHECKOUT" => Method::Checkout,
            b"MERGE" => Method::Merge,
            b"M-SEARCH" => Method::MSearch,
            b"NOTIFY" => Method::Notify,
            b"SUBSCRIBE" => Method::Subscribe,
            b"UNSUBSCRIBE" => Method::Unsubscribe,
            b"PATCH" => Method::Patch,
            b"PURGE" => Method::Purge,
            b"MKCALENDAR" => Method::Mkcalendar,
            b"LINK" => Method::Link,
            b"UNLINK" => Method::Unlink,
            b"SOURCE" => Method::Source,
            b"QUERY" => Method::Query,
            b"PRI" => Method::Pri,
            _ => return None,
        })
    }

    /// The canonical token for this method.
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Delete => "DELETE",
            Method::Get => "GET",
            Method::Head => "HEAD",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Connect => "CONNECT",
            Method::Options => "OPTIONS",
            Method::Trace => "TRACE",
            Method::Copy => "COPY",
            Method::Lock => "LOCK",
            Method::Mkcol => "MKCOL",
            Method::Move => "MOVE",
            Method::Propfind => "PROPFIND",
            Method::Proppatch => "PROPPATCH",
            Method::Search => "SEARCH",
            Method::Unlock => "UNLOCK",
            Method::Bind => "BIND",
            Method::Rebind => "REBIND",
            Method::Unbind => "UNBIND",
            Method::Acl => "ACL",
            Method::Report => "REPORT",
            Method::Mkactivity => "MKACTIVITY",
            Method::Checkout => "CHECKOUT",
            Method::Merge => "MERGE",
            Method::MSearch => "M-SEARCH",
            Method::Notify => "NOTIFY",
            Method::Subscribe => "SUBSCRIBE",
            Method::Unsubscribe => "UNSUBSCRIBE",
            Method::Patch => "PATCH",
            Method::Purge => "PURGE",
            Method::Mkcalendar => "MKCALENDAR",
            Method::Link => "LINK",
            Method::Unlink => "UNLINK",
            Method::Source => "SOURCE",
            Method::Query => "QUERY",
            Method::Pri => "PRI",
        }
    }

    /// Convert to [`http::Method`].
    pub fn to_http(self) -> Option<http::Method> {
        http::Method::from_bytes(self.as_str().as_bytes()).ok()
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
