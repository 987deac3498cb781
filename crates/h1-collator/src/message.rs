//! Reconstructed message values.
//!
//! These types are what the collator hands back once a message
//! completes: immutable, structurally comparable, and independent of
//! the parser that produced them. Conversion helpers into the `http`
//! crate's types are provided where the model carries enough
//! information.

use std::borrow::Cow;

/// An insertion-ordered multimap used for headers and chunk extensions.
///
/// Keys keep the case they arrived with; lookups are ASCII
/// case-insensitive. Values under one key stay in arrival order, and
/// duplicate keys accumulate values rather than overwriting.
///
/// ```
/// use h1_collator::FieldMap;
///
/// let map: FieldMap = [("Cookie", "a=1"), ("Cookie", "b=2")].into_iter().collect();
/// assert_eq!(map.get("cookie"), Some("a=1"));
/// assert_eq!(map.get_all("Cookie"), ["a=1", "b=2"]);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldMap {
    entries: Vec<(String, Vec<String>)>,
}

impl FieldMap {
    /// An empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a value under `key`, creating the entry or extending it.
    pub fn append(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self
            .entries
            .iter_mut()
            .find(|(k, _)| k.eq_ignore_ascii_case(&key))
        {
            Some((_, values)) => values.push(value),
            None => self.entries.push((key, vec![value])),
        }
    }

    /// The first value under `key`, if any.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .and_then(|(_, values)| values.first())
            .map(String::as_str)
    }

    /// Every value under `key`, in arrival order. Empty when absent.
    pub fn get_all(&self, key: &str) -> &[String] {
        self.entries
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, values)| values.as_slice())
            .unwrap_or(&[])
    }

    /// Whether `key` is present.
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.iter().any(|(k, _)| k.eq_ignore_ascii_case(key))
    }

    /// Number of distinct keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no entry is present.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries
            .iter()
            .map(|(k, values)| (k.as_str(), values.as_slice()))
    }

    /// Keep only the entries for which `f` returns true.
    pub fn retain(&mut self, mut f: impl FnMut(&str, &[String]) -> bool) {
        self.entries.retain(|(k, values)| f(k, values));
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for FieldMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = FieldMap::new();
        for (k, v) in iter {
            map.append(k, v);
        }
        map
    }
}

/// One unit of a chunked body: data plus any `;name=value` extensions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Chunk {
    /// The chunk's data bytes.
    pub data: Vec<u8>,
    /// Chunk extensions, in arrival order.
    pub extensions: FieldMap,
}

/// A reconstructed message body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Body {
    /// No body.
    #[default]
    Empty,
    /// A body delivered as one logical unit (Content-Length framing, a
    /// close-terminated body, or a single extension-less chunk).
    Single(Vec<u8>),
    /// A chunked body whose structure is worth preserving: several
    /// chunks, or chunk extensions anywhere.
    Chunked(Vec<Chunk>),
}

impl Body {
    /// The body bytes: borrowed for [`Body::Single`] and [`Body::Empty`],
    /// concatenated in chunk order for [`Body::Chunked`] (extensions are
    /// ignored).
    pub fn data(&self) -> Cow<'_, [u8]> {
        match self {
            Body::Empty => Cow::Borrowed(&[]),
            Body::Single(bytes) => Cow::Borrowed(bytes),
            Body::Chunked(chunks) => {
                let mut out = Vec::new();
                for chunk in chunks {
                    out.extend_from_slice(&chunk.data);
                }
                Cow::Owned(out)
            }
        }
    }

    /// True for [`Body::Empty`].
    pub fn is_empty(&self) -> bool {
        matches!(self, Body::Empty)
    }
}

/// A reconstructed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// The method token, e.g. `GET`.
    pub method: String,
    /// The request target as it appeared on the wire.
    pub url: String,
    /// The protocol name, `HTTP`.
    pub protocol: String,
    /// The version, e.g. `1.1`.
    pub version: String,
    /// Headers (and trailers), multi-valued and insertion-ordered.
    pub headers: FieldMap,
    /// The body.
    pub body: Body,
}

impl Request {
    /// Convert the method token to [`http::Method`].
    pub fn http_method(&self) -> Option<http::Method> {
        http::Method::from_bytes(self.method.as_bytes()).ok()
    }

    /// Parse the target as [`http::Uri`].
    pub fn http_uri(&self) -> Option<http::Uri> {
        self.url.parse().ok()
    }

    /// Convert the headers to [`http::HeaderMap`], skipping entries that
    /// are not valid header names or values.
    pub fn http_headers(&self) -> http::HeaderMap {
        to_header_map(&self.headers)
    }

    /// Convert into an [`http::Request`] carrying the body bytes.
    ///
    /// Returns `None` when the method or target does not fit the `http`
    /// crate's stricter model.
    pub fn to_http(&self) -> Option<http::Request<Vec<u8>>> {
        let mut builder = http::Request::builder()
            .method(self.http_method()?)
            .uri(self.http_uri()?);
        if let Some(headers) = builder.headers_mut() {
            *headers = self.http_headers();
        }
        builder.body(self.body.data().into_owned()).ok()
    }
}

/// A reconstructed response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// The protocol name, `HTTP`.
    pub protocol: String,
    /// The version, e.g. `1.1`.
    pub version: String,
    /// The reason phrase, e.g. `OK`. The numeric status code is
    /// observable on the parser, not part of the reconstructed value.
    pub status: String,
    /// Headers (and trailers), multi-valued and insertion-ordered.
    pub headers: FieldMap,
    /// The body.
    pub body: Body,
}

impl Response {
    /// Convert the headers to [`http::HeaderMap`], skipping entries that
    /// are not valid header names or values.
    pub fn http_headers(&self) -> http::HeaderMap {
        to_header_map(&self.headers)
    }
}

fn to_header_map(fields: &FieldMap) -> http::HeaderMap {
    let mut map = http::HeaderMap::new();
    for (key, values) in fields.iter() {
        let Ok(name) = http::header::HeaderName::from_bytes(key.as_bytes()) else {
            continue;
        };
        for value in values {
            if let Ok(value) = http::HeaderValue::from_str(value) {
                map.append(name.clone(), value);
            }
        }
    }
    map
}

/// A reconstructed message of either kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// A request.
    Request(Request),
    /// A response.
    Response(Response),
}

impl Message {
    /// True for requests.
    pub fn is_request(&self) -> bool {
        matches!(self, Message::Request(_))
    }

    /// True for responses.
    pub fn is_response(&self) -> bool {
        matches!(self, Message::Response(_))
    }

    /// The method token, or `None` for responses.
    pub fn method(&self) -> Option<&str> {
        match self {
            Message::Request(r) => Some(&r.method),
            Message::Response(_) => None,
        }
    }

    /// The request target, or `None` for responses.
    pub fn url(&self) -> Option<&str> {
        match self {
            Message::Request(r) => Some(&r.url),
            Message::Response(_) => None,
        }
    }

    /// The reason phrase, or `None` for requests.
    pub fn status(&self) -> Option<&str> {
        match self {
            Message::Request(_) => None,
            Message::Response(r) => Some(&r.status),
        }
    }

    /// The protocol name.
    pub fn protocol(&self) -> &str {
        match self {
            Message::Request(r) => &r.protocol,
            Message::Response(r) => &r.protocol,
        }
    }

    /// The version.
    pub fn version(&self) -> &str {
        match self {
            Message::Request(r) => &r.version,
            Message::Response(r) => &r.version,
        }
    }

    /// The headers.
    pub fn headers(&self) -> &FieldMap {
        match self {
            Message::Request(r) => &r.headers,
            Message::Response(r) => &r.headers,
        }
    }

    /// The body.
    pub fn body(&self) -> &Body {
        match self {
            Message::Request(r) => &r.body,
            Message::Response(r) => &r.body,
        }
    }

    /// Borrow as a request.
    pub fn as_request(&self) -> Option<&Request> {
        match self {
            Message::Request(r) => Some(r),
            Message::Response(_) => None,
        }
    }

    /// Borrow as a response.
    pub fn as_response(&self) -> Option<&Response> {
        match self {
            Message::Request(_) => None,
            Message::Response(r) => Some(r),
        }
    }

    /// Consume into a request.
    pub fn into_request(self) -> Option<Request> {
        match self {
            Message::Request(r) => Some(r),
            Message::Response(_) => None,
        }
    }

    /// Consume into a response.
    pub fn into_response(self) -> Option<Response> {
        match self {
            Message::Request(_) => None,
            Message::Response(r) => Some(r),
        }
    }
}
