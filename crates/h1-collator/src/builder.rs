//! Reassembly of parse events into message values.
//!
//! [`MessageBuilder`] accumulates payload fragments into logical field
//! groups, seals a group whenever the matching completion signal fires,
//! and materializes a [`Message`] at message-complete. It owns copies of
//! every byte it keeps; the borrowed fragments from the parser never
//! outlive the callback that delivered them.

use h1parse::{Mode, PayloadKind, Signal};

use crate::message::{Body, Chunk, FieldMap, Message, Request, Response};

/// A sequence of completed byte groups plus one in-progress tail group.
/// Fragments append to the tail; sealing starts a fresh tail, so "the
/// next fragment begins a new logical field".
#[derive(Debug, Clone)]
struct Groups {
    items: Vec<Vec<u8>>,
}

impl Default for Groups {
    fn default() -> Self {
        Self {
            items: vec![Vec::new()],
        }
    }
}

impl Groups {
    fn push(&mut self, bytes: &[u8]) {
        if let Some(tail) = self.items.last_mut() {
            tail.extend_from_slice(bytes);
        }
    }

    fn seal(&mut self) {
        self.items.push(Vec::new());
    }

    /// The sealed groups; the in-progress tail is excluded.
    fn completed(&self) -> &[Vec<u8>] {
        &self.items[..self.items.len() - 1]
    }

    /// First sealed group, required non-empty.
    fn first_non_empty(&self) -> Option<&[u8]> {
        self.completed()
            .first()
            .filter(|g| !g.is_empty())
            .map(Vec::as_slice)
    }
}

/// Accumulator for one chunk: its data plus extension name/value groups.
#[derive(Debug, Clone, Default)]
struct ChunkSlot {
    data: Vec<u8>,
    ext_names: Groups,
    ext_values: Groups,
}

impl ChunkSlot {
    fn is_empty(&self) -> bool {
        self.data.is_empty() && self.ext_names.completed().is_empty()
    }

    fn into_chunk(self) -> Chunk {
        Chunk {
            data: self.data,
            extensions: pair_fields(&self.ext_names, &self.ext_values),
        }
    }
}

/// Stateful reassembler of parse events into [`Message`] values.
///
/// Feed it through the event callbacks ([`push`](Self::push) for payload
/// fragments, [`observe`](Self::observe) for signals) and collect the
/// built message from [`complete`](Self::complete) at message-complete.
#[derive(Debug, Clone)]
pub struct MessageBuilder {
    /// Mode detected from event order; `Auto` until the first method or
    /// protocol fragment disambiguates.
    detected: Mode,
    method: Groups,
    url: Groups,
    protocol: Groups,
    version: Groups,
    status: Groups,
    header_fields: Groups,
    header_values: Groups,
    chunks: Vec<ChunkSlot>,
}

impl Default for MessageBuilder {
    fn default() -> Self {
        Self {
            detected: Mode::Auto,
            method: Groups::default(),
            url: Groups::default(),
            protocol: Groups::default(),
            version: Groups::default(),
            status: Groups::default(),
            header_fields: Groups::default(),
            header_values: Groups::default(),
            chunks: vec![ChunkSlot::default()],
        }
    }
}

impl MessageBuilder {
    /// An empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a payload fragment to the in-progress group of its kind.
    pub fn push(&mut self, kind: PayloadKind, bytes: &[u8]) {
        match kind {
            PayloadKind::Method => {
                // Requests lead with the method; responses lead with the
                // protocol. Whichever arrives first resolves the mode.
                if self.detected == Mode::Auto {
                    self.detected = Mode::Request;
                }
                self.method.push(bytes);
            }
            PayloadKind::Url => self.url.push(bytes),
            PayloadKind::Protocol => {
                if self.detected == Mode::Auto {
                    self.detected = Mode::Response;
                }
                self.protocol.push(bytes);
            }
            PayloadKind::Version => self.version.push(bytes),
            PayloadKind::Status => self.status.push(bytes),
            PayloadKind::HeaderField => self.header_fields.push(bytes),
            PayloadKind::HeaderValue => self.header_values.push(bytes),
            PayloadKind::Body => self.current_chunk().data.extend_from_slice(bytes),
            PayloadKind::ChunkExtensionName => self.current_chunk().ext_names.push(bytes),
            PayloadKind::ChunkExtensionValue => self.current_chunk().ext_values.push(bytes),
        }
    }

    /// React to a boundary signal: seal the matching group, advance the
    /// chunk sequence, or discard on reset. Message-complete is handled
    /// by [`complete`](Self::complete).
    pub fn observe(&mut self, signal: Signal) {
        match signal {
            Signal::MethodComplete => self.method.seal(),
            Signal::UrlComplete => self.url.seal(),
            Signal::ProtocolComplete => self.protocol.seal(),
            Signal::VersionComplete => self.version.seal(),
            Signal::StatusComplete => self.status.seal(),
            Signal::HeaderFieldComplete => self.header_fields.seal(),
            Signal::HeaderValueComplete => self.header_values.seal(),
            Signal::ChunkExtensionNameComplete => self.current_chunk().ext_names.seal(),
            Signal::ChunkExtensionValueComplete => self.current_chunk().ext_values.seal(),
            Signal::ChunkComplete => self.chunks.push(ChunkSlot::default()),
            Signal::Reset => self.discard(),
            Signal::MessageBegin | Signal::MessageComplete | Signal::ChunkHeader => {}
        }
    }

    /// Drop all accumulated state.
    pub fn discard(&mut self) {
        *self = MessageBuilder::default();
    }

    /// Attempt to construct a message of the wanted kind from the
    /// accumulated groups, then start over for the next message.
    ///
    /// `want` narrows what is acceptable: [`Mode::Request`] and
    /// [`Mode::Response`] demand that kind, [`Mode::Auto`] takes either.
    /// Returns `None` when the detected kind does not match or a
    /// required field is missing.
    pub fn complete(&mut self, want: Mode) -> Option<Message> {
        let builder = std::mem::take(self);
        match builder.detected {
            Mode::Request if want != Mode::Response => builder.into_request().map(Message::Request),
            Mode::Response if want != Mode::Request => {
                builder.into_response().map(Message::Response)
            }
            _ => None,
        }
    }

    fn current_chunk(&mut self) -> &mut ChunkSlot {
        // The slot vector always holds at least the sentinel slot.
        if self.chunks.is_empty() {
            self.chunks.push(ChunkSlot::default());
        }
        self.chunks.last_mut().expect("chunk slot always present")
    }

    fn into_request(self) -> Option<Request> {
        let method = decode(self.method.first_non_empty()?);
        let url = decode(self.url.first_non_empty()?);
        let protocol = decode(self.protocol.first_non_empty()?);
        let version = decode(self.version.first_non_empty()?);
        let headers = pair_fields(&self.header_fields, &self.header_values);
        let body = materialize_body(self.chunks);
        Some(Request {
            method,
            url,
            protocol,
            version,
            headers,
            body,
        })
    }

    fn into_response(self) -> Option<Response> {
        let protocol = decode(self.protocol.first_non_empty()?);
        let version = decode(self.version.first_non_empty()?);
        let status = decode(self.status.first_non_empty()?);
        let headers = pair_fields(&self.header_fields, &self.header_values);
        let body = materialize_body(self.chunks);
        Some(Response {
            protocol,
            version,
            status,
            headers,
            body,
        })
    }
}

fn decode(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

/// Pair the n-th completed name group with the n-th completed value
/// group, dropping entries whose key and values are all empty.
fn pair_fields(names: &Groups, values: &Groups) -> FieldMap {
    let empty = Vec::new();
    let mut map = FieldMap::new();
    for (i, name) in names.completed().iter().enumerate() {
        let value = values.completed().get(i).unwrap_or(&empty);
        map.append(decode(name), decode(value));
    }
    map.retain(|key, values| !(key.is_empty() && values.iter().all(String::is_empty)));
    map
}

/// Classify the accumulated chunk slots into a [`Body`].
fn materialize_body(slots: Vec<ChunkSlot>) -> Body {
    let occupied: Vec<ChunkSlot> = slots.into_iter().filter(|s| !s.is_empty()).collect();
    if occupied.is_empty() {
        return Body::Empty;
    }
    let any_extensions = occupied
        .iter()
        .any(|s| !s.ext_names.completed().is_empty());
    if occupied.len() == 1 && !any_extensions {
        let mut only = occupied;
        return Body::Single(only.remove(0).data);
    }
    Body::Chunked(occupied.into_iter().map(ChunkSlot::into_chunk).collect())
}
