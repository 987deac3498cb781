#![warn(missing_docs)]
//! Collates `h1parse` events into complete HTTP/1.x messages.
//!
//! Where `h1parse` hands out borrowed fragments and boundary signals,
//! this crate reassembles them into owned [`Request`] / [`Response`]
//! values with multi-valued headers and classified bodies, maintaining
//! state across arbitrarily fragmented input.
//!
//! # Key types
//!
//! - [`MessageCollator`] — single-stream driver. Feed bytes with
//!   [`parse()`](MessageCollator::parse) and take completed messages as
//!   the returned batch or via [`try_pop()`](MessageCollator::try_pop).
//! - [`SessionCache`] — thread-safe cache of many collators keyed by an
//!   arbitrary `K`, for proxies tracking many connections.
//! - [`Message`] / [`Request`] / [`Response`] / [`Body`] / [`Chunk`] —
//!   the reconstructed value model.
//!
//! # Examples
//!
//! ## Single stream
//!
//! ```
//! use h1_collator::MessageCollator;
//! use h1parse::Mode;
//!
//! let mut collator = MessageCollator::new(Mode::Auto);
//! // Fragment boundaries are arbitrary.
//! assert!(collator.parse(b"HTTP/1.1 200 OK\r\nContent-").unwrap().is_empty());
//! let messages = collator.parse(b"Length: 2\r\n\r\nhi").unwrap();
//! assert_eq!(messages[0].status(), Some("OK"));
//! assert_eq!(messages[0].body().data().as_ref(), b"hi");
//! ```
//!
//! ## Many connections
//!
//! ```
//! use h1_collator::SessionCache;
//! use h1parse::Mode;
//!
//! let cache = SessionCache::<u64>::new(Mode::Request);
//! let messages = cache.parse(42, b"GET / HTTP/1.1\r\n\r\n").unwrap();
//! assert_eq!(messages[0].method(), Some("GET"));
//! ```

mod builder;
mod collator;
mod message;


use std::hash::Hash;
use std::sync::Mutex;

use dashmap::DashMap;

pub use builder::MessageBuilder;
pub use collator::{MessageAction, MessageCollator};
pub use h1parse::{Error, ErrorCode, LenientFlags, Mode};
pub use message::{Body, Chunk, FieldMap, Message, Request, Response};

/// Thread-safe cache of per-connection collators with generic keys.
///
/// Uses `DashMap<K, Mutex<MessageCollator>>` for per-key serialization:
/// the map's shard lock is held only to look up or insert the entry,
/// while the per-key mutex serializes concurrent same-key calls to
/// `parse()`. A single collator is never driven from two threads at
/// once.
pub struct SessionCache<K> {
    connections: DashMap<K, Mutex<MessageCollator>>,
    mode: Mode,
}

impl<K: Hash + Eq + Clone> SessionCache<K> {
    /// Create a cache whose collators parse the given traffic kind.
    pub fn new(mode: Mode) -> Self {
        Self {
            connections: DashMap::new(),
            mode,
        }
    }

    /// Parse a fragment for the connection `key`, creating state for it
    /// on first use. Returns the messages completed by this fragment —
    /// an empty batch just means no message finished yet.
    pub fn parse(&self, key: K, data: &[u8]) -> Result<Vec<Message>, Error> {
        let mode = self.mode;
        // Atomic insert-if-absent
        self.connections
            .entry(key.clone())
            .or_insert_with(|| Mutex::new(MessageCollator::new(mode)));

        let entry = self.connections.get(&key).expect("entry was just ensured");
        let mut collator = entry.lock().unwrap_or_else(|e| e.into_inner());
        collator.parse(data)
    }

    /// Declare end-of-stream for `key`, committing a close-terminated
    /// message if one was in flight. Unknown keys yield an empty batch.
    pub fn finish(&self, key: &K) -> Result<Vec<Message>, Error> {
        match self.connections.get(key) {
            Some(entry) => {
                let mut collator = entry.lock().unwrap_or_else(|e| e.into_inner());
                collator.finish()
            }
            None => Ok(Vec::new()),
        }
    }

    /// Remove connection state (call when the connection closes).
    pub fn remove(&self, key: &K) -> Option<MessageCollator> {
        self.connections
            .remove(key)
            .map(|(_, mutex)| mutex.into_inner().unwrap_or_else(|e| e.into_inner()))
    }

    /// Whether state exists for `key`.
    pub fn contains(&self, key: &K) -> bool {
        self.connections.contains_key(key)
    }

    /// Number of tracked connections.
    pub fn len(&self) -> usize {
        self.connections.len()
    }

    /// True when no connection is tracked.
    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}

impl<K: Hash + Eq + Clone> Default for SessionCache<K> {
    fn default() -> Self {
        Self::new(Mode::Auto)
    }
}
