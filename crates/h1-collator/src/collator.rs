//! The message collator: parser + builder + completed-message queue.

use std::collections::VecDeque;

use h1parse::{
    Error,
    Handler,
    HeadersAction,
    Mode,
    Parser,
    ParserState,
    PayloadAction,
    PayloadKind,
    Signal,
    SignalAction,
};

use crate::builder::MessageBuilder;
use crate::message::Message;

/// What a message handler asks the collator to do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MessageAction {
    /// Keep collating.
    #[default]
    Proceed,
    /// Suspend after this message; the next
    /// [`parse`](MessageCollator::parse) surfaces `HPE_PAUSED`.
    Pause,
    /// Fail with `HPE_CB_MESSAGE_COMPLETE`.
    Error,
}

type MessageFn = Box<dyn FnMut(&Message) -> MessageAction + Send>;

/// The event-side half of the collator: owns the builder and the queue
/// so it can be borrowed as a [`Handler`] while the parser runs.
#[derive(Default)]
struct Assembly {
    builder: MessageBuilder,
    want: Mode,
    completed: VecDeque<Message>,
    handler: Option<MessageFn>,
}

impl Handler for Assembly {
    fn on_signal(&mut self, signal: Signal) -> SignalAction {
        if signal == Signal::MessageComplete {
            if let Some(message) = self.builder.complete(self.want) {
                let action = match &mut self.handler {
                    Some(f) => f(&message),
                    None => MessageAction::Proceed,
                };
                self.completed.push_back(message);
                return match action {
                    MessageAction::Proceed => SignalAction::Proceed,
                    MessageAction::Pause => SignalAction::Pause,
                    MessageAction::Error => SignalAction::Error,
                };
            }
            return SignalAction::Proceed;
        }
        self.builder.observe(signal);
        SignalAction::Proceed
    }

    fn on_payload(&mut self, kind: PayloadKind, bytes: &[u8]) -> PayloadAction {
        self.builder.push(kind, bytes);
        PayloadAction::Proceed
    }

    fn on_headers_complete(&mut self, _state: &ParserState) -> HeadersAction {
        HeadersAction::Proceed
    }
}

/// Drives a [`Parser`] and a [`MessageBuilder`] together, turning a byte
/// stream into complete [`Message`] values.
///
/// Completed messages can be taken as a batch from the result of
/// [`parse`](Self::parse) or streamed through [`try_pop`](Self::try_pop).
/// Unconsumed bytes are buffered internally across pauses, so callers
/// never track a remainder themselves.
///
/// ```
/// use h1_collator::MessageCollator;
/// use h1parse::Mode;
///
/// let mut collator = MessageCollator::new(Mode::Request);
/// let messages = collator.parse(b"GET / HTTP/1.1\r\n\r\n").unwrap();
/// assert_eq!(messages.len(), 1);
/// assert_eq!(messages[0].method(), Some("GET"));
/// ```
pub struct MessageCollator {
    parser: Parser,
    assembly: Assembly,
    buffer: Vec<u8>,
}

impl MessageCollator {
    /// Create a collator for the given traffic kind. [`Mode::Auto`]
    /// accepts either kind per message.
    pub fn new(mode: Mode) -> Self {
        Self {
            parser: Parser::new(mode),
            assembly: Assembly {
                want: mode,
                ..Assembly::default()
            },
            buffer: Vec::new(),
        }
    }

    /// Install a handler invoked synchronously for each completed
    /// message, before it is returned to the caller.
    pub fn set_message_handler(
        &mut self,
        handler: impl FnMut(&Message) -> MessageAction + Send + 'static,
    ) {
        self.assembly.handler = Some(Box::new(handler));
    }

    /// Feed a fragment and collect every message completed by it.
    ///
    /// A pause raised during the call (from the message handler or a
    /// signal handler on the underlying parser) still returns the
    /// messages completed so far; the *next* call surfaces the pause
    /// error. Data left unconsumed by a pause is buffered and replayed
    /// after [`Parser::resume`].
    pub fn parse(&mut self, data: &[u8]) -> Result<Vec<Message>, Error> {
        self.buffer.extend_from_slice(data);
        if let Some(err) = self.parser.last_error() {
            return Err(err.clone());
        }
        let before = self.parser.bytes_parsed();
        let result = self.parser.parse(&mut self.assembly, &self.buffer);
        let consumed = (self.parser.bytes_parsed() - before) as usize;
        self.buffer.drain(..consumed);
        match result {
            Ok(_) => Ok(self.drain_completed()),
            Err(err) if err.is_pause() => Ok(self.drain_completed()),
            Err(err) => Err(err),
        }
    }

    /// Declare end-of-stream, committing a read-until-close message if
    /// headers had completed and the body was close-terminated.
    pub fn finish(&mut self) -> Result<Vec<Message>, Error> {
        if let Some(err) = self.parser.last_error() {
            return Err(err.clone());
        }
        match self.parser.finish(&mut self.assembly) {
            Ok(()) => Ok(self.drain_completed()),
            Err(err) if err.is_pause() => Ok(self.drain_completed()),
            Err(err) => Err(err),
        }
    }

    /// Pop one completed message, oldest first. Messages survive here
    /// when [`parse`](Self::parse) returned an error after completing
    /// some of them.
    pub fn try_pop(&mut self) -> Option<Message> {
        self.assembly.completed.pop_front()
    }

    /// Whether completed messages are waiting to be popped.
    pub fn has_completed(&self) -> bool {
        !self.assembly.completed.is_empty()
    }

    /// The underlying parser, for observable state.
    pub fn parser(&self) -> &Parser {
        &self.parser
    }

    /// The underlying parser, for advanced configuration: lenient
    /// flags, pause/resume, upgrade resumption.
    pub fn parser_mut(&mut self) -> &mut Parser {
        &mut self.parser
    }

    /// Restart from scratch: parser registers, builder state, buffered
    /// bytes, and queued messages. Lenient flags and the message
    /// handler survive.
    pub fn reset(&mut self) {
        self.parser.reset();
        self.assembly.builder.discard();
        self.assembly.completed.clear();
        self.buffer.clear();
    }

    /// Bytes buffered but not yet consumed (non-empty only while
    /// suspended mid-stream).
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    fn drain_completed(&mut self) -> Vec<Message> {
        self.assembly.completed.drain(..).collect()
    }
}

impl std::fmt::Debug for MessageCollator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageCollator")
            .field("parser", &self.parser)
            .field("buffered", &self.buffer.len())
            .field("queued", &self.assembly.completed.len())
            .finish_non_exhaustive()
    }
}
