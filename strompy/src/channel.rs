// SPDX-License-Identifier: Apache-2.0

//! The writer/reader channel around one decoder instance.
//!
//! [`channel`] pairs a [`Writer`] that accepts byte chunks with a [`Reader`]
//! that yields completed values. One mutex-guarded core holds the byte
//! buffer, tokenizer, parser, and output queue; two wakers connect the
//! sides. The mutex is only ever held for a non-blocking pump of the state
//! machines, never across a suspension point.
//!
//! The design assumes a single feeder and a single poller. Both handles are
//! `Send` but neither is `Clone`; calls go through `&mut self`, so the
//! compiler enforces that discipline.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::Poll;

use futures::future::poll_fn;
use futures::task::AtomicWaker;
use log::{debug, trace};

use crate::byte_buffer::ByteBuffer;
use crate::parse_error::ParseError;
use crate::parser::Parser;
use crate::tokenizer::{Token, Tokenizer};
use crate::value::JsonValue;

/// Default nesting depth limit.
pub const DEFAULT_MAX_DEPTH: usize = 512;

/// Channel construction options.
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    /// Maximum container nesting depth before the decoder fails.
    pub max_depth: usize,
    /// Output queue capacity. `None` means unbounded; with `Some(n)` a full
    /// queue suspends the writer until the reader drains a slot.
    pub queue_capacity: Option<usize>,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            queue_capacity: None,
        }
    }
}

/// Errors surfaced on the feeding side.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedError {
    /// The channel no longer accepts bytes: the writer closed, the reader
    /// was dropped, or a fatal parse error latched.
    Closed,
}

impl core::fmt::Display for FeedError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            FeedError::Closed => write!(f, "channel is closed"),
        }
    }
}

impl std::error::Error for FeedError {}

/// Everything both handles share under the lock.
struct Core {
    buffer: ByteBuffer,
    tokenizer: Tokenizer,
    parser: Parser,
    queue: VecDeque<JsonValue>,
    capacity: Option<usize>,
    /// Writer declared end of input.
    closed: bool,
    /// Clean `EndOfInput` consumed; nothing further will be produced.
    finished: bool,
    /// Latched terminal error, re-delivered on every later poll.
    failed: Option<ParseError>,
    reader_gone: bool,
}

impl Core {
    fn queue_full(&self) -> bool {
        self.capacity
            .is_some_and(|capacity| self.queue.len() >= capacity)
    }

    /// Pump tokenizer and parser until the buffered bytes are exhausted,
    /// the queue has no room, or the stream reaches a terminal state.
    fn drive(&mut self) {
        if self.failed.is_some() || self.finished {
            return;
        }
        loop {
            if self.queue_full() {
                return;
            }
            match self.tokenizer.next_token(&mut self.buffer, self.closed) {
                Ok(None) => {
                    self.buffer.compact();
                    return;
                }
                Ok(Some(Token::EndOfInput)) => {
                    match self.parser.push_token(Token::EndOfInput) {
                        Ok(_) => {
                            trace!("stream finished cleanly");
                            self.finished = true;
                        }
                        Err(err) => self.fail(err),
                    }
                    return;
                }
                Ok(Some(token)) => match self.parser.push_token(token) {
                    Ok(Some(value)) => self.queue.push_back(value),
                    Ok(None) => {}
                    Err(err) => {
                        self.fail(err);
                        return;
                    }
                },
                Err(err) => {
                    self.fail(err.into());
                    return;
                }
            }
        }
    }

    /// Latch a terminal error and discard the in-flight state; already
    /// completed values stay queued and are delivered first.
    fn fail(&mut self, err: ParseError) {
        debug!("stream failed: {err}");
        self.failed = Some(err);
        self.buffer.clear();
    }
}

struct Shared {
    core: Mutex<Core>,
    read_waker: AtomicWaker,
    write_waker: AtomicWaker,
}

fn lock(shared: &Shared) -> MutexGuard<'_, Core> {
    // A panic while holding the lock leaves consistent-enough state to
    // report closure; don't propagate the poison.
    shared.core.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Feeding half of the channel. Dropping it is an implicit [`Writer::close`].
pub struct Writer {
    shared: Arc<Shared>,
}

/// Polling half of the channel. Dropping it permanently closes the feed
/// side; subsequent feeds fail fast with [`FeedError::Closed`].
pub struct Reader {
    shared: Arc<Shared>,
}

/// Create a channel with default configuration.
pub fn channel() -> (Writer, Reader) {
    channel_with(ChannelConfig::default())
}

/// Create a channel with explicit configuration.
pub fn channel_with(config: ChannelConfig) -> (Writer, Reader) {
    let core = Core {
        buffer: ByteBuffer::new(),
        tokenizer: Tokenizer::new(),
        parser: Parser::new(config.max_depth),
        queue: VecDeque::new(),
        // A zero capacity could never make progress; round it up.
        capacity: config.queue_capacity.map(|capacity| capacity.max(1)),
        closed: false,
        finished: false,
        failed: None,
        reader_gone: false,
    };
    let shared = Arc::new(Shared {
        core: Mutex::new(core),
        read_waker: AtomicWaker::new(),
        write_waker: AtomicWaker::new(),
    });
    (
        Writer {
            shared: Arc::clone(&shared),
        },
        Reader { shared },
    )
}

impl Writer {
    /// Feed one chunk of bytes and decode as far as they allow.
    ///
    /// Chunk boundaries carry no meaning; any split of the byte stream
    /// decodes identically. Completed values are queued for the reader as
    /// their closing bytes are consumed, so a single call can complete
    /// zero, one, or many values.
    ///
    /// With a bounded queue this suspends while the queue is full and
    /// undecoded bytes remain, resuming when the reader drains a slot.
    /// After [`Writer::close`], a fatal decode error, or a dropped reader
    /// this fails fast with [`FeedError::Closed`]. A parse error uncovered
    /// by this very chunk does not fail the feed: it surfaces on the
    /// reader side.
    pub async fn feed_bytes(&mut self, chunk: &[u8]) -> Result<(), FeedError> {
        let mut appended = false;
        poll_fn(|cx| {
            let mut core = lock(&self.shared);
            if core.reader_gone || core.closed {
                return Poll::Ready(Err(FeedError::Closed));
            }
            if !appended {
                if core.failed.is_some() {
                    return Poll::Ready(Err(FeedError::Closed));
                }
                trace!("feeding {} bytes", chunk.len());
                core.buffer.append(chunk);
                appended = true;
            }
            let before = core.queue.len();
            core.drive();
            let produced = core.queue.len() > before || core.failed.is_some();
            if core.queue_full() && !core.buffer.is_empty() && core.failed.is_none() {
                // Registered under the lock: the reader wakes us only
                // after its own pop, so the wakeup cannot be lost.
                self.shared.write_waker.register(cx.waker());
                drop(core);
                self.shared.read_waker.wake();
                return Poll::Pending;
            }
            drop(core);
            if produced {
                self.shared.read_waker.wake();
            }
            Poll::Ready(Ok(()))
        })
        .await
    }

    /// Declare that no further bytes will arrive.
    ///
    /// A trailing top-level value that only end-of-input can complete (a
    /// bare number, for instance) is finalized here. An incomplete token or
    /// open container becomes [`ParseError::UnexpectedEndOfInput`] on the
    /// next poll. Idempotent.
    pub fn close(&mut self) {
        let mut core = lock(&self.shared);
        if core.closed {
            return;
        }
        core.closed = true;
        core.drive();
        drop(core);
        self.shared.read_waker.wake();
    }
}

impl Drop for Writer {
    fn drop(&mut self) {
        let mut core = lock(&self.shared);
        if !core.closed {
            core.closed = true;
            core.drive();
        }
        drop(core);
        self.shared.read_waker.wake();
    }
}

impl Reader {
    /// Wait for the next completed value.
    ///
    /// Values arrive in the exact order their closing bytes were consumed.
    /// Returns `None` once the writer has closed and the queue is drained.
    /// After a fatal error, every call returns that same error; values
    /// completed before the error are delivered first.
    pub async fn poll_next(&mut self) -> Option<Result<JsonValue, ParseError>> {
        poll_fn(|cx| {
            let mut core = lock(&self.shared);
            if core.closed && !core.finished && core.failed.is_none() {
                // Close-time work that a full queue deferred.
                core.drive();
            }
            if let Some(value) = core.queue.pop_front() {
                drop(core);
                self.shared.write_waker.wake();
                return Poll::Ready(Some(Ok(value)));
            }
            if let Some(err) = core.failed.clone() {
                return Poll::Ready(Some(Err(err)));
            }
            if core.finished {
                return Poll::Ready(None);
            }
            self.shared.read_waker.register(cx.waker());
            Poll::Pending
        })
        .await
    }
}

impl Drop for Reader {
    fn drop(&mut self) {
        let mut core = lock(&self.shared);
        core.reader_gone = true;
        // Nobody will consume these; release the memory now.
        core.queue.clear();
        core.buffer.clear();
        drop(core);
        self.shared.write_waker.wake();
    }
}
