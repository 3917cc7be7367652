// SPDX-License-Identifier: Apache-2.0

//! An incremental, asynchronous JSON decoder fed by arbitrary byte chunks.
//!
//! [`channel`] returns a [`Writer`] and a [`Reader`] around one decoder.
//! The writer accepts raw bytes in whatever chunks the caller happens to
//! have; the reader yields each completed top-level value the moment its
//! closing byte has been consumed. Chunk boundaries carry no meaning: a
//! value can split across any number of feeds, including inside a number,
//! a string, a `\uXXXX` escape, or the literal `true`.
//!
//! Multiple top-level values may be concatenated on one stream; they come
//! out of the reader in the order they completed. Decoding errors are
//! terminal: the first one latches, surfaces on the reader, and repeats on
//! every later poll.
//!
//! ```
//! use strompy::{channel, JsonValue};
//!
//! futures::executor::block_on(async {
//!     let (mut writer, mut reader) = channel();
//!     // Any split works, even mid-token.
//!     writer.feed_bytes(br#"{"temp"#).await.unwrap();
//!     writer.feed_bytes(br#"erature": 21.5}"#).await.unwrap();
//!     writer.close();
//!
//!     let value = reader.poll_next().await.unwrap().unwrap();
//!     assert_eq!(
//!         value.get("temperature").and_then(JsonValue::as_f64),
//!         Some(21.5)
//!     );
//!     assert!(reader.poll_next().await.is_none());
//! });
//! ```
//!
//! Internally the decoder is three layers, each oblivious to chunking:
//! a byte buffer with a consumption cursor, a tokenizer that keeps
//! partial-token state across feeds, and a non-recursive parser whose
//! explicit frame stack is bounded by a configurable depth limit.

mod byte_buffer;
mod channel;
mod escape;
mod number;
mod parse_error;
mod parser;
mod tokenizer;
mod value;

pub use channel::{
    channel, channel_with, ChannelConfig, FeedError, Reader, Writer, DEFAULT_MAX_DEPTH,
};
pub use number::JsonNumber;
pub use parse_error::ParseError;
pub use tokenizer::{LexError, Token};
pub use value::JsonValue;
