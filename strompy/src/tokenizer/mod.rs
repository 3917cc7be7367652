// SPDX-License-Identifier: Apache-2.0

//! Incremental JSON tokenizer.
//!
//! Consumes bytes from a [`ByteBuffer`] one at a time and produces complete
//! [`Token`]s. All partial-token state (string escape progress, number
//! sub-state, literal letter progress) lives in the tokenizer, so a feed
//! boundary can fall anywhere: mid-string, mid-escape, mid-number, or in
//! the middle of `true`.
//!
//! `Ok(None)` from [`Tokenizer::next_token`] means "need more input" and is
//! the normal outcome when the buffer runs dry mid-token. It is never an
//! error and the tokenizer never blocks waiting for bytes.

use log::trace;

use crate::byte_buffer::ByteBuffer;
use crate::escape;
use crate::number::JsonNumber;

/// The smallest lexical unit the parser consumes: punctuation, or a
/// fully-decoded scalar.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    ObjectStart,
    ObjectEnd,
    ArrayStart,
    ArrayEnd,
    Colon,
    Comma,
    String(String),
    Number(JsonNumber),
    Bool(bool),
    Null,
    /// Emitted exactly once, after the writer has closed and every buffered
    /// byte has been consumed.
    EndOfInput,
}

impl Token {
    /// Short human-readable name, used in error messages.
    pub(crate) fn describe(&self) -> &'static str {
        match self {
            Token::ObjectStart => "'{'",
            Token::ObjectEnd => "'}'",
            Token::ArrayStart => "'['",
            Token::ArrayEnd => "']'",
            Token::Colon => "':'",
            Token::Comma => "','",
            Token::String(_) => "a string",
            Token::Number(_) => "a number",
            Token::Bool(_) => "a boolean",
            Token::Null => "null",
            Token::EndOfInput => "end of input",
        }
    }
}

/// Errors produced while turning bytes into tokens. Positions are absolute
/// offsets into the byte stream, stable across feeds and compactions.
#[derive(Debug, Clone, PartialEq)]
pub enum LexError {
    /// A byte that cannot start or continue any token.
    UnexpectedByte { byte: u8, position: usize },
    /// A control character (< 0x20) inside a string without an escape.
    UnescapedControl { byte: u8, position: usize },
    /// A backslash followed by something that is not an escape.
    InvalidEscape { byte: u8, position: usize },
    /// A non-hex byte inside a `\uXXXX` sequence.
    InvalidUnicodeEscape { byte: u8, position: usize },
    /// A lone or mismatched UTF-16 surrogate, or an unencodable codepoint.
    InvalidUnicodeCodepoint { position: usize },
    /// A byte sequence that violates the JSON number grammar.
    InvalidNumber { byte: u8, position: usize },
    /// String content that is not valid UTF-8.
    InvalidUtf8 { position: usize },
    /// The stream was closed in the middle of a token.
    UnexpectedEndOfInput { position: usize },
}

impl core::fmt::Display for LexError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            LexError::UnexpectedByte { byte, position } => {
                write!(f, "unexpected byte {:?} at {}", *byte as char, position)
            }
            LexError::UnescapedControl { byte, position } => {
                write!(f, "unescaped control character 0x{byte:02x} at {position}")
            }
            LexError::InvalidEscape { byte, position } => {
                write!(f, "invalid escape '\\{}' at {}", *byte as char, position)
            }
            LexError::InvalidUnicodeEscape { byte, position } => {
                write!(
                    f,
                    "invalid hex digit {:?} in unicode escape at {}",
                    *byte as char, position
                )
            }
            LexError::InvalidUnicodeCodepoint { position } => {
                write!(f, "invalid unicode codepoint at {position}")
            }
            LexError::InvalidNumber { byte, position } => {
                write!(f, "malformed number near {:?} at {}", *byte as char, position)
            }
            LexError::InvalidUtf8 { position } => {
                write!(f, "string is not valid UTF-8 at {position}")
            }
            LexError::UnexpectedEndOfInput { position } => {
                write!(f, "unexpected end of input at {position}")
            }
        }
    }
}

impl std::error::Error for LexError {}

/// Escape progress inside a string.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Escape {
    None,
    /// Saw a backslash; the escape character is next.
    Start,
    /// Collecting the four hex digits of `\uXXXX`.
    Unicode { acc: u32, seen: u8 },
}

/// In-progress string: decoded bytes so far, escape state, and a pending
/// high surrogate awaiting its low half.
#[derive(Debug)]
struct StringState {
    buf: Vec<u8>,
    escape: Escape,
    high_surrogate: Option<u32>,
}

impl StringState {
    fn new() -> Self {
        Self {
            buf: Vec::new(),
            escape: Escape::None,
            high_surrogate: None,
        }
    }

    /// Feed one byte. Returns the decoded content when the closing quote
    /// is consumed.
    fn push(&mut self, byte: u8, position: usize) -> Result<Option<Vec<u8>>, LexError> {
        match self.escape {
            Escape::None => {
                // A pending high surrogate must be followed by its low
                // half immediately.
                if self.high_surrogate.is_some() && byte != b'\\' {
                    return Err(LexError::InvalidUnicodeCodepoint { position });
                }
                match byte {
                    b'"' => Ok(Some(core::mem::take(&mut self.buf))),
                    b'\\' => {
                        self.escape = Escape::Start;
                        Ok(None)
                    }
                    0x00..=0x1F => Err(LexError::UnescapedControl { byte, position }),
                    _ => {
                        self.buf.push(byte);
                        Ok(None)
                    }
                }
            }
            Escape::Start => {
                if byte == b'u' {
                    self.escape = Escape::Unicode { acc: 0, seen: 0 };
                    Ok(None)
                } else if self.high_surrogate.is_some() {
                    Err(LexError::InvalidUnicodeCodepoint { position })
                } else if let Some(unescaped) = escape::unescape(byte) {
                    self.buf.push(unescaped);
                    self.escape = Escape::None;
                    Ok(None)
                } else {
                    Err(LexError::InvalidEscape { byte, position })
                }
            }
            Escape::Unicode { acc, seen } => {
                let digit = escape::hex_value(byte)
                    .ok_or(LexError::InvalidUnicodeEscape { byte, position })?;
                let acc = (acc << 4) | digit;
                if seen == 3 {
                    self.escape = Escape::None;
                    self.complete_unicode(acc, position)?;
                } else {
                    self.escape = Escape::Unicode {
                        acc,
                        seen: seen + 1,
                    };
                }
                Ok(None)
            }
        }
    }

    /// A full `\uXXXX` arrived; resolve surrogate pairing and encode.
    fn complete_unicode(&mut self, codepoint: u32, position: usize) -> Result<(), LexError> {
        if let Some(high) = self.high_surrogate.take() {
            if escape::is_low_surrogate(codepoint) {
                let combined = escape::combine_surrogate_pair(high, codepoint);
                self.push_char(combined, position)
            } else {
                Err(LexError::InvalidUnicodeCodepoint { position })
            }
        } else if escape::is_high_surrogate(codepoint) {
            self.high_surrogate = Some(codepoint);
            Ok(())
        } else if escape::is_low_surrogate(codepoint) {
            Err(LexError::InvalidUnicodeCodepoint { position })
        } else {
            self.push_char(codepoint, position)
        }
    }

    fn push_char(&mut self, codepoint: u32, position: usize) -> Result<(), LexError> {
        let ch = char::from_u32(codepoint)
            .ok_or(LexError::InvalidUnicodeCodepoint { position })?;
        let mut utf8 = [0u8; 4];
        self.buf.extend_from_slice(ch.encode_utf8(&mut utf8).as_bytes());
        Ok(())
    }
}

/// Number grammar sub-states.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Num {
    Sign,
    LeadingZero,
    BeforeDecimalPoint,
    Decimal,
    AfterDecimalPoint,
    Exponent,
    ExponentSign,
    AfterExponent,
}

impl Num {
    /// Whether a number may legally end in this state.
    fn is_finishable(self) -> bool {
        matches!(
            self,
            Num::LeadingZero | Num::BeforeDecimalPoint | Num::AfterDecimalPoint | Num::AfterExponent
        )
    }
}

/// Outcome of feeding one byte to an in-progress number.
#[derive(Debug, Clone, Copy)]
enum NumStep {
    Consume,
    /// The byte terminates the number and must not be consumed.
    Finish,
    Invalid,
}

#[derive(Debug)]
struct NumberState {
    buf: Vec<u8>,
    state: Num,
    is_integer: bool,
}

impl NumberState {
    fn new(first: u8, state: Num) -> Self {
        Self {
            buf: vec![first],
            state,
            is_integer: true,
        }
    }

    fn step(&mut self, byte: u8) -> NumStep {
        use Num::*;
        let next = match (self.state, byte) {
            (Sign, b'0') => LeadingZero,
            (Sign, b'1'..=b'9') => BeforeDecimalPoint,
            (LeadingZero, b'.') => Decimal,
            (LeadingZero, b'e' | b'E') => Exponent,
            (BeforeDecimalPoint, b'0'..=b'9') => BeforeDecimalPoint,
            (BeforeDecimalPoint, b'.') => Decimal,
            (BeforeDecimalPoint, b'e' | b'E') => Exponent,
            (Decimal, b'0'..=b'9') => AfterDecimalPoint,
            (AfterDecimalPoint, b'0'..=b'9') => AfterDecimalPoint,
            (AfterDecimalPoint, b'e' | b'E') => Exponent,
            (Exponent, b'0'..=b'9') => AfterExponent,
            (Exponent, b'+' | b'-') => ExponentSign,
            (ExponentSign, b'0'..=b'9') => AfterExponent,
            (AfterExponent, b'0'..=b'9') => AfterExponent,
            // Bytes from the number alphabet with no legal transition:
            // leading zeros, "1.2.3", "2e+-", "1-2".
            (_, b'0'..=b'9' | b'.' | b'e' | b'E' | b'+' | b'-') => return NumStep::Invalid,
            _ if self.state.is_finishable() => return NumStep::Finish,
            _ => return NumStep::Invalid,
        };
        if matches!(byte, b'.' | b'e' | b'E') {
            self.is_integer = false;
        }
        self.buf.push(byte);
        self.state = next;
        NumStep::Consume
    }

    /// Turn the accumulated text into a token. Only called from finishable
    /// states, so the text is grammatically complete.
    fn finish(&mut self, position: usize) -> Result<Token, LexError> {
        let bytes = core::mem::take(&mut self.buf);
        let text = String::from_utf8(bytes)
            .map_err(|_| LexError::InvalidNumber { byte: b' ', position })?;
        JsonNumber::from_text(&text, self.is_integer)
            .map(Token::Number)
            .ok_or(LexError::InvalidNumber { byte: b' ', position })
    }
}

/// Literal keyword progress, one state per remaining letter.
#[derive(Debug, Clone, Copy)]
enum True {
    R,
    U,
    E,
}
#[derive(Debug, Clone, Copy)]
enum False {
    A,
    L,
    S,
    E,
}
#[derive(Debug, Clone, Copy)]
enum Null {
    U,
    L1,
    L2,
}

#[derive(Debug, Clone, Copy)]
enum Literal {
    True(True),
    False(False),
    Null(Null),
}

enum LitStep {
    Continue(Literal),
    Done(Token),
}

impl Literal {
    fn step(self, byte: u8) -> Option<LitStep> {
        match (self, byte) {
            (Literal::True(True::R), b'r') => Some(LitStep::Continue(Literal::True(True::U))),
            (Literal::True(True::U), b'u') => Some(LitStep::Continue(Literal::True(True::E))),
            (Literal::True(True::E), b'e') => Some(LitStep::Done(Token::Bool(true))),
            (Literal::False(False::A), b'a') => Some(LitStep::Continue(Literal::False(False::L))),
            (Literal::False(False::L), b'l') => Some(LitStep::Continue(Literal::False(False::S))),
            (Literal::False(False::S), b's') => Some(LitStep::Continue(Literal::False(False::E))),
            (Literal::False(False::E), b'e') => Some(LitStep::Done(Token::Bool(false))),
            (Literal::Null(Null::U), b'u') => Some(LitStep::Continue(Literal::Null(Null::L1))),
            (Literal::Null(Null::L1), b'l') => Some(LitStep::Continue(Literal::Null(Null::L2))),
            (Literal::Null(Null::L2), b'l') => Some(LitStep::Done(Token::Null)),
            _ => None,
        }
    }
}

#[derive(Debug)]
enum State {
    Idle,
    InString(StringState),
    InNumber(NumberState),
    InLiteral(Literal),
}

/// The incremental tokenizer. Owns all partial-token state; the byte
/// buffer it reads from is supplied per call.
#[derive(Debug)]
pub(crate) struct Tokenizer {
    state: State,
    /// Absolute offset of the next unconsumed byte.
    position: usize,
}

impl Tokenizer {
    pub fn new() -> Self {
        Tokenizer {
            state: State::Idle,
            position: 0,
        }
    }

    /// Produce the next complete token from `buf`.
    ///
    /// Returns `Ok(None)` when the buffered bytes end mid-token (or between
    /// tokens) and `eof` is false. With `eof` set, a trailing number in a
    /// finishable state is completed, [`Token::EndOfInput`] is produced at
    /// a clean boundary, and anything else mid-token is
    /// [`LexError::UnexpectedEndOfInput`].
    pub fn next_token(
        &mut self,
        buf: &mut ByteBuffer,
        eof: bool,
    ) -> Result<Option<Token>, LexError> {
        loop {
            let Some(byte) = buf.peek(0) else {
                return self.end_of_data(eof);
            };
            trace!(
                "byte {:?} at {} in {:?}",
                byte as char,
                self.position,
                self.state
            );
            match &mut self.state {
                State::Idle => {
                    let position = self.position;
                    buf.advance(1);
                    self.position += 1;
                    match byte {
                        b' ' | b'\t' | b'\n' | b'\r' => {}
                        b'{' => return Ok(Some(Token::ObjectStart)),
                        b'}' => return Ok(Some(Token::ObjectEnd)),
                        b'[' => return Ok(Some(Token::ArrayStart)),
                        b']' => return Ok(Some(Token::ArrayEnd)),
                        b':' => return Ok(Some(Token::Colon)),
                        b',' => return Ok(Some(Token::Comma)),
                        b'"' => self.state = State::InString(StringState::new()),
                        b'-' => self.state = State::InNumber(NumberState::new(byte, Num::Sign)),
                        b'0' => {
                            self.state = State::InNumber(NumberState::new(byte, Num::LeadingZero))
                        }
                        b'1'..=b'9' => {
                            self.state =
                                State::InNumber(NumberState::new(byte, Num::BeforeDecimalPoint))
                        }
                        b't' => self.state = State::InLiteral(Literal::True(True::R)),
                        b'f' => self.state = State::InLiteral(Literal::False(False::A)),
                        b'n' => self.state = State::InLiteral(Literal::Null(Null::U)),
                        _ => return Err(LexError::UnexpectedByte { byte, position }),
                    }
                }
                State::InString(string) => {
                    let position = self.position;
                    buf.advance(1);
                    self.position += 1;
                    if let Some(bytes) = string.push(byte, position)? {
                        let text = String::from_utf8(bytes)
                            .map_err(|_| LexError::InvalidUtf8 { position })?;
                        self.state = State::Idle;
                        return Ok(Some(Token::String(text)));
                    }
                }
                State::InNumber(number) => {
                    let position = self.position;
                    match number.step(byte) {
                        NumStep::Consume => {
                            buf.advance(1);
                            self.position += 1;
                        }
                        NumStep::Finish => {
                            // Terminator byte stays for the next token.
                            let token = number.finish(position)?;
                            self.state = State::Idle;
                            return Ok(Some(token));
                        }
                        NumStep::Invalid => {
                            return Err(LexError::InvalidNumber { byte, position })
                        }
                    }
                }
                State::InLiteral(literal) => {
                    let position = self.position;
                    match literal.step(byte) {
                        Some(LitStep::Continue(next)) => {
                            buf.advance(1);
                            self.position += 1;
                            self.state = State::InLiteral(next);
                        }
                        Some(LitStep::Done(token)) => {
                            buf.advance(1);
                            self.position += 1;
                            self.state = State::Idle;
                            return Ok(Some(token));
                        }
                        None => return Err(LexError::UnexpectedByte { byte, position }),
                    }
                }
            }
        }
    }

    /// The buffer ran dry. Mid-token this is either "wait for more bytes"
    /// or, once the stream is closed, the end-of-input outcome.
    fn end_of_data(&mut self, eof: bool) -> Result<Option<Token>, LexError> {
        if !eof {
            return Ok(None);
        }
        match &mut self.state {
            State::Idle => Ok(Some(Token::EndOfInput)),
            State::InNumber(number) if number.state.is_finishable() => {
                let token = number.finish(self.position)?;
                self.state = State::Idle;
                Ok(Some(token))
            }
            _ => Err(LexError::UnexpectedEndOfInput {
                position: self.position,
            }),
        }
    }
}
