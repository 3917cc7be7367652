// SPDX-License-Identifier: Apache-2.0

//! The unified error type the reader side observes.
//!
//! Tokenizer errors are wrapped before they cross the channel, so callers
//! match on a single type. Errors are terminal: once one surfaces, the
//! stream is dead and every later poll sees the same error again, which is
//! why this type is `Clone`.

use crate::tokenizer::{LexError, Token};

/// A fatal decoding error.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseError {
    /// An error bubbled up from the tokenizer.
    Lex(LexError),
    /// A structurally valid token arrived where it is not allowed.
    UnexpectedToken {
        token: Token,
        expected: &'static str,
    },
    /// The stream closed with an incomplete token or open containers.
    UnexpectedEndOfInput,
    /// Nesting depth exceeded the configured limit.
    MaxDepthExceeded { limit: usize },
    /// The decoder entered an unexpected internal state.
    UnexpectedState(&'static str),
}

impl From<LexError> for ParseError {
    fn from(err: LexError) -> Self {
        match err {
            // One end-of-input error crosses the channel, whichever layer
            // noticed it first.
            LexError::UnexpectedEndOfInput { .. } => ParseError::UnexpectedEndOfInput,
            other => ParseError::Lex(other),
        }
    }
}

impl core::fmt::Display for ParseError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ParseError::Lex(err) => write!(f, "{err}"),
            ParseError::UnexpectedToken { token, expected } => {
                write!(f, "unexpected {}, expected {}", token.describe(), expected)
            }
            ParseError::UnexpectedEndOfInput => write!(f, "unexpected end of input"),
            ParseError::MaxDepthExceeded { limit } => {
                write!(f, "nesting depth exceeds the limit of {limit}")
            }
            ParseError::UnexpectedState(context) => {
                write!(f, "unexpected decoder state: {context}")
            }
        }
    }
}

impl std::error::Error for ParseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ParseError::Lex(err) => Some(err),
            _ => None,
        }
    }
}
