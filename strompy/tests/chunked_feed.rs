// SPDX-License-Identifier: Apache-2.0

// Chunk-split invariance and multi-document streams, driven through the
// public channel interface only.

use strompy::{
    channel, channel_with, ChannelConfig, JsonNumber, JsonValue, LexError, ParseError,
};

/// Feed the given chunks in order, close, and collect every value.
fn decode_chunks(chunks: &[&[u8]]) -> Result<Vec<JsonValue>, ParseError> {
    futures::executor::block_on(async {
        let (mut writer, mut reader) = channel();
        for chunk in chunks {
            writer.feed_bytes(chunk).await.expect("channel open");
        }
        writer.close();
        let mut values = Vec::new();
        while let Some(result) = reader.poll_next().await {
            values.push(result?);
        }
        Ok(values)
    })
}

fn decode_all(input: &[u8]) -> Result<Vec<JsonValue>, ParseError> {
    decode_chunks(&[input])
}

#[test]
fn test_split_invariance_at_every_boundary() {
    let doc = r#"{"k": [1, 2.5e1, true, null, "s\n😀"], "m": {"a": false}}"#.as_bytes();
    let reference = decode_all(doc).expect("valid document");
    assert_eq!(reference.len(), 1);
    for split in 1..doc.len() {
        let halves = decode_chunks(&[&doc[..split], &doc[split..]])
            .unwrap_or_else(|err| panic!("split at {split} failed: {err}"));
        assert_eq!(halves, reference, "split at byte {split}");
    }
}

#[test]
fn test_one_byte_chunks() {
    let doc = br#"[{"deep": [[-12.5, "x"], {}]}, 7]"#;
    let reference = decode_all(doc).expect("valid document");
    let bytes: Vec<&[u8]> = doc.chunks(1).collect();
    assert_eq!(decode_chunks(&bytes).expect("byte-wise feed"), reference);
}

#[test]
fn test_chunks_larger_than_documents() {
    // One chunk carrying several complete documents plus the start of
    // another.
    let values = decode_chunks(&[b"[1] [2] [3] [4", b"]"]).expect("valid stream");
    assert_eq!(values.len(), 4);
    for (i, value) in values.iter().enumerate() {
        let items = value.as_array().expect("array");
        assert_eq!(items[0].as_i64(), Some(i as i64 + 1));
    }
}

#[test]
fn test_multiple_documents_with_whitespace() {
    let values = decode_all(b" 1 \n 2 \t 3 ").expect("valid stream");
    assert_eq!(
        values,
        vec![
            JsonValue::Number(JsonNumber::Int(1)),
            JsonValue::Number(JsonNumber::Int(2)),
            JsonValue::Number(JsonNumber::Int(3)),
        ]
    );
}

#[test]
fn test_split_inside_literal() {
    let values = decode_chunks(&[b"[tr", b"ue, fal", b"se, nul", b"l]"]).expect("valid stream");
    assert_eq!(
        values,
        vec![JsonValue::Array(vec![
            JsonValue::Bool(true),
            JsonValue::Bool(false),
            JsonValue::Null,
        ])]
    );
}

#[test]
fn test_split_inside_number_digits() {
    let values = decode_chunks(&[b"[123", b"45, 6", b".5]"]).expect("valid stream");
    assert_eq!(
        values,
        vec![JsonValue::Array(vec![
            JsonValue::Number(JsonNumber::Int(12345)),
            JsonValue::Number(JsonNumber::Float(6.5)),
        ])]
    );
}

#[test]
fn test_split_inside_unicode_escape() {
    // Chunk boundary between the hex digits of one escape and between the
    // halves of a surrogate pair.
    let values =
        decode_chunks(&[br#"["\ud8"#, br#"3d\ud"#, br#"e00"]"#]).expect("valid stream");
    assert_eq!(
        values,
        vec![JsonValue::Array(vec![JsonValue::String("😀".into())])]
    );
}

#[test]
fn test_duplicate_key_last_write_wins() {
    let values = decode_all(br#"{"a":1,"a":2}"#).expect("valid document");
    assert_eq!(values[0].get("a").and_then(JsonValue::as_i64), Some(2));
    assert_eq!(values[0].as_object().expect("object").len(), 1);
}

#[test]
fn test_trailing_number_completed_on_close() {
    let values = decode_all(b"42").expect("valid document");
    assert_eq!(values, vec![JsonValue::Number(JsonNumber::Int(42))]);
}

#[test]
fn test_malformed_document_yields_terminal_error() {
    futures::executor::block_on(async {
        let (mut writer, mut reader) = channel();
        writer.feed_bytes(br#"{"a":}"#).await.expect("channel open");
        writer.close();
        let first = reader.poll_next().await.expect("an outcome");
        let err = first.expect_err("malformed input");
        assert!(matches!(err, ParseError::UnexpectedToken { .. }), "{err}");
        // The error latches; every subsequent poll repeats it.
        assert_eq!(reader.poll_next().await, Some(Err(err.clone())));
        assert_eq!(reader.poll_next().await, Some(Err(err)));
    });
}

#[test]
fn test_values_before_error_still_delivered() {
    futures::executor::block_on(async {
        let (mut writer, mut reader) = channel();
        writer.feed_bytes(b"[1] {").await.expect("channel open");
        writer.close();
        let first = reader.poll_next().await.expect("first value").expect("ok");
        assert_eq!(first.as_array().expect("array")[0].as_i64(), Some(1));
        assert_eq!(
            reader.poll_next().await,
            Some(Err(ParseError::UnexpectedEndOfInput))
        );
    });
}

#[test]
fn test_close_with_partial_value_buffered() {
    futures::executor::block_on(async {
        let (mut writer, mut reader) = channel();
        writer.feed_bytes(br#"{"a":1"#).await.expect("channel open");
        writer.close();
        assert_eq!(
            reader.poll_next().await,
            Some(Err(ParseError::UnexpectedEndOfInput))
        );
    });
}

#[test]
fn test_lex_error_crosses_as_parse_error() {
    let err = decode_all(b"[1, @]").expect_err("malformed input");
    assert_eq!(
        err,
        ParseError::Lex(LexError::UnexpectedByte {
            byte: b'@',
            position: 4
        })
    );
}

#[test]
fn test_nesting_beyond_max_depth_fails() {
    futures::executor::block_on(async {
        let (mut writer, mut reader) = channel_with(ChannelConfig {
            max_depth: 512,
            queue_capacity: None,
        });
        let deep = b"[".repeat(513);
        writer.feed_bytes(&deep).await.expect("channel open");
        writer.close();
        assert_eq!(
            reader.poll_next().await,
            Some(Err(ParseError::MaxDepthExceeded { limit: 512 }))
        );
    });
}

#[test]
fn test_depth_at_limit_still_parses() {
    let mut doc = b"[".repeat(512);
    doc.extend_from_slice(&b"]".repeat(512));
    let values = decode_all(&doc).expect("valid document");
    assert_eq!(values.len(), 1);
}
