//! Fuzzing tests for the MIDI byte tokenizer
//!
//! The tokenizer parses live hardware input and must absorb arbitrary and
//! malformed byte streams without panicking or erroring.

use midicurve::{MidiByteTokenizer, TokenKind};
use rand::Rng;

/// Fuzz the tokenizer with random byte sequences
#[test]
fn fuzz_tokenizer_random_bytes() {
    let mut rng = rand::thread_rng();

    for _ in 0..1000 {
        let length = rng.gen_range(1..=256);
        let random_bytes: Vec<u8> = (0..length).map(|_| rng.gen_range(0..=255)).collect();

        let mut tokenizer = MidiByteTokenizer::new();
        tokenizer.push_chunk(0, &random_bytes);
        while tokenizer.token_available() {
            let token = tokenizer.next_token().expect("available token");
            // Only well-formed CC tokens ever come out.
            assert_eq!(token.kind, TokenKind::Cc);
            assert!(token.channel <= 15);
        }
    }
}

/// Fuzz with chunked delivery: the same stream split at random points must
/// decode to the same tokens
#[test]
fn fuzz_tokenizer_chunk_boundaries() {
    let mut rng = rand::thread_rng();

    for _ in 0..200 {
        let mut bytes = Vec::new();
        for _ in 0..rng.gen_range(1..=40) {
            // Interleave CC messages with noise.
            if rng.gen_bool(0.5) {
                bytes.extend_from_slice(&[
                    0xB0 | rng.gen_range(0..=15),
                    rng.gen_range(0..=127),
                    rng.gen_range(0..=127),
                ]);
            } else {
                bytes.push(rng.gen_range(0..=255));
            }
        }

        let mut whole = MidiByteTokenizer::new();
        whole.push_chunk(0, &bytes);
        let mut whole_tokens = Vec::new();
        while whole.token_available() {
            whole_tokens.extend(whole.next_token());
        }

        let mut chunked = MidiByteTokenizer::new();
        let mut offset = 0;
        while offset < bytes.len() {
            let end = (offset + rng.gen_range(1..=4)).min(bytes.len());
            chunked.push_chunk(0, &bytes[offset..end]);
            offset = end;
        }
        let mut chunked_tokens = Vec::new();
        while chunked.token_available() {
            chunked_tokens.extend(chunked.next_token());
        }

        assert_eq!(whole_tokens.len(), chunked_tokens.len());
        for (a, b) in whole_tokens.iter().zip(&chunked_tokens) {
            assert_eq!((a.channel, a.controller, a.value), (b.channel, b.controller, b.value));
        }
    }
}

/// Fuzz with status-byte heavy patterns
#[test]
fn fuzz_tokenizer_status_patterns() {
    let mut rng = rand::thread_rng();
    let status_bytes = [
        0x80u8, 0x90, 0xA0, 0xB0, 0xC0, 0xD0, 0xE0, // Channel messages
        0xF0, 0xF1, 0xF2, 0xF3, 0xF4, 0xF5, 0xF6, 0xF7, // System common
        0xF8, 0xFA, 0xFB, 0xFC, 0xFE, 0xFF, // System real-time
    ];

    for _ in 0..500 {
        let mut bytes = Vec::new();
        for _ in 0..rng.gen_range(1..=32) {
            if rng.gen_bool(0.6) {
                bytes.push(status_bytes[rng.gen_range(0..status_bytes.len())]);
            } else {
                bytes.push(rng.gen_range(0..=127));
            }
        }

        let mut tokenizer = MidiByteTokenizer::new();
        tokenizer.push_chunk(0, &bytes);
        while tokenizer.token_available() {
            tokenizer.next_token();
        }
        // Everything consumable was consumed without a panic.
        assert!(!tokenizer.token_available());
    }
}

/// A truncated CC at the end of the stream leaves no token and no panic
#[test]
fn test_truncated_messages() {
    for bytes in [&[0xB0][..], &[0xB0, 0x07][..], &[0x90, 0x40][..]] {
        let mut tokenizer = MidiByteTokenizer::new();
        tokenizer.push_chunk(0, bytes);
        assert!(!tokenizer.token_available());
        assert!(tokenizer.next_token().is_none());
    }
}
