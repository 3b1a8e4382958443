// MidiByteTokenizer - per-port MIDI byte-stream parser
// Best-effort: malformed input never errors, the state machine just
// resynchronizes at the next recognizable status byte

use crate::midi::token::{MidiToken, TokenKind};
use std::collections::VecDeque;

/// Parser state. One byte is consumed per step; `TokenWaiting` means a
/// decoded token is ready to be taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Idle,
    TokenWaiting,
    CcController,
    CcValue,
    Sysex,
    IgnoredOneData,
    IgnoredTwoData,
}

/// Incremental tokenizer for one input port's raw MIDI byte stream.
///
/// Bytes are queued with the absolute time of the chunk they arrived in;
/// the emitted token carries the time of the byte that completed it.
#[derive(Debug)]
pub struct MidiByteTokenizer {
    state: State,
    queue: VecDeque<(i64, u8)>,
    pending: MidiToken,
}

impl MidiByteTokenizer {
    pub fn new() -> Self {
        Self {
            state: State::Idle,
            queue: VecDeque::new(),
            pending: MidiToken::default(),
        }
    }

    /// Queue a chunk of raw bytes stamped with its absolute time.
    pub fn push_chunk(&mut self, time: i64, bytes: &[u8]) {
        for byte in bytes {
            self.queue.push_back((time, *byte));
        }
    }

    /// Number of bytes not yet consumed.
    pub fn pending_bytes(&self) -> usize {
        self.queue.len()
    }

    /// Drain processable bytes and report whether a token is ready.
    pub fn token_available(&mut self) -> bool {
        while self.state != State::TokenWaiting {
            let Some((time, byte)) = self.queue.pop_front() else {
                break;
            };
            self.process_byte(time, byte);
        }
        self.state == State::TokenWaiting
    }

    /// Take the pending token, resetting the parser to `Idle`.
    pub fn next_token(&mut self) -> Option<MidiToken> {
        if self.state != State::TokenWaiting {
            return None;
        }
        self.state = State::Idle;
        let token = self.pending;
        self.pending = MidiToken::default();
        Some(token)
    }

    /// Advance the state machine by one byte.
    fn process_byte(&mut self, time: i64, byte: u8) {
        match self.state {
            State::Idle => self.process_status(time, byte),
            State::CcController => {
                self.pending.controller = byte;
                self.state = State::CcValue;
            }
            State::CcValue => {
                self.pending.value = byte;
                self.pending.time = time;
                self.pending.kind = TokenKind::Cc;
                self.state = State::TokenWaiting;
            }
            State::IgnoredTwoData => self.state = State::IgnoredOneData,
            State::IgnoredOneData => self.state = State::Idle,
            State::Sysex => {
                if byte == 0xF7 {
                    self.state = State::Idle;
                }
            }
            // Guarded by token_available(); bytes stay queued meanwhile.
            State::TokenWaiting => {}
        }
    }

    fn process_status(&mut self, _time: i64, byte: u8) {
        match byte & 0xF0 {
            0xF0 => match byte {
                0xF0 => self.state = State::Sysex,
                // Song position pointer: two data bytes follow.
                0xF2 => self.state = State::IgnoredTwoData,
                // MTC quarter frame / song select: one data byte follows.
                0xF1 | 0xF3 => self.state = State::IgnoredOneData,
                // Remaining system common / realtime bytes are single-byte.
                _ => {}
            },
            // Note Off, Note On, poly aftertouch, pitch wheel.
            0x80 | 0x90 | 0xA0 | 0xE0 => self.state = State::IgnoredTwoData,
            // Program change, channel aftertouch.
            0xC0 | 0xD0 => self.state = State::IgnoredOneData,
            0xB0 => {
                self.pending.channel = byte & 0x0F;
                self.state = State::CcController;
            }
            // Stray data bytes while idle: absorb and resynchronize.
            _ => {
                log::debug!("tokenizer skipping stray byte {byte:#04x}");
            }
        }
    }
}

impl Default for MidiByteTokenizer {
    fn default() -> Self {
        Self::new()
    }
}
