// MIDI token types produced by the byte-stream tokenizer

/// What kind of message a token carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TokenKind {
    /// Empty slot; never emitted by the tokenizer.
    #[default]
    None,
    /// Control Change.
    Cc,
    /// Recognized but undecoded message.
    Unknown,
}

/// A decoded MIDI message tagged with absolute time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MidiToken {
    /// Absolute time in ticks, stamped from the originating chunk's frame.
    pub time: i64,
    pub kind: TokenKind,
    /// MIDI channel, 0-15.
    pub channel: u8,
    pub controller: u8,
    pub value: u8,
}

impl MidiToken {
    pub fn cc(time: i64, channel: u8, controller: u8, value: u8) -> Self {
        Self {
            time,
            kind: TokenKind::Cc,
            channel,
            controller,
            value,
        }
    }
}
