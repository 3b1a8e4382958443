// Types for project persistence
// Blocks serialize with stable integer ids; instance references persist as
// the referenced id and are rebuilt into arena handles on load

use crate::automation::Keyframe;
use serde::{Deserialize, Serialize};

/// Project version information
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProjectVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl ProjectVersion {
    pub fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    pub fn current() -> Self {
        Self::new(1, 0, 0)
    }
}

impl std::fmt::Display for ProjectVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Project metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectMetadata {
    /// Project name
    pub name: String,
    /// Version of the project format
    pub version: ProjectVersion,
    /// Creation timestamp (RFC 3339)
    pub created: String,
    /// Last modification timestamp (RFC 3339)
    pub modified: String,
    /// Author/creator information
    pub author: Option<String>,
    /// Project description
    pub description: Option<String>,
}

impl ProjectMetadata {
    pub fn new(name: impl Into<String>) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            name: name.into(),
            version: ProjectVersion::current(),
            created: now.clone(),
            modified: now,
            author: None,
            description: None,
        }
    }
}

/// Serializable block structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockData {
    /// Stable id within this file; instance references point at it
    pub id: u64,
    /// Absolute start tick (>= 0)
    pub start_tick: i64,
    /// Block title
    pub title: String,
    /// Id of the block whose data this one replays, if any. An instance
    /// block persists no keyframes of its own.
    pub instance_of: Option<u64>,
    /// Primary channel keyframes, in tick order
    pub keyframes: Vec<Keyframe>,
    /// Secondary channel keyframes (14-bit LSB), in tick order
    pub secondary_keyframes: Vec<Keyframe>,
    /// UI scratch: vertical zoom
    pub values_per_pixel: f64,
    /// UI scratch: vertical scroll offset
    pub offset_y: f64,
    /// UI scratch: edit cursor position
    pub cursor_tick: Option<i64>,
    /// UI scratch: loop/selection markers
    pub marker_ticks: (Option<i64>, Option<i64>),
}

/// Serializable track structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackData {
    /// Track name
    pub name: String,
    /// Input port the track listens on while recording
    pub input_port: Option<usize>,
    /// MIDI channel filter (0-15, or 16 for "any")
    pub midi_channel: u8,
    /// Controller number for the primary curve
    pub msb_controller: u8,
    /// Optional controller routed to the secondary curve
    pub lsb_controller: Option<u8>,
    /// Output value range
    pub min_value: f64,
    pub max_value: f64,
    /// 7-bit (0-127) vs 8-bit (0-255) output scaling
    pub seven_bit: bool,
    /// Track is muted
    pub mute: bool,
    /// Blocks owned by this track, in start-tick order
    pub blocks: Vec<BlockData>,
}

/// Main project structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    /// Project metadata
    pub metadata: ProjectMetadata,
    /// All tracks in the project
    pub tracks: Vec<TrackData>,
}

impl Default for Project {
    fn default() -> Self {
        Self {
            metadata: ProjectMetadata::new("Untitled Project"),
            tracks: Vec::new(),
        }
    }
}
