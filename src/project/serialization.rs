// Serialization utilities for project persistence
// Snapshot/restore between the live arena+tracks and the serializable
// Project shape, with an explicit resolve pass for instance references

use crate::project::types::*;
use crate::project::ProjectError;
use crate::sequencer::{BlockArena, BlockId, CurveChannel, TimedBlock, Track};
use ron::{from_str as ron_from_str, to_string as ron_to_string};
use std::collections::HashMap;

/// Serialize a project to RON format
pub fn serialize_to_ron(project: &Project) -> Result<String, ProjectError> {
    ron_to_string(project)
        .map_err(|e| ProjectError::SerializationError(format!("Failed to serialize to RON: {}", e)))
}

/// Deserialize a project from RON format
pub fn deserialize_from_ron(ron_data: &str) -> Result<Project, ProjectError> {
    ron_from_str(ron_data).map_err(|e| {
        ProjectError::SerializationError(format!("Failed to deserialize from RON: {}", e))
    })
}

/// Serialize project metadata to JSON format
pub fn serialize_metadata_to_json(metadata: &ProjectMetadata) -> Result<String, ProjectError> {
    serde_json::to_string_pretty(metadata).map_err(|e| {
        ProjectError::SerializationError(format!("Failed to serialize metadata to JSON: {}", e))
    })
}

/// Deserialize project metadata from JSON format
pub fn deserialize_metadata_from_json(json_data: &str) -> Result<ProjectMetadata, ProjectError> {
    serde_json::from_str(json_data).map_err(|e| {
        ProjectError::SerializationError(format!("Failed to deserialize metadata from JSON: {}", e))
    })
}

/// Capture the live arena + tracks as a serializable project.
///
/// Every block owned by a track gets a stable integer id; an instance block
/// persists the id of its target instead of keyframe data. An instance
/// whose target is not owned by any track cannot be restored and is an
/// invalid structure.
pub fn snapshot(
    arena: &BlockArena,
    tracks: &[Track],
    metadata: ProjectMetadata,
) -> Result<Project, ProjectError> {
    let mut ids: HashMap<BlockId, u64> = HashMap::new();
    let mut next_id = 1u64;
    for track in tracks {
        for (_, block_id) in track.blocks() {
            ids.entry(block_id).or_insert_with(|| {
                let id = next_id;
                next_id += 1;
                id
            });
        }
    }

    let mut track_data = Vec::with_capacity(tracks.len());
    for track in tracks {
        let mut blocks = Vec::with_capacity(track.block_count());
        for (_, block_id) in track.blocks() {
            let block = arena.get(block_id).ok_or_else(|| {
                ProjectError::InvalidStructure(format!(
                    "Track '{}' references a block missing from the arena",
                    track.name
                ))
            })?;

            let instance_of = match block.instance_of() {
                None => None,
                Some(target) => Some(*ids.get(&target).ok_or_else(|| {
                    ProjectError::InvalidStructure(format!(
                        "Instance block '{}' targets a block not owned by any track",
                        block.title
                    ))
                })?),
            };

            blocks.push(BlockData {
                id: ids[&block_id],
                start_tick: block.start_tick(),
                title: block.title.clone(),
                instance_of,
                keyframes: block.curve(CurveChannel::Primary).keyframes().copied().collect(),
                secondary_keyframes: block
                    .curve(CurveChannel::Secondary)
                    .keyframes()
                    .copied()
                    .collect(),
                values_per_pixel: block.values_per_pixel,
                offset_y: block.offset_y,
                cursor_tick: block.cursor_tick,
                marker_ticks: block.marker_ticks,
            });
        }

        track_data.push(TrackData {
            name: track.name.clone(),
            input_port: track.input_port,
            midi_channel: track.midi_channel,
            msb_controller: track.msb_controller,
            lsb_controller: track.lsb_controller,
            min_value: track.min_value,
            max_value: track.max_value,
            seven_bit: track.seven_bit,
            mute: track.mute,
            blocks,
        });
    }

    Ok(Project {
        metadata,
        tracks: track_data,
    })
}

/// Rebuild the live arena + tracks from a serialized project.
///
/// Two passes: all blocks are created first, then instance references are
/// resolved from persisted ids to arena handles — restoring identity, not
/// a structural copy. Unknown ids, duplicate ids, and instance chains are
/// invalid structures.
pub fn restore(project: &Project) -> Result<(BlockArena, Vec<Track>), ProjectError> {
    let mut arena = BlockArena::new();
    let mut handles: HashMap<u64, BlockId> = HashMap::new();
    let mut instance_fixups: Vec<(BlockId, u64)> = Vec::new();
    let mut tracks = Vec::with_capacity(project.tracks.len());

    for track_data in &project.tracks {
        let mut track = Track::new(track_data.name.clone());
        track.input_port = track_data.input_port;
        track.midi_channel = track_data.midi_channel;
        track.msb_controller = track_data.msb_controller;
        track.lsb_controller = track_data.lsb_controller;
        track.min_value = track_data.min_value;
        track.max_value = track_data.max_value;
        track.seven_bit = track_data.seven_bit;
        track.mute = track_data.mute;

        for block_data in &track_data.blocks {
            let mut block = TimedBlock::new(block_data.start_tick, block_data.title.clone());
            for kf in &block_data.keyframes {
                block.curve_mut(CurveChannel::Primary).add_key(*kf);
            }
            for kf in &block_data.secondary_keyframes {
                block.curve_mut(CurveChannel::Secondary).add_key(*kf);
            }
            block.values_per_pixel = block_data.values_per_pixel;
            block.offset_y = block_data.offset_y;
            block.cursor_tick = block_data.cursor_tick;
            block.marker_ticks = block_data.marker_ticks;

            let handle = arena.insert(block);
            if handles.insert(block_data.id, handle).is_some() {
                return Err(ProjectError::InvalidStructure(format!(
                    "Duplicate block id {}",
                    block_data.id
                )));
            }
            if let Some(target_id) = block_data.instance_of {
                instance_fixups.push((handle, target_id));
            }

            if !track.add_block(&arena, handle) {
                return Err(ProjectError::InvalidStructure(format!(
                    "Track '{}' has two blocks starting at tick {}",
                    track_data.name, block_data.start_tick
                )));
            }
        }

        tracks.push(track);
    }

    // Resolve pass: rebuild instance handles from persisted ids.
    for (handle, target_id) in &instance_fixups {
        let target = *handles.get(target_id).ok_or_else(|| {
            ProjectError::InvalidStructure(format!("Unknown instance target id {}", target_id))
        })?;
        arena[*handle].set_instance_target(target);
    }
    for (_, target_id) in &instance_fixups {
        if arena[handles[target_id]].instance_of().is_some() {
            return Err(ProjectError::InvalidStructure(
                "Instance chains must be flat".to_string(),
            ));
        }
    }

    Ok((arena, tracks))
}
