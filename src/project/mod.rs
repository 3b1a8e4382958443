// Project persistence system for midicurve
// RON project body plus JSON metadata; instance references persist as
// stable integer ids and are resolved back into arena handles on load

pub mod manager;
pub mod serialization;
pub mod types;

pub use manager::{load_project, save_project, ProjectError};
pub use types::{BlockData, Project, ProjectMetadata, ProjectVersion, TrackData};

use crate::sequencer::CHANNEL_ANY;
use std::collections::HashMap;

/// Validate a serialized project before restoring or saving it.
pub fn validate_project_structure(project: &Project) -> Result<(), ProjectError> {
    if project.metadata.name.trim().is_empty() {
        return Err(ProjectError::InvalidStructure(
            "Project name cannot be empty".to_string(),
        ));
    }

    if project.metadata.version.major < 1 {
        return Err(ProjectError::InvalidVersion);
    }

    // First pass: collect ids and block durations.
    let mut durations: HashMap<u64, i64> = HashMap::new();
    let mut instances: Vec<(u64, u64)> = Vec::new();
    for track in &project.tracks {
        for block in &track.blocks {
            if durations.insert(block.id, block_data_duration(block)).is_some() {
                return Err(ProjectError::InvalidStructure(format!(
                    "Duplicate block id: {}",
                    block.id
                )));
            }
            if let Some(target) = block.instance_of {
                instances.push((block.id, target));
            }
        }
    }

    for (id, target) in &instances {
        if !durations.contains_key(target) {
            return Err(ProjectError::InvalidStructure(format!(
                "Block {} references missing instance target {}",
                id, target
            )));
        }
        if instances.iter().any(|(other, _)| other == target) {
            return Err(ProjectError::InvalidStructure(format!(
                "Block {} targets another instance ({})",
                id, target
            )));
        }
    }
    // Instances inherit their target's duration for the overlap check.
    let resolved: HashMap<u64, i64> = durations
        .iter()
        .map(|(&id, &duration)| {
            let duration = instances
                .iter()
                .find(|(instance, _)| *instance == id)
                .map(|(_, target)| durations[target])
                .unwrap_or(duration);
            (id, duration)
        })
        .collect();

    for track in &project.tracks {
        if track.name.trim().is_empty() {
            return Err(ProjectError::InvalidStructure(
                "Track name cannot be empty".to_string(),
            ));
        }

        if track.midi_channel > CHANNEL_ANY {
            return Err(ProjectError::InvalidStructure(format!(
                "Track '{}' MIDI channel must be 0-16",
                track.name
            )));
        }

        if track.min_value >= track.max_value {
            return Err(ProjectError::InvalidStructure(format!(
                "Track '{}' value range is empty",
                track.name
            )));
        }

        let mut previous_start: Option<i64> = None;
        let mut previous_end = i64::MIN;
        for block in &track.blocks {
            if block.start_tick < 0 {
                return Err(ProjectError::InvalidStructure(format!(
                    "Block '{}' starts before tick 0",
                    block.title
                )));
            }

            if block.instance_of.is_some()
                && (!block.keyframes.is_empty() || !block.secondary_keyframes.is_empty())
            {
                return Err(ProjectError::InvalidStructure(format!(
                    "Instance block '{}' must not carry keyframes",
                    block.title
                )));
            }

            for keys in [&block.keyframes, &block.secondary_keyframes] {
                if !keys.windows(2).all(|pair| pair[0].tick < pair[1].tick) {
                    return Err(ProjectError::InvalidStructure(format!(
                        "Block '{}' keyframes must be in strictly increasing tick order",
                        block.title
                    )));
                }
            }

            if let Some(previous) = previous_start {
                if block.start_tick <= previous {
                    return Err(ProjectError::InvalidStructure(format!(
                        "Track '{}' blocks must be in start-tick order",
                        track.name
                    )));
                }
            }
            if block.start_tick < previous_end {
                return Err(ProjectError::InvalidStructure(format!(
                    "Track '{}' has overlapping blocks at tick {}",
                    track.name, block.start_tick
                )));
            }
            previous_start = Some(block.start_tick);
            previous_end = block.start_tick + resolved[&block.id];
        }
    }

    Ok(())
}

fn block_data_duration(block: &BlockData) -> i64 {
    let primary = block.keyframes.last().map(|kf| kf.tick).unwrap_or(0);
    let secondary = block
        .secondary_keyframes
        .last()
        .map(|kf| kf.tick)
        .unwrap_or(0);
    primary.max(secondary)
}
