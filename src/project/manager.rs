// Project manager for loading and saving projects

use crate::project::serialization::{
    deserialize_from_ron, restore, serialize_to_ron, snapshot,
};
use crate::project::types::{Project, ProjectMetadata};
use crate::project::validate_project_structure;
use crate::sequencer::{BlockArena, Track};
use std::path::Path;

/// Project error types
#[derive(Debug, thiserror::Error)]
pub enum ProjectError {
    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Invalid project structure: {0}")]
    InvalidStructure(String),

    #[error("Invalid project format version")]
    InvalidVersion,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Save the live arena + tracks as a RON project file.
pub fn save_project<P: AsRef<Path>>(
    path: P,
    arena: &BlockArena,
    tracks: &[Track],
    metadata: &ProjectMetadata,
) -> Result<(), ProjectError> {
    let mut metadata = metadata.clone();
    metadata.modified = chrono::Utc::now().to_rfc3339();

    let project = snapshot(arena, tracks, metadata)?;
    validate_project_structure(&project)?;

    let ron = serialize_to_ron(&project)?;
    std::fs::write(path.as_ref(), ron)?;
    log::debug!("saved project to {}", path.as_ref().display());
    Ok(())
}

/// Load a RON project file back into a live arena + tracks.
pub fn load_project<P: AsRef<Path>>(
    path: P,
) -> Result<(ProjectMetadata, BlockArena, Vec<Track>), ProjectError> {
    let text = std::fs::read_to_string(path.as_ref())?;
    let project: Project = deserialize_from_ron(&text)?;
    validate_project_structure(&project)?;

    let (arena, tracks) = restore(&project)?;
    Ok((project.metadata, arena, tracks))
}
