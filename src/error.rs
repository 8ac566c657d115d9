use crate::candidate::Slot;

/// Failures scoped to one candidate folder. Each can be skipped or abort the
/// run, depending on `policy.on_folder_error`.
#[derive(Debug, thiserror::Error)]
pub enum FolderError {
    #[error(
        "folder '{name}' holds {count} images, over the limit of {limit}; remove non-target images and rerun"
    )]
    TooManyImages {
        name: String,
        count: usize,
        limit: usize,
    },

    #[error("no candidate name found in folder name: {folder}")]
    NameUnextractable { folder: String },

    #[error("{slot} slot in folder '{name}' is claimed by both '{first}' and '{second}'")]
    SlotConflict {
        name: String,
        slot: Slot,
        first: String,
        second: String,
    },

    #[error("no {missing} marker after anchor paragraph {anchor} for '{name}'")]
    MarkersMissing {
        name: String,
        anchor: usize,
        missing: &'static str,
    },

    #[error(
        "marker range {start}..={end} for '{name}' has {found} paragraphs, {required} required"
    )]
    SlotCountMismatch {
        name: String,
        start: usize,
        end: usize,
        found: usize,
        required: usize,
    },
}

impl FolderError {
    pub fn kind(&self) -> &'static str {
        match self {
            FolderError::TooManyImages { .. } => "too_many_images",
            FolderError::NameUnextractable { .. } => "name_unextractable",
            FolderError::SlotConflict { .. } => "slot_conflict",
            FolderError::MarkersMissing { .. } => "markers_missing",
            FolderError::SlotCountMismatch { .. } => "slot_count_mismatch",
        }
    }
}
