use crate::{
    candidate::{ImageSet, Slot},
    config::Config,
    document::{picture, DocumentBody},
    error::FolderError,
};
use anyhow::{Context, Result};
use tracing::{debug, info};

/// Paragraphs the fixed layout needs between the two markers.
pub const REQUIRED_SLOTS: usize = Slot::ALL.len();

/// Clears `start..=end` and refills it slot by slot. The range length is
/// checked before anything is cleared, so a short range leaves the document
/// as it was.
pub fn insert_images<D: DocumentBody + ?Sized>(
    cfg: &Config,
    doc: &mut D,
    name: &str,
    start: usize,
    end: usize,
    images: &ImageSet,
) -> Result<Vec<Slot>> {
    let found = end + 1 - start;
    if found < REQUIRED_SLOTS || end >= doc.paragraph_count() {
        return Err(FolderError::SlotCountMismatch {
            name: name.to_string(),
            start,
            end,
            found,
            required: REQUIRED_SLOTS,
        }
        .into());
    }

    for i in start..=end {
        doc.clear_paragraph(i)?;
    }
    if found > REQUIRED_SLOTS {
        debug!(
            "{} extra paragraphs after slot layout stay empty for '{name}'",
            found - REQUIRED_SLOTS
        );
    }

    let width_emu = picture::inches_to_emu(cfg.document.image_width_inches);
    let mut filled = Vec::new();
    for slot in Slot::ALL {
        let Some(path) = images.get(slot) else {
            continue;
        };
        let index = start + slot.offset();
        if let Some(label) = slot.label(&cfg.document) {
            doc.append_text(index, &format!("{label}\n"))?;
        }
        info!("inserting image: {}", path.display());
        doc.append_picture(index, path, width_emu)
            .with_context(|| format!("inserting {slot} image for '{name}'"))?;
        doc.append_text(index, "\n")?;
        filled.push(slot);
    }

    Ok(filled)
}
