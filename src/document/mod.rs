pub mod package;
pub mod paragraph;
pub mod picture;

use anyhow::Result;
use std::path::Path;

pub use package::Docx;
pub use paragraph::Paragraph;

/// The paragraph-level operations the scanner and inserter need from a
/// document.
pub trait DocumentBody {
    fn paragraph_count(&self) -> usize;
    fn paragraph_text(&self, index: usize) -> Option<&str>;
    fn clear_paragraph(&mut self, index: usize) -> Result<()>;
    fn append_text(&mut self, index: usize, text: &str) -> Result<()>;
    fn append_picture(&mut self, index: usize, image: &Path, width_emu: u64) -> Result<()>;
}
