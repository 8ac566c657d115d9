use crate::{
    candidate::{self, ImageSet, NameMatcher, Slot},
    config::Config,
    error::FolderError,
};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rename {
    pub from: PathBuf,
    pub to: PathBuf,
    pub slot: Slot,
}

impl Rename {
    pub fn is_noop(&self) -> bool {
        self.from == self.to
    }
}

/// Everything the rename pass decided for one candidate folder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FolderPlan {
    pub folder: PathBuf,
    pub name: String,
    pub renames: Vec<Rename>,
    pub unclassified: Vec<PathBuf>,
    pub images: ImageSet,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Category {
    Degree,
    Diploma,
    IdCard,
}

/// Immediate subdirectories of `root`, sorted by name.
pub fn candidate_dirs(root: &Path) -> Result<Vec<PathBuf>> {
    let mut dirs = Vec::new();
    let entries =
        std::fs::read_dir(root).with_context(|| format!("read_dir {}", root.display()))?;
    for entry in entries {
        let path = entry
            .with_context(|| format!("read_dir entry in {}", root.display()))?
            .path();
        if path.is_dir() {
            dirs.push(path);
        }
    }
    dirs.sort();
    Ok(dirs)
}

pub fn folder_name(dir: &Path) -> String {
    dir.file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Classifies the images of `dir` and decides their canonical names without
/// touching the filesystem. Folder-level problems come back as a
/// [`FolderError`] inside the `anyhow::Error`.
pub fn plan_folder(cfg: &Config, matcher: &NameMatcher, dir: &Path) -> Result<FolderPlan> {
    let name = matcher.extract(&folder_name(dir))?;

    let images = candidate::list_images(cfg, dir)?;
    if images.len() > cfg.images.max_per_folder {
        return Err(FolderError::TooManyImages {
            name,
            count: images.len(),
            limit: cfg.images.max_per_folder,
        }
        .into());
    }

    let mut plan = FolderPlan {
        folder: dir.to_path_buf(),
        name,
        renames: Vec::new(),
        unclassified: Vec::new(),
        images: ImageSet::default(),
    };

    for path in images {
        let file_name = candidate::normalize(cfg, &folder_name(&path));
        let slot = match classify(cfg, &file_name) {
            Some(Category::Degree) => Slot::Degree,
            Some(Category::Diploma) => Slot::Diploma,
            Some(Category::IdCard) => {
                if plan.images.get(Slot::IdFront).is_none() {
                    Slot::IdFront
                } else {
                    Slot::IdBack
                }
            }
            None => {
                debug!("{} left unclassified", path.display());
                plan.unclassified.push(path);
                continue;
            }
        };

        if let Some(prev) = plan.images.get(slot) {
            let first = plan
                .renames
                .iter()
                .find(|r| r.to == prev)
                .map(|r| folder_name(&r.from))
                .unwrap_or_else(|| folder_name(prev));
            return Err(FolderError::SlotConflict {
                name: plan.name,
                slot,
                first,
                second: folder_name(&path),
            }
            .into());
        }

        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("jpg")
            .to_ascii_lowercase();
        let to = dir.join(format!("{}.{}", slot.canonical_stem(&cfg.images), ext));
        plan.images.set(slot, to.clone());
        plan.renames.push(Rename {
            from: path,
            to,
            slot,
        });
    }

    Ok(plan)
}

/// Markers are checked degree first, then diploma, then ID card.
fn classify(cfg: &Config, file_name: &str) -> Option<Category> {
    let hit = |markers: &[String]| markers.iter().any(|m| file_name.contains(m.as_str()));
    if hit(&cfg.images.degree_markers) {
        Some(Category::Degree)
    } else if hit(&cfg.images.diploma_markers) {
        Some(Category::Diploma)
    } else if hit(&cfg.images.id_card_markers) {
        Some(Category::IdCard)
    } else {
        None
    }
}

/// Performs the planned renames. Moving files first go to temporary names so
/// a target that is also a source is never clobbered. On failure every file
/// still under a temporary name goes back to its source name; renames that
/// already reached their target stay.
pub fn apply_plan(plan: &FolderPlan) -> Result<()> {
    let moving: Vec<&Rename> = plan.renames.iter().filter(|r| !r.is_noop()).collect();

    let mut staged = Vec::with_capacity(moving.len());
    for (i, r) in moving.iter().enumerate() {
        let tmp = plan
            .folder
            .join(format!(".resume-inserter-{}-{}.tmp", std::process::id(), i));
        if let Err(err) = std::fs::rename(&r.from, &tmp) {
            restore(&staged);
            return Err(err)
                .with_context(|| format!("rename {} -> {}", r.from.display(), tmp.display()));
        }
        staged.push((tmp, *r));
    }

    for (i, (tmp, r)) in staged.iter().enumerate() {
        if let Err(err) = std::fs::rename(tmp, &r.to) {
            restore(&staged[i..]);
            return Err(err)
                .with_context(|| format!("rename {} -> {}", tmp.display(), r.to.display()));
        }
        info!(
            "{} renamed to {}",
            folder_name(&r.from),
            folder_name(&r.to)
        );
    }

    Ok(())
}

/// Moves staged files back to their source names, best effort.
fn restore(staged: &[(PathBuf, &Rename)]) {
    for (tmp, r) in staged {
        if let Err(err) = std::fs::rename(tmp, &r.from) {
            warn!(
                "could not restore {} from {}: {err}",
                r.from.display(),
                tmp.display()
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn degree_marker_wins_over_id_card() {
        let cfg = Config::default();
        assert_eq!(classify(&cfg, "身份证和学位证.jpg"), Some(Category::Degree));
        assert_eq!(classify(&cfg, "学位.png"), Some(Category::Degree));
        assert_eq!(classify(&cfg, "毕业证扫描.jpeg"), Some(Category::Diploma));
        assert_eq!(classify(&cfg, "身份证反面.jpg"), Some(Category::IdCard));
        assert_eq!(classify(&cfg, "照片.jpg"), None);
    }
}
