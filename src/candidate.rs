use crate::{
    config::{self, Config},
    error::FolderError,
};
use anyhow::{Context, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use unicode_normalization::UnicodeNormalization;

/// One of the four fixed insertion positions inside a cleared marker range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Slot {
    IdFront,
    IdBack,
    Diploma,
    Degree,
}

impl Slot {
    pub const ALL: [Slot; 4] = [Slot::IdFront, Slot::IdBack, Slot::Diploma, Slot::Degree];

    /// Paragraph offset from the start of the cleared range.
    pub fn offset(self) -> usize {
        match self {
            Slot::IdFront => 0,
            Slot::IdBack => 1,
            Slot::Diploma => 2,
            Slot::Degree => 3,
        }
    }

    /// File stem an image takes once it is assigned to this slot.
    pub fn canonical_stem(self, images: &config::Images) -> &str {
        match self {
            Slot::IdFront => &images.id_front_name,
            Slot::IdBack => &images.id_back_name,
            Slot::Diploma => &images.diploma_name,
            Slot::Degree => &images.degree_name,
        }
    }

    pub fn label(self, doc: &config::Document) -> Option<&str> {
        match self {
            Slot::IdFront => Some(&doc.id_card_label),
            Slot::IdBack => None,
            Slot::Diploma => Some(&doc.diploma_label),
            Slot::Degree => Some(&doc.degree_label),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Slot::IdFront => "id_front",
            Slot::IdBack => "id_back",
            Slot::Diploma => "diploma",
            Slot::Degree => "degree",
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canonical image paths of one candidate, keyed by slot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageSet {
    pub id_front: Option<PathBuf>,
    pub id_back: Option<PathBuf>,
    pub diploma: Option<PathBuf>,
    pub degree: Option<PathBuf>,
}

impl ImageSet {
    pub fn get(&self, slot: Slot) -> Option<&Path> {
        self.entry(slot).as_deref()
    }

    /// Stores `path` in `slot` and returns whatever was there before.
    pub fn set(&mut self, slot: Slot, path: PathBuf) -> Option<PathBuf> {
        self.entry_mut(slot).replace(path)
    }

    pub fn filled(&self) -> Vec<Slot> {
        Slot::ALL
            .into_iter()
            .filter(|s| self.get(*s).is_some())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.filled().is_empty()
    }

    fn entry(&self, slot: Slot) -> &Option<PathBuf> {
        match slot {
            Slot::IdFront => &self.id_front,
            Slot::IdBack => &self.id_back,
            Slot::Diploma => &self.diploma,
            Slot::Degree => &self.degree,
        }
    }

    fn entry_mut(&mut self, slot: Slot) -> &mut Option<PathBuf> {
        match slot {
            Slot::IdFront => &mut self.id_front,
            Slot::IdBack => &mut self.id_back,
            Slot::Diploma => &mut self.diploma,
            Slot::Degree => &mut self.degree,
        }
    }
}

/// Pulls candidate names out of folder names.
pub struct NameMatcher {
    re: Regex,
    normalize: bool,
}

impl NameMatcher {
    pub fn new(cfg: &Config) -> Result<Self> {
        let re = Regex::new(&cfg.matching.name_pattern).with_context(|| {
            format!("compiling matching.name_pattern: {}", cfg.matching.name_pattern)
        })?;
        Ok(Self {
            re,
            normalize: cfg.matching.normalize_unicode,
        })
    }

    /// First match of the name pattern in `folder`.
    pub fn extract(&self, folder: &str) -> Result<String, FolderError> {
        let folder = if self.normalize {
            folder.nfc().collect::<String>()
        } else {
            folder.to_string()
        };
        self.re
            .find(&folder)
            .map(|m| m.as_str().to_string())
            .ok_or(FolderError::NameUnextractable { folder })
    }
}

pub fn normalize(cfg: &Config, s: &str) -> String {
    if cfg.matching.normalize_unicode {
        s.nfc().collect()
    } else {
        s.to_string()
    }
}

/// Supported image files directly inside `dir`, sorted by file name.
pub fn list_images(cfg: &Config, dir: &Path) -> Result<Vec<PathBuf>> {
    let mut out = Vec::new();
    let entries =
        std::fs::read_dir(dir).with_context(|| format!("read_dir {}", dir.display()))?;
    for entry in entries {
        let entry = entry.with_context(|| format!("read_dir entry in {}", dir.display()))?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let supported = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| cfg.images.is_supported(e))
            .unwrap_or(false);
        if supported {
            out.push(path);
        }
    }
    out.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_first_ideographic_run() {
        let m = NameMatcher::new(&Config::default()).unwrap();
        assert_eq!(m.extract("01-张三-产品经理").unwrap(), "张三");
        assert_eq!(m.extract("李四").unwrap(), "李四");
    }

    #[test]
    fn folder_without_ideographs_is_unextractable() {
        let m = NameMatcher::new(&Config::default()).unwrap();
        let err = m.extract("candidate_007").unwrap_err();
        assert!(matches!(err, FolderError::NameUnextractable { ref folder } if folder == "candidate_007"));
    }

    #[test]
    fn folder_name_is_normalized_before_matching() {
        // U+F900 is a compatibility ideograph outside the name range; NFC maps
        // it to U+8C48.
        let m = NameMatcher::new(&Config::default()).unwrap();
        assert_eq!(m.extract("07-\u{F900}").unwrap(), "\u{8C48}");

        let mut cfg = Config::default();
        cfg.matching.normalize_unicode = false;
        let raw = NameMatcher::new(&cfg).unwrap();
        assert!(raw.extract("07-\u{F900}").is_err());
    }

    #[test]
    fn image_set_reports_filled_slots_in_order() {
        let mut set = ImageSet::default();
        assert!(set.is_empty());
        set.set(Slot::Degree, PathBuf::from("a/学位证书.jpg"));
        set.set(Slot::IdFront, PathBuf::from("a/身份证01.jpg"));
        assert_eq!(set.filled(), vec![Slot::IdFront, Slot::Degree]);
        assert!(set.get(Slot::IdBack).is_none());
    }

    #[test]
    fn slot_labels_skip_back_of_id_card() {
        let doc = config::Document::default();
        assert_eq!(Slot::IdFront.label(&doc), Some("身份证："));
        assert_eq!(Slot::IdBack.label(&doc), None);
        assert_eq!(Slot::Degree.offset(), 3);
    }
}
