use crate::{
    candidate::{ImageSet, Slot},
    error::FolderError,
    rename::{FolderPlan, Rename},
    scanner::MarkerScan,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub started: String,
    pub finished: String,
    pub root: PathBuf,
    pub input: PathBuf,
    pub output: PathBuf,
    pub input_sha256: String,
    pub output_sha256: String,
    pub candidates: Vec<CandidateReport>,
    pub skipped: Vec<SkippedFolder>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateReport {
    pub folder: PathBuf,
    pub name: String,
    pub renames: Vec<Rename>,
    pub unclassified: Vec<PathBuf>,
    pub images: ImageSet,
    pub anchors: Vec<AnchorReport>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnchorReport {
    pub paragraph: usize,
    pub scan: MarkerScan,
    pub inserted: Vec<Slot>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkippedFolder {
    pub folder: PathBuf,
    pub kind: String,
    pub error: String,
}

impl SkippedFolder {
    pub fn new(folder: PathBuf, err: &FolderError) -> Self {
        Self {
            folder,
            kind: err.kind().to_string(),
            error: err.to_string(),
        }
    }
}

/// One line of `plan` output: either the folder's plan or why it has none.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanEntry {
    pub folder: PathBuf,
    #[serde(default)]
    pub plan: Option<FolderPlan>,
    #[serde(default)]
    pub error: Option<SkippedFolder>,
}
