use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub paths: Paths,
    #[serde(default)]
    pub images: Images,
    #[serde(default)]
    pub document: Document,
    #[serde(default)]
    pub matching: Matching,
    #[serde(default)]
    pub policy: Policy,
    #[serde(default)]
    pub output: Output,
    #[serde(default)]
    pub logging: Logging,
    #[serde(default)]
    pub debug: Debug,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config: {}", path.display()))?;
        let cfg: Config = toml::from_str(&raw).with_context(|| "parsing TOML")?;
        Ok(cfg)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Paths {
    pub root_folder: String,
    pub input_document: String,
    pub output_document: String,
}
impl Default for Paths {
    fn default() -> Self {
        Self {
            root_folder: "简历图片".into(),
            input_document: "简历插入图片1.docx".into(),
            output_document: "简历插入图片_修改后.docx".into(),
        }
    }
}

/// Which files count as candidate images and how they are classified.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Images {
    pub extensions: Vec<String>,
    pub max_per_folder: usize,
    pub degree_markers: Vec<String>,
    pub diploma_markers: Vec<String>,
    pub id_card_markers: Vec<String>,
    pub id_front_name: String,
    pub id_back_name: String,
    pub diploma_name: String,
    pub degree_name: String,
}
impl Default for Images {
    fn default() -> Self {
        Self {
            extensions: vec!["jpg".into(), "jpeg".into(), "png".into()],
            max_per_folder: 4,
            degree_markers: vec!["学位证".into(), "学位".into()],
            diploma_markers: vec!["毕业证".into()],
            id_card_markers: vec!["身份证".into()],
            id_front_name: "身份证01".into(),
            id_back_name: "身份证02".into(),
            diploma_name: "毕业证".into(),
            degree_name: "学位证书".into(),
        }
    }
}

impl Images {
    pub fn is_supported(&self, ext: &str) -> bool {
        self.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext))
    }
}

/// Markers and labels inside the resume document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub start_marker: String,
    pub end_marker: String,
    pub id_card_label: String,
    pub diploma_label: String,
    pub degree_label: String,
    pub image_width_inches: f64,
}
impl Default for Document {
    fn default() -> Self {
        Self {
            start_marker: "身份证：".into(),
            end_marker: "学位证：".into(),
            id_card_label: "身份证：".into(),
            diploma_label: "毕业证：".into(),
            degree_label: "学位证：".into(),
            image_width_inches: 2.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Matching {
    pub name_pattern: String,
    pub normalize_unicode: bool,
}
impl Default for Matching {
    fn default() -> Self {
        Self {
            name_pattern: r"[\x{4e00}-\x{9fa5}]+".into(),
            normalize_unicode: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FolderErrorPolicy {
    Abort,
    Skip,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingMarkerPolicy {
    Skip,
    Warn,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Policy {
    pub on_folder_error: FolderErrorPolicy,
    pub on_missing_markers: MissingMarkerPolicy,
}
impl Default for Policy {
    fn default() -> Self {
        Self {
            on_folder_error: FolderErrorPolicy::Abort,
            on_missing_markers: MissingMarkerPolicy::Warn,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Output {
    pub print_summary: bool,
    pub write_report_json: bool,
    pub report_filename: String,
}
impl Default for Output {
    fn default() -> Self {
        Self {
            print_summary: true,
            write_report_json: false,
            report_filename: "resume-inserter-report.json".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Logging {
    pub level: String,
    pub json: bool,
    pub write_to_file: bool,
    pub file_path: String,
}
impl Default for Logging {
    fn default() -> Self {
        Self {
            level: "info".into(),
            json: false,
            write_to_file: false,
            file_path: "".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Debug {
    pub dump_paragraphs: bool,
    pub dump_effective_config: bool,
}
impl Default for Debug {
    fn default() -> Self {
        Self {
            dump_paragraphs: true,
            dump_effective_config: false,
        }
    }
}
