#![allow(dead_code)]

use anyhow::Result;
use resume_inserter::document::DocumentBody;
use std::io::{Cursor, Read, Write};
use std::path::{Path, PathBuf};
use zip::{write::SimpleFileOptions, ZipArchive, ZipWriter};

/// A valid 4x2 RGB PNG.
pub const PNG_4X2: &[u8] = &[
    0x89, 0x50, 0x4e, 0x47, 0x0d, 0x0a, 0x1a, 0x0a, 0x00, 0x00, 0x00, 0x0d, 0x49, 0x48, 0x44, 0x52,
    0x00, 0x00, 0x00, 0x04, 0x00, 0x00, 0x00, 0x02, 0x08, 0x02, 0x00, 0x00, 0x00, 0xf0, 0xca, 0xea,
    0x34, 0x00, 0x00, 0x00, 0x10, 0x49, 0x44, 0x41, 0x54, 0x78, 0x9c, 0x63, 0xf8, 0xcf, 0xc0, 0x00,
    0x47, 0x0c, 0xc8, 0x1c, 0x00, 0x6f, 0xaa, 0x07, 0xf9, 0x80, 0xdc, 0x00, 0x28, 0x00, 0x00, 0x00,
    0x00, 0x49, 0x45, 0x4e, 0x44, 0xae, 0x42, 0x60, 0x82,
];

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/></Types>"#;

const ROOT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/></Relationships>"#;

const DOCUMENT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/></Relationships>"#;

const STYLES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:styles xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"/>"#;

/// The layout the resume template uses for one candidate.
pub fn candidate_block(name: &str) -> Vec<String> {
    vec![
        format!("姓名：{name}"),
        "身份证：".into(),
        "".into(),
        "毕业证：".into(),
        "学位证：".into(),
    ]
}

pub fn document_xml(paragraphs: &[String]) -> String {
    let mut body = String::new();
    for p in paragraphs {
        if p.is_empty() {
            body.push_str("<w:p/>");
        } else {
            body.push_str(&format!(
                r#"<w:p w:rsidR="00A1"><w:r><w:t xml:space="preserve">{p}</w:t></w:r></w:p>"#
            ));
        }
    }
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><w:body>{body}<w:sectPr/></w:body></w:document>"#
    )
}

pub fn build_docx(paragraphs: &[String]) -> Vec<u8> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();
    let parts = [
        ("[Content_Types].xml", CONTENT_TYPES.to_string()),
        ("_rels/.rels", ROOT_RELS.to_string()),
        ("word/document.xml", document_xml(paragraphs)),
        ("word/_rels/document.xml.rels", DOCUMENT_RELS.to_string()),
        ("word/styles.xml", STYLES.to_string()),
    ];
    for (name, data) in parts {
        zip.start_file(name, options).unwrap();
        zip.write_all(data.as_bytes()).unwrap();
    }
    zip.finish().unwrap().into_inner()
}

pub fn write_docx(path: &Path, paragraphs: &[String]) {
    std::fs::write(path, build_docx(paragraphs)).unwrap();
}

pub fn write_png(path: &Path) {
    std::fs::write(path, PNG_4X2).unwrap();
}

pub fn read_part(docx: &Path, name: &str) -> String {
    let file = std::fs::File::open(docx).unwrap();
    let mut archive = ZipArchive::new(file).unwrap();
    let mut entry = archive.by_name(name).unwrap();
    let mut out = String::new();
    entry.read_to_string(&mut out).unwrap();
    out
}

pub fn part_names(docx: &Path) -> Vec<String> {
    let file = std::fs::File::open(docx).unwrap();
    let archive = ZipArchive::new(file).unwrap();
    archive.file_names().map(str::to_string).collect()
}

pub fn file_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[derive(Debug, Clone, PartialEq)]
pub enum Op {
    Clear(usize),
    Text(usize, String),
    Picture(usize, PathBuf, u64),
}

/// Paragraph list that records every mutation.
pub struct FakeBody {
    pub paragraphs: Vec<String>,
    pub ops: Vec<Op>,
}

impl FakeBody {
    pub fn new<S: AsRef<str>>(paragraphs: &[S]) -> Self {
        Self {
            paragraphs: paragraphs.iter().map(|s| s.as_ref().to_string()).collect(),
            ops: Vec::new(),
        }
    }
}

impl DocumentBody for FakeBody {
    fn paragraph_count(&self) -> usize {
        self.paragraphs.len()
    }

    fn paragraph_text(&self, index: usize) -> Option<&str> {
        self.paragraphs.get(index).map(String::as_str)
    }

    fn clear_paragraph(&mut self, index: usize) -> Result<()> {
        self.paragraphs[index].clear();
        self.ops.push(Op::Clear(index));
        Ok(())
    }

    fn append_text(&mut self, index: usize, text: &str) -> Result<()> {
        self.paragraphs[index].push_str(text);
        self.ops.push(Op::Text(index, text.to_string()));
        Ok(())
    }

    fn append_picture(&mut self, index: usize, image: &Path, width_emu: u64) -> Result<()> {
        self.ops
            .push(Op::Picture(index, image.to_path_buf(), width_emu));
        Ok(())
    }
}
