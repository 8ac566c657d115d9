use super::{
    paragraph::Paragraph,
    picture::{self, ImageInfo},
    DocumentBody,
};
use anyhow::{anyhow, bail, Context, Result};
use quick_xml::{events::BytesStart, events::Event, Reader};
use std::fs::File;
use std::io::{Read, Seek, Write};
use std::path::Path;
use tracing::debug;
use zip::{write::SimpleFileOptions, CompressionMethod, ZipArchive, ZipWriter};

const DOCUMENT_PART: &str = "word/document.xml";
const DOCUMENT_RELS_PART: &str = "word/_rels/document.xml.rels";
const CONTENT_TYPES_PART: &str = "[Content_Types].xml";
const IMAGE_REL_TYPE: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/image";
const EMPTY_RELS: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    "\n",
    r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"></Relationships>"#
);

struct Part {
    name: String,
    data: Vec<u8>,
    is_dir: bool,
}

enum Segment {
    Raw(String),
    Paragraph(Paragraph),
}

/// An in-memory `.docx` package. Only the main document, its relationships
/// and the content types are rewritten on save; every other part is copied
/// as read.
pub struct Docx {
    parts: Vec<Part>,
    segments: Vec<Segment>,
    paragraphs: Vec<usize>,
    rels: Relationships,
    content_types: ContentTypes,
    media: Vec<Part>,
    next_doc_pr_id: u32,
}

impl Docx {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("open {}", path.display()))?;
        Self::from_reader(file).with_context(|| format!("loading docx: {}", path.display()))
    }

    pub fn from_reader<R: Read + Seek>(reader: R) -> Result<Self> {
        let mut archive = ZipArchive::new(reader).context("reading zip archive")?;
        let mut parts = Vec::with_capacity(archive.len());
        for i in 0..archive.len() {
            let mut entry = archive.by_index(i).context("reading zip entry")?;
            let mut data = Vec::new();
            entry
                .read_to_end(&mut data)
                .with_context(|| format!("reading part {}", entry.name()))?;
            parts.push(Part {
                name: entry.name().to_string(),
                is_dir: entry.is_dir(),
                data,
            });
        }

        let document = part_str(&parts, DOCUMENT_PART)?
            .ok_or_else(|| anyhow!("missing {DOCUMENT_PART}; not a Word document"))?;
        let body = BodyScan::run(document)?;

        let rels = match part_str(&parts, DOCUMENT_RELS_PART)? {
            Some(xml) => Relationships::parse(xml)?,
            None => Relationships::parse(EMPTY_RELS)?,
        };
        let content_types = ContentTypes::parse(
            part_str(&parts, CONTENT_TYPES_PART)?
                .ok_or_else(|| anyhow!("missing {CONTENT_TYPES_PART}"))?,
        )?;

        debug!(
            "loaded docx parts={} paragraphs={}",
            parts.len(),
            body.paragraphs.len()
        );

        Ok(Self {
            parts,
            segments: body.segments,
            paragraphs: body.paragraphs,
            rels,
            content_types,
            media: Vec::new(),
            next_doc_pr_id: body.max_doc_pr_id + 1,
        })
    }

    pub fn paragraph(&self, index: usize) -> Option<&Paragraph> {
        match self.segments.get(*self.paragraphs.get(index)?)? {
            Segment::Paragraph(p) => Some(p),
            Segment::Raw(_) => None,
        }
    }

    fn paragraph_mut(&mut self, index: usize) -> Result<&mut Paragraph> {
        let count = self.paragraphs.len();
        let seg = self
            .paragraphs
            .get(index)
            .and_then(|&s| self.segments.get_mut(s));
        match seg {
            Some(Segment::Paragraph(p)) => Ok(p),
            _ => bail!("paragraph index {index} out of range (document has {count})"),
        }
    }

    pub fn paragraph_texts(&self) -> Vec<&str> {
        (0..self.paragraphs.len())
            .filter_map(|i| self.paragraph(i).map(Paragraph::text))
            .collect()
    }

    /// Serialized `word/document.xml`.
    pub fn document_xml(&self) -> String {
        let mut out = String::new();
        for seg in &self.segments {
            match seg {
                Segment::Raw(raw) => out.push_str(raw),
                Segment::Paragraph(p) => out.push_str(&p.to_xml()),
            }
        }
        out
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let file = File::create(path).with_context(|| format!("create {}", path.display()))?;
        self.write_to(file)
            .with_context(|| format!("writing docx: {}", path.display()))
    }

    pub fn write_to<W: Write + Seek>(&self, writer: W) -> Result<()> {
        let mut zip = ZipWriter::new(writer);
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        let mut wrote_rels = false;
        for part in &self.parts {
            if part.is_dir {
                zip.add_directory(part.name.as_str(), options)?;
                continue;
            }
            let data = match part.name.as_str() {
                DOCUMENT_PART => self.document_xml().into_bytes(),
                DOCUMENT_RELS_PART => {
                    wrote_rels = true;
                    self.rels.to_xml()?.into_bytes()
                }
                CONTENT_TYPES_PART => self.content_types.to_xml()?.into_bytes(),
                _ => part.data.clone(),
            };
            zip.start_file(part.name.as_str(), options)
                .with_context(|| format!("starting part {}", part.name))?;
            zip.write_all(&data)
                .with_context(|| format!("writing part {}", part.name))?;
        }

        if !wrote_rels && !self.rels.added.is_empty() {
            zip.start_file(DOCUMENT_RELS_PART, options)?;
            zip.write_all(self.rels.to_xml()?.as_bytes())?;
        }

        for part in &self.media {
            zip.start_file(part.name.as_str(), options)
                .with_context(|| format!("starting part {}", part.name))?;
            zip.write_all(&part.data)?;
        }

        zip.finish().context("finishing zip archive")?;
        Ok(())
    }

    /// Stores `bytes` as a new media part and returns its relationship id.
    fn add_media(&mut self, info: &ImageInfo, bytes: Vec<u8>) -> String {
        let ext = info.format.extension();
        let mut n = self.media.len() + 1;
        let name = loop {
            let candidate = format!("word/media/resume-inserter-{n}.{ext}");
            let taken = self
                .parts
                .iter()
                .chain(&self.media)
                .any(|p| p.name == candidate);
            if !taken {
                break candidate;
            }
            n += 1;
        };
        self.content_types
            .ensure_default(ext, info.format.content_type());
        let target = name.trim_start_matches("word/").to_string();
        let rel_id = self.rels.add(IMAGE_REL_TYPE, &target);
        self.media.push(Part {
            name,
            data: bytes,
            is_dir: false,
        });
        rel_id
    }
}

impl DocumentBody for Docx {
    fn paragraph_count(&self) -> usize {
        self.paragraphs.len()
    }

    fn paragraph_text(&self, index: usize) -> Option<&str> {
        self.paragraph(index).map(Paragraph::text)
    }

    fn clear_paragraph(&mut self, index: usize) -> Result<()> {
        self.paragraph_mut(index)?.clear();
        Ok(())
    }

    fn append_text(&mut self, index: usize, text: &str) -> Result<()> {
        self.paragraph_mut(index)?.push_text_run(text);
        Ok(())
    }

    fn append_picture(&mut self, index: usize, image: &Path, width_emu: u64) -> Result<()> {
        // Resolve the paragraph first so a bad index registers no media.
        self.paragraph_mut(index)?;

        let bytes =
            std::fs::read(image).with_context(|| format!("reading image {}", image.display()))?;
        let info = ImageInfo::probe(&bytes)
            .with_context(|| format!("probing image {}", image.display()))?;
        let (cx, cy) = info.extent(width_emu);
        let rel_id = self.add_media(&info, bytes);

        let doc_pr_id = self.next_doc_pr_id;
        self.next_doc_pr_id += 1;
        let file_name = image
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let run = picture::inline_run_xml(&rel_id, doc_pr_id, &file_name, cx, cy);
        self.paragraph_mut(index)?.push_raw_run(&run);
        Ok(())
    }
}

fn part_str<'a>(parts: &'a [Part], name: &str) -> Result<Option<&'a str>> {
    match parts.iter().find(|p| p.name == name) {
        Some(p) => std::str::from_utf8(&p.data)
            .map(Some)
            .with_context(|| format!("{name} is not UTF-8")),
        None => Ok(None),
    }
}

/// Splits `document.xml` into raw text and the direct `w:p` children of
/// `w:body`. Paragraphs nested in tables stay inside raw segments.
struct BodyScan {
    segments: Vec<Segment>,
    paragraphs: Vec<usize>,
    max_doc_pr_id: u32,
}

impl BodyScan {
    fn run(xml: &str) -> Result<Self> {
        let mut reader = Reader::from_str(xml);
        let mut scan = BodyScan {
            segments: Vec::new(),
            paragraphs: Vec::new(),
            max_doc_pr_id: 0,
        };
        let mut depth = 0usize;
        let mut body_depth: Option<usize> = None;
        // (start offset, end of opening tag, depth) of the paragraph being read
        let mut open: Option<(usize, usize, usize)> = None;
        let mut cursor = 0usize;

        loop {
            let pos = reader.buffer_position() as usize;
            let event = reader
                .read_event()
                .with_context(|| format!("parsing {DOCUMENT_PART} near byte {pos}"))?;
            let after = reader.buffer_position() as usize;
            match event {
                Event::Start(e) => {
                    depth += 1;
                    scan.note_doc_pr(&e)?;
                    match e.name().as_ref() {
                        b"w:body" if body_depth.is_none() => body_depth = Some(depth),
                        b"w:p" if open.is_none() && body_depth == Some(depth - 1) => {
                            open = Some((pos, after, depth));
                        }
                        _ => {}
                    }
                }
                Event::Empty(e) => {
                    scan.note_doc_pr(&e)?;
                    if e.name().as_ref() == b"w:p" && open.is_none() && body_depth == Some(depth)
                    {
                        scan.push(xml, cursor, pos, after, None)?;
                        cursor = after;
                    }
                }
                Event::End(e) => {
                    if let Some((start, open_end, d)) = open {
                        if d == depth && e.name().as_ref() == b"w:p" {
                            scan.push(xml, cursor, start, after, Some(open_end - start))?;
                            cursor = after;
                            open = None;
                        }
                    }
                    if body_depth == Some(depth) && e.name().as_ref() == b"w:body" {
                        body_depth = None;
                    }
                    depth = depth.saturating_sub(1);
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if cursor < xml.len() {
            scan.segments.push(Segment::Raw(xml[cursor..].to_string()));
        }
        Ok(scan)
    }

    fn push(
        &mut self,
        xml: &str,
        cursor: usize,
        start: usize,
        end: usize,
        open_len: Option<usize>,
    ) -> Result<()> {
        if cursor < start {
            self.segments.push(Segment::Raw(xml[cursor..start].to_string()));
        }
        let paragraph = Paragraph::from_xml(&xml[start..end], open_len)?;
        self.paragraphs.push(self.segments.len());
        self.segments.push(Segment::Paragraph(paragraph));
        Ok(())
    }

    fn note_doc_pr(&mut self, e: &BytesStart<'_>) -> Result<()> {
        if e.name().as_ref() != b"wp:docPr" {
            return Ok(());
        }
        if let Some(attr) = e.try_get_attribute("id")? {
            if let Ok(id) = attr.unescape_value()?.parse::<u32>() {
                self.max_doc_pr_id = self.max_doc_pr_id.max(id);
            }
        }
        Ok(())
    }
}

/// `word/_rels/document.xml.rels` plus the relationships added this run.
struct Relationships {
    xml: String,
    next_id: u32,
    added: Vec<(String, &'static str, String)>,
}

impl Relationships {
    fn parse(xml: &str) -> Result<Self> {
        let mut reader = Reader::from_str(xml);
        let mut max_id = 0u32;
        loop {
            match reader.read_event().context("parsing relationships")? {
                Event::Start(e) | Event::Empty(e) if e.name().as_ref() == b"Relationship" => {
                    if let Some(attr) = e.try_get_attribute("Id")? {
                        let id = attr.unescape_value()?;
                        if let Some(n) = id.strip_prefix("rId").and_then(|n| n.parse::<u32>().ok())
                        {
                            max_id = max_id.max(n);
                        }
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }
        Ok(Self {
            xml: xml.to_string(),
            next_id: max_id + 1,
            added: Vec::new(),
        })
    }

    fn add(&mut self, rel_type: &'static str, target: &str) -> String {
        let id = format!("rId{}", self.next_id);
        self.next_id += 1;
        self.added.push((id.clone(), rel_type, target.to_string()));
        id
    }

    fn to_xml(&self) -> Result<String> {
        let extra: String = self
            .added
            .iter()
            .map(|(id, ty, target)| {
                format!(
                    r#"<Relationship Id="{id}" Type="{ty}" Target="{}"/>"#,
                    quick_xml::escape::escape(target.as_str())
                )
            })
            .collect();
        insert_before_close(&self.xml, "</Relationships>", &extra)
    }
}

/// `[Content_Types].xml` with any extension defaults this run needed.
struct ContentTypes {
    xml: String,
    defaults: Vec<String>,
    added: Vec<(String, &'static str)>,
}

impl ContentTypes {
    fn parse(xml: &str) -> Result<Self> {
        let mut reader = Reader::from_str(xml);
        let mut defaults = Vec::new();
        loop {
            match reader.read_event().context("parsing content types")? {
                Event::Start(e) | Event::Empty(e) if e.name().as_ref() == b"Default" => {
                    if let Some(attr) = e.try_get_attribute("Extension")? {
                        defaults.push(attr.unescape_value()?.to_ascii_lowercase());
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }
        Ok(Self {
            xml: xml.to_string(),
            defaults,
            added: Vec::new(),
        })
    }

    fn ensure_default(&mut self, ext: &str, content_type: &'static str) {
        let ext = ext.to_ascii_lowercase();
        if self.defaults.contains(&ext) {
            return;
        }
        self.defaults.push(ext.clone());
        self.added.push((ext, content_type));
    }

    fn to_xml(&self) -> Result<String> {
        let extra: String = self
            .added
            .iter()
            .map(|(ext, ct)| format!(r#"<Default Extension="{ext}" ContentType="{ct}"/>"#))
            .collect();
        insert_before_close(&self.xml, "</Types>", &extra)
    }
}

fn insert_before_close(xml: &str, close: &str, extra: &str) -> Result<String> {
    if extra.is_empty() {
        return Ok(xml.to_string());
    }
    let at = xml
        .rfind(close)
        .ok_or_else(|| anyhow!("no {close} in package part"))?;
    let mut out = String::with_capacity(xml.len() + extra.len());
    out.push_str(&xml[..at]);
    out.push_str(extra);
    out.push_str(&xml[at..]);
    Ok(out)
}
