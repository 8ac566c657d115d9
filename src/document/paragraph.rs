use anyhow::{Context, Result};
use quick_xml::{escape::escape, events::Event, Reader};
use std::fmt::Write;

/// A body-level `w:p` element, kept as its opening tag plus raw inner XML so
/// untouched paragraphs serialize back unchanged.
#[derive(Debug, Clone)]
pub struct Paragraph {
    open_tag: String,
    inner: String,
    text: String,
}

impl Paragraph {
    /// `open_end` is the byte offset just past the opening tag, or `None` when
    /// the element is self-closing.
    pub(crate) fn from_xml(xml: &str, open_end: Option<usize>) -> Result<Self> {
        let (open_tag, inner) = match open_end {
            Some(end) => {
                let inner = xml[end..]
                    .strip_suffix("</w:p>")
                    .with_context(|| format!("paragraph without closing tag: {xml}"))?;
                (xml[..end].to_string(), inner.to_string())
            }
            None => {
                let head = xml.trim_end().trim_end_matches("/>").trim_end();
                (format!("{head}>"), String::new())
            }
        };
        let text = extract_text(&inner)?;
        Ok(Self {
            open_tag,
            inner,
            text,
        })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Drops children, properties and attributes, leaving a bare `<w:p>`.
    pub fn clear(&mut self) {
        self.open_tag = "<w:p>".into();
        self.inner.clear();
        self.text.clear();
    }

    /// Appends one run; each `\n` becomes a `w:br`.
    pub fn push_text_run(&mut self, text: &str) {
        let mut run = String::from("<w:r>");
        for (i, part) in text.split('\n').enumerate() {
            if i > 0 {
                run.push_str("<w:br/>");
            }
            if !part.is_empty() {
                let _ = write!(run, r#"<w:t xml:space="preserve">{}</w:t>"#, escape(part));
            }
        }
        run.push_str("</w:r>");
        self.inner.push_str(&run);
        self.text.push_str(text);
    }

    pub(crate) fn push_raw_run(&mut self, run_xml: &str) {
        self.inner.push_str(run_xml);
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn inner_xml(&self) -> &str {
        &self.inner
    }

    pub fn to_xml(&self) -> String {
        format!("{}{}</w:p>", self.open_tag, self.inner)
    }
}

/// Text of the runs in a paragraph body: `w:t` content, `w:tab` as a tab and
/// `w:br`/`w:cr` as a newline. Text boxes inside `w:drawing` or `w:pict` are
/// not part of the paragraph's text.
pub fn extract_text(inner: &str) -> Result<String> {
    let mut reader = Reader::from_str(inner);
    let mut out = String::new();
    let mut run_depth = 0usize;
    let mut in_text = false;
    let mut embedded = 0usize;

    loop {
        match reader.read_event().context("parsing paragraph XML")? {
            Event::Start(e) if matches!(e.name().as_ref(), b"w:drawing" | b"w:pict") => {
                embedded += 1;
            }
            Event::End(e) if matches!(e.name().as_ref(), b"w:drawing" | b"w:pict") => {
                embedded = embedded.saturating_sub(1);
            }
            Event::Eof => break,
            _ if embedded > 0 => {}
            Event::Start(e) => match e.name().as_ref() {
                b"w:r" => run_depth += 1,
                b"w:t" if run_depth > 0 => in_text = true,
                _ => {}
            },
            Event::End(e) => match e.name().as_ref() {
                b"w:r" => run_depth = run_depth.saturating_sub(1),
                b"w:t" => in_text = false,
                _ => {}
            },
            Event::Empty(e) if run_depth > 0 => match e.name().as_ref() {
                b"w:tab" => out.push('\t'),
                b"w:br" | b"w:cr" => out.push('\n'),
                _ => {}
            },
            Event::Text(t) if in_text => out.push_str(&t.unescape()?),
            Event::CData(c) if in_text => out.push_str(&String::from_utf8_lossy(&c)),
            _ => {}
        }
    }

    Ok(out)
}
