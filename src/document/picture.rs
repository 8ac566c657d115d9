use anyhow::{anyhow, bail, Result};
use imagesize::ImageType;

pub const EMU_PER_INCH: f64 = 914_400.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Png,
    Jpeg,
    Gif,
    Bmp,
}

impl ImageFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Jpeg => "jpeg",
            ImageFormat::Gif => "gif",
            ImageFormat::Bmp => "bmp",
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            ImageFormat::Png => "image/png",
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Gif => "image/gif",
            ImageFormat::Bmp => "image/bmp",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ImageInfo {
    pub format: ImageFormat,
    pub width_px: u64,
    pub height_px: u64,
}

impl ImageInfo {
    /// Reads format and pixel size from the image header.
    pub fn probe(bytes: &[u8]) -> Result<Self> {
        let format = match imagesize::image_type(bytes)
            .map_err(|e| anyhow!("detecting image type: {e}"))?
        {
            ImageType::Png => ImageFormat::Png,
            ImageType::Jpeg => ImageFormat::Jpeg,
            ImageType::Gif => ImageFormat::Gif,
            ImageType::Bmp => ImageFormat::Bmp,
            other => bail!("unsupported image type for docx embedding: {other:?}"),
        };
        let size = imagesize::blob_size(bytes).map_err(|e| anyhow!("reading image size: {e}"))?;
        if size.width == 0 || size.height == 0 {
            bail!("image has zero size: {}x{}", size.width, size.height);
        }
        Ok(Self {
            format,
            width_px: size.width as u64,
            height_px: size.height as u64,
        })
    }

    /// Display extent in EMU at `width_emu`, keeping the aspect ratio.
    pub fn extent(&self, width_emu: u64) -> (u64, u64) {
        let cy = (width_emu as u128 * self.height_px as u128 / self.width_px as u128) as u64;
        (width_emu, cy)
    }
}

pub fn inches_to_emu(inches: f64) -> u64 {
    (inches * EMU_PER_INCH).round() as u64
}

/// A `w:r` holding one inline picture that points at relationship `rel_id`.
pub fn inline_run_xml(rel_id: &str, doc_pr_id: u32, file_name: &str, cx: u64, cy: u64) -> String {
    let file_name = quick_xml::escape::escape(file_name);
    format!(
        concat!(
            r#"<w:r><w:drawing>"#,
            r#"<wp:inline distT="0" distB="0" distL="0" distR="0" xmlns:wp="http://schemas.openxmlformats.org/drawingml/2006/wordprocessingDrawing">"#,
            r#"<wp:extent cx="{cx}" cy="{cy}"/>"#,
            r#"<wp:docPr id="{id}" name="Picture {id}"/>"#,
            r#"<wp:cNvGraphicFramePr><a:graphicFrameLocks xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" noChangeAspect="1"/></wp:cNvGraphicFramePr>"#,
            r#"<a:graphic xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main">"#,
            r#"<a:graphicData uri="http://schemas.openxmlformats.org/drawingml/2006/picture">"#,
            r#"<pic:pic xmlns:pic="http://schemas.openxmlformats.org/drawingml/2006/picture">"#,
            r#"<pic:nvPicPr><pic:cNvPr id="0" name="{name}"/><pic:cNvPicPr/></pic:nvPicPr>"#,
            r#"<pic:blipFill><a:blip r:embed="{rel}" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"/><a:stretch><a:fillRect/></a:stretch></pic:blipFill>"#,
            r#"<pic:spPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="{cx}" cy="{cy}"/></a:xfrm><a:prstGeom prst="rect"><a:avLst/></a:prstGeom></pic:spPr>"#,
            r#"</pic:pic></a:graphicData></a:graphic></wp:inline>"#,
            r#"</w:drawing></w:r>"#
        ),
        cx = cx,
        cy = cy,
        id = doc_pr_id,
        name = file_name,
        rel = rel_id,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_inches_is_fixed_emu_width() {
        assert_eq!(inches_to_emu(2.0), 1_828_800);
    }

    #[test]
    fn extent_keeps_aspect_ratio() {
        let info = ImageInfo {
            format: ImageFormat::Jpeg,
            width_px: 1200,
            height_px: 800,
        };
        assert_eq!(info.extent(1_828_800), (1_828_800, 1_219_200));
    }

    #[test]
    fn run_references_relationship() {
        let xml = inline_run_xml("rId9", 3, "毕业证.jpg", 10, 5);
        assert!(xml.contains(r#"r:embed="rId9""#));
        assert!(xml.contains(r#"<wp:docPr id="3" name="Picture 3"/>"#));
        assert!(xml.contains(r#"<wp:extent cx="10" cy="5"/>"#));
    }
}
