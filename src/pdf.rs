use crate::canvas::{Command, Document, Page};
use crate::font::StandardFont;
use crate::types::{Color, Pt, Size};
use fixed::types::I32F32;
use std::io::{self, Write};

#[derive(Debug, Clone)]
pub(crate) struct PdfOptions {
    pub document_title: Option<String>,
    pub producer: String,
}

impl Default for PdfOptions {
    fn default() -> Self {
        Self {
            document_title: None,
            producer: "fundform".to_string(),
        }
    }
}

const FONTS: [StandardFont; 2] = [StandardFont::Helvetica, StandardFont::HelveticaBold];

// Fixed object numbers; page content/page pairs follow from FIRST_PAGE_ID.
const CATALOG_ID: usize = 1;
const PAGES_ID: usize = 2;
const FIRST_FONT_ID: usize = 3;
const INFO_ID: usize = 5;
const FIRST_PAGE_ID: usize = 6;

pub(crate) fn document_to_pdf(document: &Document, options: &PdfOptions) -> io::Result<Vec<u8>> {
    let mut out = Vec::new();
    write_pdf(document, options, &mut out)?;
    Ok(out)
}

// Serializes the document. Output depends only on the inputs: no dates, no
// random ids.
pub(crate) fn write_pdf<W: Write>(
    document: &Document,
    options: &PdfOptions,
    writer: &mut W,
) -> io::Result<()> {
    let mut objects: Vec<String> = Vec::new();

    let page_ids: Vec<usize> = (0..document.pages.len())
        .map(|idx| FIRST_PAGE_ID + idx * 2 + 1)
        .collect();
    let kids = page_ids
        .iter()
        .map(|id| format!("{} 0 R", id))
        .collect::<Vec<_>>()
        .join(" ");

    objects.push(format!("<< /Type /Catalog /Pages {} 0 R >>", PAGES_ID));
    objects.push(format!(
        "<< /Type /Pages /Kids [{}] /Count {} >>",
        kids,
        page_ids.len()
    ));
    for font in FONTS {
        objects.push(font_object(font));
    }
    objects.push(info_object(options));

    let resources = font_resources();
    for (idx, page) in document.pages.iter().enumerate() {
        let content_id = FIRST_PAGE_ID + idx * 2;
        let content = render_page(page, document.page_size.height);
        objects.push(stream_object(&content));
        objects.push(format!(
            "<< /Type /Page /Parent {} 0 R /MediaBox {} /Resources << /Font {} >> /Contents {} 0 R >>",
            PAGES_ID,
            media_box(document.page_size),
            resources,
            content_id
        ));
    }

    build_pdf(writer, &objects, CATALOG_ID, INFO_ID)
}

fn font_object(font: StandardFont) -> String {
    format!(
        "<< /Type /Font /Subtype /Type1 /BaseFont /{} /Encoding /WinAnsiEncoding >>",
        font.base_font()
    )
}

fn font_resources() -> String {
    let entries = FONTS
        .iter()
        .enumerate()
        .map(|(idx, font)| format!("/{} {} 0 R", font.resource_name(), FIRST_FONT_ID + idx))
        .collect::<Vec<_>>();
    format!("<< {} >>", entries.join(" "))
}

fn info_object(options: &PdfOptions) -> String {
    let mut entries = vec![format!(
        "/Producer ({})",
        encode_winansi_pdf_string(&options.producer)
    )];
    if let Some(title) = options.document_title.as_deref() {
        entries.push(format!("/Title ({})", encode_winansi_pdf_string(title)));
    }
    format!("<< {} >>", entries.join(" "))
}

fn media_box(size: Size) -> String {
    format!("[0 0 {} {}]", fmt_pt(size.width), fmt_pt(size.height))
}

fn stream_object(content: &str) -> String {
    format!(
        "<< /Length {} >>\nstream\n{}\nendstream",
        content.len(),
        content
    )
}

fn build_pdf<W: Write>(
    writer: &mut W,
    objects: &[String],
    catalog_id: usize,
    info_id: usize,
) -> io::Result<()> {
    let mut offset = 0usize;
    write_bytes(writer, b"%PDF-1.7\n%\xE2\xE3\xCF\xD3\n", &mut offset)?;

    let mut offsets = Vec::with_capacity(objects.len());
    for (index, body) in objects.iter().enumerate() {
        offsets.push(offset);
        write_bytes(writer, format!("{} 0 obj\n", index + 1).as_bytes(), &mut offset)?;
        write_bytes(writer, body.as_bytes(), &mut offset)?;
        write_bytes(writer, b"\nendobj\n", &mut offset)?;
    }

    let xref_start = offset;
    let mut xref = format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1);
    for obj_offset in offsets {
        xref.push_str(&format!("{:010} 00000 n \n", obj_offset));
    }
    xref.push_str(&format!(
        "trailer\n<< /Size {} /Root {} 0 R /Info {} 0 R >>\nstartxref\n{}\n%%EOF\n",
        objects.len() + 1,
        catalog_id,
        info_id,
        xref_start
    ));
    write_bytes(writer, xref.as_bytes(), &mut offset)?;
    writer.flush()
}

fn write_bytes<W: Write>(writer: &mut W, data: &[u8], offset: &mut usize) -> io::Result<()> {
    writer.write_all(data)?;
    *offset += data.len();
    Ok(())
}

fn render_page(page: &Page, page_height: Pt) -> String {
    let mut out = String::new();
    let mut current_font_size = Pt::from_f32(12.0);
    let mut current_font = StandardFont::Helvetica;

    for cmd in &page.commands {
        match cmd {
            Command::SaveState => out.push_str("q\n"),
            Command::RestoreState => out.push_str("Q\n"),
            Command::Meta { .. } => {}
            Command::SetFillColor(color) => out.push_str(&color_to_pdf_fill(*color)),
            Command::SetStrokeColor(color) => out.push_str(&color_to_pdf_stroke(*color)),
            Command::SetLineWidth(width) => {
                out.push_str(&format!("{} w\n", fmt_pt(*width)));
            }
            Command::SetLineCap(cap) => out.push_str(&format!("{} J\n", cap)),
            Command::SetLineJoin(join) => out.push_str(&format!("{} j\n", join)),
            Command::SetFont(font) => current_font = *font,
            Command::SetFontSize(size) => current_font_size = *size,
            Command::MoveTo { x, y } => {
                out.push_str(&format!("{} {} m\n", fmt_pt(*x), fmt_pt(page_height - *y)));
            }
            Command::LineTo { x, y } => {
                out.push_str(&format!("{} {} l\n", fmt_pt(*x), fmt_pt(page_height - *y)));
            }
            Command::CurveTo {
                x1,
                y1,
                x2,
                y2,
                x,
                y,
            } => {
                out.push_str(&format!(
                    "{} {} {} {} {} {} c\n",
                    fmt_pt(*x1),
                    fmt_pt(page_height - *y1),
                    fmt_pt(*x2),
                    fmt_pt(page_height - *y2),
                    fmt_pt(*x),
                    fmt_pt(page_height - *y),
                ));
            }
            Command::ClosePath => out.push_str("h\n"),
            Command::Fill => out.push_str("f\n"),
            Command::FillEvenOdd => out.push_str("f*\n"),
            Command::Stroke => out.push_str("S\n"),
            Command::FillStroke => out.push_str("B\n"),
            Command::EndPath => out.push_str("n\n"),
            Command::DrawString { x, y, text } => {
                out.push_str("BT\n");
                out.push_str(&format!(
                    "/{} {} Tf\n",
                    current_font.resource_name(),
                    fmt_pt(current_font_size)
                ));
                out.push_str(&format!(
                    "{} {} Td\n",
                    fmt_pt(*x),
                    fmt_pt(page_height - *y - current_font_size)
                ));
                out.push_str(&format!("({}) Tj\n", encode_winansi_pdf_string(text)));
                out.push_str("ET\n");
            }
            Command::DrawRect {
                x,
                y,
                width,
                height,
            } => {
                out.push_str(&format!(
                    "{} {} {} {} re\nf\n",
                    fmt_pt(*x),
                    fmt_pt(page_height - *y - *height),
                    fmt_pt(*width),
                    fmt_pt(*height)
                ));
            }
            Command::StrokeRect {
                x,
                y,
                width,
                height,
            } => {
                out.push_str(&format!(
                    "{} {} {} {} re\nS\n",
                    fmt_pt(*x),
                    fmt_pt(page_height - *y - *height),
                    fmt_pt(*width),
                    fmt_pt(*height)
                ));
            }
        }
    }

    out
}

// Encodes text for a WinAnsi literal string body (without the parentheses).
// Characters outside cp1252 become `?`; bytes outside printable ASCII are
// written as octal escapes so the result is pure ASCII.
pub(crate) fn encode_winansi_pdf_string(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for byte in input.chars().map(winansi_byte) {
        match byte {
            b'\\' => out.push_str("\\\\"),
            b'(' => out.push_str("\\("),
            b')' => out.push_str("\\)"),
            b if !(0x20..0x7f).contains(&b) => out.push_str(&format!("\\{:03o}", b)),
            b => out.push(b as char),
        }
    }
    out
}

pub(crate) fn winansi_byte(ch: char) -> u8 {
    match ch {
        '\u{0000}'..='\u{007F}' => ch as u8,
        '\u{00A0}'..='\u{00FF}' => ch as u8,
        '\u{20AC}' => 0x80,
        '\u{201A}' => 0x82,
        '\u{0192}' => 0x83,
        '\u{201E}' => 0x84,
        '\u{2026}' => 0x85,
        '\u{2020}' => 0x86,
        '\u{2021}' => 0x87,
        '\u{02C6}' => 0x88,
        '\u{2030}' => 0x89,
        '\u{0160}' => 0x8A,
        '\u{2039}' => 0x8B,
        '\u{0152}' => 0x8C,
        '\u{017D}' => 0x8E,
        '\u{2018}' => 0x91,
        '\u{2019}' => 0x92,
        '\u{201C}' => 0x93,
        '\u{201D}' => 0x94,
        '\u{2022}' => 0x95,
        '\u{2013}' => 0x96,
        '\u{2014}' => 0x97,
        '\u{02DC}' => 0x98,
        '\u{2122}' => 0x99,
        '\u{0161}' => 0x9A,
        '\u{203A}' => 0x9B,
        '\u{0153}' => 0x9C,
        '\u{017E}' => 0x9E,
        '\u{0178}' => 0x9F,
        _ => b'?',
    }
}

pub(crate) fn fmt(value: f32) -> String {
    if !value.is_finite() {
        return "0".to_string();
    }
    let fixed = I32F32::saturating_from_num(value);
    let scaled = (fixed * I32F32::from_num(1000)).round();
    let milli: i64 = scaled.to_num();
    format_milli(milli)
}

pub(crate) fn format_milli(milli: i64) -> String {
    if milli == 0 {
        return "0".to_string();
    }
    let sign = if milli < 0 { "-" } else { "" };
    let abs = milli.abs();
    let int_part = abs / 1000;
    let frac_part = abs % 1000;
    if frac_part == 0 {
        format!("{}{}", sign, int_part)
    } else {
        let mut s = format!("{}{}.{:03}", sign, int_part, frac_part);
        while s.ends_with('0') {
            s.pop();
        }
        s
    }
}

pub(crate) fn fmt_pt(value: Pt) -> String {
    format_milli(value.to_milli_i64())
}

fn clamp_unit(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

fn color_to_pdf_fill(color: Color) -> String {
    format!(
        "{} {} {} rg\n",
        fmt(clamp_unit(color.r)),
        fmt(clamp_unit(color.g)),
        fmt(clamp_unit(color.b))
    )
}

fn color_to_pdf_stroke(color: Color) -> String {
    format!(
        "{} {} {} RG\n",
        fmt(clamp_unit(color.r)),
        fmt(clamp_unit(color.g)),
        fmt(clamp_unit(color.b))
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::Canvas;

    fn sample_document() -> Document {
        let mut canvas = Canvas::new(Size::letter());
        canvas.set_font(StandardFont::HelveticaBold);
        canvas.set_font_size(Pt::from_f32(12.0));
        canvas.draw_string(Pt::from_f32(36.0), Pt::from_f32(36.0), "Café (draft)\u{2026}");
        canvas.set_stroke_color(Color::rgb(0.5, 0.5, 0.5));
        canvas.stroke_rect(
            Pt::from_f32(36.0),
            Pt::from_f32(60.0),
            Pt::from_f32(100.0),
            Pt::from_f32(20.0),
        );
        canvas.finish()
    }

    #[test]
    fn output_parses_and_has_expected_structure() {
        let bytes = document_to_pdf(&sample_document(), &PdfOptions::default()).expect("pdf");
        let doc = lopdf::Document::load_mem(&bytes).expect("parse");
        let pages = doc.get_pages();
        assert_eq!(pages.len(), 1);
        let page_id = *pages.get(&1).expect("page 1");
        let content = doc.get_page_content(page_id).expect("content");
        let text = String::from_utf8_lossy(&content);
        assert!(text.contains("/F2 12 Tf"));
        // 792 - 36 - 12
        assert!(text.contains("36 744 Td"));
        assert!(text.contains("(Caf\\351 \\(draft\\)\\205) Tj"));
        assert!(text.contains("36 712 100 20 re\nS"));
    }

    #[test]
    fn output_is_deterministic() {
        let a = document_to_pdf(&sample_document(), &PdfOptions::default()).expect("pdf");
        let b = document_to_pdf(&sample_document(), &PdfOptions::default()).expect("pdf");
        assert_eq!(a, b);
    }

    #[test]
    fn winansi_encoding_replaces_unmapped_characters() {
        assert_eq!(encode_winansi_pdf_string("a\u{4E2D}b"), "a?b");
        assert_eq!(encode_winansi_pdf_string("\\"), "\\\\");
        assert_eq!(encode_winansi_pdf_string("line\nbreak"), "line\\012break");
    }

    #[test]
    fn format_milli_trims_trailing_zeros() {
        assert_eq!(format_milli(12_500), "12.5");
        assert_eq!(format_milli(-250), "-0.25");
        assert_eq!(format_milli(3_000), "3");
        assert_eq!(fmt(0.1), "0.1");
    }
}
