use crate::canvas::{Canvas, Document};
use crate::error::FundFormError;
use crate::font::{StandardFont, measure_text_width, truncate_with_ellipsis, wrap_text};
use crate::layout::{
    self, AUTH_FONT, AUTH_LEADING, AUTHORIZATION_TITLE, LayoutConfig, SECTIONS, SIGNATURE_PAIRS,
};
use crate::mapping::presentation_values;
use crate::pdf::{PdfOptions, document_to_pdf};
use crate::record::ApplicationRecord;
use crate::svg::LogoArt;
use crate::types::{Color, Margins, Pt, Size};
use base64::Engine;
use std::collections::BTreeMap;
use std::path::PathBuf;

pub const PLACEHOLDER: &str = "-";
pub const DOCUMENT_TITLE: &str = "Business Funding Application";

const MAX_MARGIN: f32 = 108.0;
const LOGO_MAX_WIDTH: f32 = 200.0;
const LOGO_MAX_HEIGHT: f32 = 56.0;
const HEADER_FONT: f32 = 16.0;
// Step used when searching for the clause font size.
const AUTH_FONT_STEP: f32 = 0.25;

const NAVY: Color = Color {
    r: 0.122,
    g: 0.227,
    b: 0.373,
};
const RULE_GRAY: Color = Color {
    r: 0.6,
    g: 0.6,
    b: 0.6,
};
const LABEL_GRAY: Color = Color {
    r: 0.33,
    g: 0.33,
    b: 0.33,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EmptyFields {
    #[default]
    Placeholder,
    Blank,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogoSource {
    Path(PathBuf),
    Svg(String),
    // `data:image/svg+xml;base64,...` or a plain `data:...,<svg ...>` URI.
    DataUri(String),
}

#[derive(Debug, Clone)]
pub struct RenderOptions {
    pub company_name: String,
    pub margin: f32,
    pub logo: Option<LogoSource>,
    pub header_scale: f32,
    pub empty_fields: EmptyFields,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            company_name: String::new(),
            margin: 36.0,
            logo: None,
            header_scale: 1.0,
            empty_fields: EmptyFields::Placeholder,
        }
    }
}

impl RenderOptions {
    fn margins(&self) -> Margins {
        let margin = if self.margin.is_finite() {
            self.margin.clamp(0.0, MAX_MARGIN)
        } else {
            36.0
        };
        Margins::all(margin)
    }

    fn header_scale(&self) -> f32 {
        if self.header_scale.is_finite() && self.header_scale > 0.0 {
            self.header_scale.clamp(0.25, 2.0)
        } else {
            1.0
        }
    }

    fn display_name(&self) -> &str {
        let name = self.company_name.trim();
        if name.is_empty() { DOCUMENT_TITLE } else { name }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogoOutcome {
    Drawn,
    NotConfigured,
    // Configured but missing, unreadable or not usable SVG; the text header
    // was drawn instead.
    Unusable,
}

impl LogoOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            LogoOutcome::Drawn => "drawn",
            LogoOutcome::NotConfigured => "none",
            LogoOutcome::Unusable => "unusable",
        }
    }
}

#[derive(Debug, Clone)]
pub struct LayoutReport {
    pub scale: f32,
    pub estimated: Pt,
    pub available: Pt,
    pub header_height: Pt,
    pub config: LayoutConfig,
    pub clause_font: Pt,
    pub clause_truncated: bool,
    pub logo: LogoOutcome,
    pub body_bottom: Pt,
}

pub fn render(record: &ApplicationRecord, options: &RenderOptions) -> Result<Vec<u8>, FundFormError> {
    let (document, _) = layout_document(record, options);
    serialize(&document)
}

pub fn render_blank_specimen(options: &RenderOptions) -> Result<Vec<u8>, FundFormError> {
    render(&ApplicationRecord::blank(), options)
}

pub(crate) fn serialize(document: &Document) -> Result<Vec<u8>, FundFormError> {
    let pdf_options = PdfOptions {
        document_title: Some(DOCUMENT_TITLE.to_string()),
        ..PdfOptions::default()
    };
    document_to_pdf(document, &pdf_options)
        .map_err(|err| FundFormError::Serialization(err.to_string()))
}

// Lays out the single page. Never fails: a bad logo falls back to a text
// header and overflowing text is truncated.
pub fn layout_document(record: &ApplicationRecord, options: &RenderOptions) -> (Document, LayoutReport) {
    let page = Size::letter();
    let margins = options.margins();
    let left = margins.left;
    let width = page.width - margins.left - margins.right;
    let values = presentation_values(record);
    let mut canvas = Canvas::new(page);

    let (logo, logo_outcome) = load_logo(options.logo.as_ref());
    let body_top = draw_header(&mut canvas, options, logo.as_ref(), left, width, margins.top);
    let header_height = body_top - margins.top;

    let clause = layout::authorization_clause(&options.company_name);
    let available = page.height - margins.top - margins.bottom - header_height;
    let estimated = layout::estimate_height(&clause, width);
    let scale = layout::resolve_scale(available, estimated);
    let config = LayoutConfig::for_scale(scale);

    let mut y = body_top;
    y = draw_legend(&mut canvas, &config, left, width, y);
    for section in SECTIONS {
        y = draw_section_bar(&mut canvas, &config, section.title, left, width, y);
        for row in section.rows {
            let widths = layout::cell_widths(row, width);
            let mut x = left;
            for (cell, cell_width) in row.iter().zip(widths) {
                let value = cell_value(&values, cell.key, options.empty_fields);
                let label = layout::display_label(cell.label, cell.key);
                draw_cell(&mut canvas, &config, x, y, cell_width, &label, value);
                canvas.meta("field", cell.key);
                x += cell_width;
            }
            y += config.row_height;
        }
        y += config.section_gap;
    }

    y = draw_section_bar(&mut canvas, &config, AUTHORIZATION_TITLE, left, width, y);
    y += config.cell_padding;
    let nominal_clause = layout::clause_height(&clause, LayoutConfig::nominal().auth_font, width);
    let budget = nominal_clause * scale;
    let fitted = fit_clause(&clause, config.auth_font, width, budget);
    draw_clause(&mut canvas, &fitted, left, y);
    y += budget + config.cell_padding;
    y = draw_signature_block(&mut canvas, &config, &values, left, width, y);

    draw_footer(&mut canvas, &config, options.display_name(), left, width, page.height - margins.bottom);

    let report = LayoutReport {
        scale,
        estimated,
        available,
        header_height,
        config,
        clause_font: fitted.font_size,
        clause_truncated: fitted.truncated,
        logo: logo_outcome,
        body_bottom: y + config.footer_reserve(),
    };
    (canvas.finish(), report)
}

fn cell_value<'a>(values: &'a BTreeMap<String, String>, key: &str, mode: EmptyFields) -> &'a str {
    match values.get(key) {
        Some(value) if !value.is_empty() => value.as_str(),
        _ => match mode {
            EmptyFields::Placeholder => PLACEHOLDER,
            EmptyFields::Blank => "",
        },
    }
}

fn load_logo(source: Option<&LogoSource>) -> (Option<LogoArt>, LogoOutcome) {
    let Some(source) = source else {
        return (None, LogoOutcome::NotConfigured);
    };
    let markup = match source {
        LogoSource::Svg(markup) => Some(markup.clone()),
        LogoSource::Path(path) => std::fs::read_to_string(path).ok(),
        LogoSource::DataUri(uri) => parse_data_uri(uri)
            .filter(|(mime, _)| mime.contains("svg"))
            .and_then(|(_, data)| String::from_utf8(data).ok()),
    };
    match markup.as_deref().and_then(LogoArt::parse) {
        Some(logo) => (Some(logo), LogoOutcome::Drawn),
        None => (None, LogoOutcome::Unusable),
    }
}

fn parse_data_uri(uri: &str) -> Option<(String, Vec<u8>)> {
    let rest = uri.trim().strip_prefix("data:")?;
    let (header, data_part) = rest.split_once(',')?;
    let mime = header
        .split(';')
        .next()
        .filter(|m| !m.is_empty())
        .unwrap_or("text/plain")
        .to_ascii_lowercase();
    let data = if header.split(';').any(|p| p.eq_ignore_ascii_case("base64")) {
        base64::engine::general_purpose::STANDARD
            .decode(data_part.trim())
            .ok()?
    } else {
        data_part.as_bytes().to_vec()
    };
    Some((mime, data))
}

// Draws the logo or the text header plus the divider. Returns the y where
// body content starts.
fn draw_header(
    canvas: &mut Canvas,
    options: &RenderOptions,
    logo: Option<&LogoArt>,
    left: Pt,
    width: Pt,
    top: Pt,
) -> Pt {
    let hs = options.header_scale();
    let mut y = top;
    match logo {
        Some(logo) => {
            let max_w = Pt::from_f32(LOGO_MAX_WIDTH * hs).min(width);
            let max_h = Pt::from_f32(LOGO_MAX_HEIGHT * hs);
            let (w, h, s) = logo.fit(max_w, max_h);
            logo.draw(canvas, left + (width - w) / 2, y, s);
            y += h;
        }
        None => {
            let size = Pt::from_f32(HEADER_FONT * hs);
            let text = truncate_with_ellipsis(
                StandardFont::HelveticaBold,
                size,
                options.display_name(),
                width,
            );
            let text_w = measure_text_width(StandardFont::HelveticaBold, size, &text);
            canvas.set_font(StandardFont::HelveticaBold);
            canvas.set_font_size(size);
            canvas.set_fill_color(NAVY);
            canvas.draw_string(left + (width - text_w) / 2, y, text);
            y += size;
        }
    }
    y += Pt::from_f32(6.0 * hs);
    canvas.set_stroke_color(RULE_GRAY);
    canvas.set_line_width(Pt::from_f32(0.75));
    canvas.hline(left, left + width, y);
    y + Pt::from_f32(8.0 * hs)
}

fn draw_legend(canvas: &mut Canvas, config: &LayoutConfig, left: Pt, width: Pt, y: Pt) -> Pt {
    let note = "Fields marked with * are required.";
    canvas.set_fill_color(Color::BLACK);
    canvas.set_font(StandardFont::HelveticaBold);
    canvas.set_font_size(config.small_font);
    canvas.draw_string(left, y, DOCUMENT_TITLE.to_ascii_uppercase());
    canvas.set_font(StandardFont::Helvetica);
    let note_w = measure_text_width(StandardFont::Helvetica, config.small_font, note);
    canvas.draw_string(left + width - note_w, y, note);
    y + config.legend_height()
}

// Top of a text line whose glyphs sit vertically centered in a band.
fn centered_text_top(band_top: Pt, band_height: Pt, font_size: Pt) -> Pt {
    let cap = font_size * 0.72f32;
    band_top + (band_height + cap) / 2 - font_size
}

fn draw_section_bar(
    canvas: &mut Canvas,
    config: &LayoutConfig,
    title: &str,
    left: Pt,
    width: Pt,
    y: Pt,
) -> Pt {
    let h = config.section_header_height;
    canvas.set_fill_color(NAVY);
    canvas.draw_rect(left, y, width, h);
    canvas.set_fill_color(Color::WHITE);
    canvas.set_font(StandardFont::HelveticaBold);
    canvas.set_font_size(config.section_title_font);
    canvas.draw_string(
        left + config.cell_padding * 2,
        centered_text_top(y, h, config.section_title_font),
        title.to_string(),
    );
    y + h
}

fn draw_cell(
    canvas: &mut Canvas,
    config: &LayoutConfig,
    x: Pt,
    y: Pt,
    width: Pt,
    label: &str,
    value: &str,
) {
    let pad = config.cell_padding;
    let inner = width - pad * 2;

    canvas.set_stroke_color(RULE_GRAY);
    canvas.set_line_width(Pt::from_f32(0.5));
    canvas.stroke_rect(x, y, width, config.row_height);

    canvas.set_fill_color(LABEL_GRAY);
    canvas.set_font(StandardFont::HelveticaBold);
    canvas.set_font_size(config.label_font);
    canvas.draw_string(
        x + pad,
        y + pad,
        truncate_with_ellipsis(StandardFont::HelveticaBold, config.label_font, label, inner),
    );

    if value.is_empty() {
        return;
    }
    canvas.set_fill_color(Color::BLACK);
    canvas.set_font(StandardFont::Helvetica);
    canvas.set_font_size(config.value_font);
    canvas.draw_string(
        x + pad,
        y + config.row_height - pad - config.value_font,
        truncate_with_ellipsis(StandardFont::Helvetica, config.value_font, value, inner),
    );
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct FittedClause {
    pub font_size: Pt,
    pub lines: Vec<String>,
    pub truncated: bool,
}

// Largest size at or below `nominal`, in `AUTH_FONT_STEP` steps down to the
// floor, whose wrapped height fits `budget`. When even the floor does not
// fit, the lines that fit are kept and the last one ends in an ellipsis.
pub(crate) fn fit_clause(clause: &str, nominal: Pt, width: Pt, budget: Pt) -> FittedClause {
    let floor = Pt::from_f32(AUTH_FONT.1).min(nominal);
    let step = Pt::from_f32(AUTH_FONT_STEP);
    let mut sizes = Vec::new();
    let mut size = nominal;
    while size > floor {
        sizes.push(size);
        size -= step;
    }
    sizes.push(floor);

    let fits = |size: Pt| layout::clause_height(clause, size, width) <= budget;

    // Heights shrink as the size shrinks, so the fitting sizes form a suffix.
    if fits(sizes[0]) {
        return FittedClause {
            font_size: sizes[0],
            lines: wrap_text(StandardFont::Helvetica, sizes[0], clause, width),
            truncated: false,
        };
    }
    let last = sizes.len() - 1;
    if fits(sizes[last]) {
        let (mut lo, mut hi) = (0usize, last);
        while hi - lo > 1 {
            let mid = (lo + hi) / 2;
            if fits(sizes[mid]) {
                hi = mid;
            } else {
                lo = mid;
            }
        }
        return FittedClause {
            font_size: sizes[hi],
            lines: wrap_text(StandardFont::Helvetica, sizes[hi], clause, width),
            truncated: false,
        };
    }

    let lines = wrap_text(StandardFont::Helvetica, floor, clause, width);
    let line_height = floor * AUTH_LEADING;
    let max_lines = if line_height > Pt::ZERO {
        let fitting = budget.to_milli_i64() / line_height.to_milli_i64().max(1);
        (fitting as usize).clamp(1, lines.len().max(1))
    } else {
        1
    };
    let mut kept: Vec<String> = lines.iter().take(max_lines).cloned().collect();
    if let Some(tail) = kept.last_mut() {
        let remainder = lines[max_lines - 1..].join(" ");
        *tail = truncate_with_ellipsis(StandardFont::Helvetica, floor, &remainder, width);
    }
    FittedClause {
        font_size: floor,
        lines: kept,
        truncated: true,
    }
}

fn draw_clause(canvas: &mut Canvas, fitted: &FittedClause, left: Pt, top: Pt) {
    canvas.set_fill_color(Color::BLACK);
    canvas.set_font(StandardFont::Helvetica);
    canvas.set_font_size(fitted.font_size);
    let line_height = fitted.font_size * AUTH_LEADING;
    let mut y = top;
    for line in &fitted.lines {
        canvas.draw_string(left, y, line.clone());
        y += line_height;
    }
}

fn draw_signature_block(
    canvas: &mut Canvas,
    config: &LayoutConfig,
    values: &BTreeMap<String, String>,
    left: Pt,
    width: Pt,
    mut y: Pt,
) -> Pt {
    let gutter = config.section_gap * 2;
    let column = (width - gutter) / 2;
    for (first, second) in SIGNATURE_PAIRS {
        let rule_y = y + config.signature_line_height - config.cell_padding;
        for ((label, key), x) in [(first, left), (second, left + column + gutter)] {
            let value = values.get(key).map(String::as_str).unwrap_or("");
            draw_signature_line(canvas, config, x, column, rule_y, &layout::display_label(label, key), value);
            canvas.meta("signature", key);
        }
        y += config.signature_line_height;
    }
    y
}

fn draw_signature_line(
    canvas: &mut Canvas,
    config: &LayoutConfig,
    x: Pt,
    width: Pt,
    rule_y: Pt,
    label: &str,
    value: &str,
) {
    let pad = config.cell_padding;
    // Labels may take at most 45% of the column.
    let label_max = width.mul_ratio(45, 100);
    let label = truncate_with_ellipsis(StandardFont::HelveticaBold, config.label_font, label, label_max);
    let label_w = measure_text_width(StandardFont::HelveticaBold, config.label_font, &label);

    canvas.set_fill_color(LABEL_GRAY);
    canvas.set_font(StandardFont::HelveticaBold);
    canvas.set_font_size(config.label_font);
    canvas.draw_string(x, rule_y - config.label_font, label);

    let rule_start = x + label_w + pad;
    let rule_end = x + width;
    canvas.set_stroke_color(Color::BLACK);
    canvas.set_line_width(Pt::from_f32(0.5));
    canvas.hline(rule_start, rule_end, rule_y);

    if value.is_empty() {
        return;
    }
    let room = rule_end - rule_start - pad * 2;
    canvas.set_fill_color(Color::BLACK);
    canvas.set_font(StandardFont::Helvetica);
    canvas.set_font_size(config.value_font);
    canvas.draw_string(
        rule_start + pad,
        rule_y - config.value_font - Pt::from_f32(1.0),
        truncate_with_ellipsis(StandardFont::Helvetica, config.value_font, value, room),
    );
}

fn draw_footer(canvas: &mut Canvas, config: &LayoutConfig, name: &str, left: Pt, width: Pt, bottom: Pt) {
    let text = truncate_with_ellipsis(StandardFont::Helvetica, config.small_font, name, width);
    let text_w = measure_text_width(StandardFont::Helvetica, config.small_font, &text);
    canvas.set_fill_color(LABEL_GRAY);
    canvas.set_font(StandardFont::Helvetica);
    canvas.set_font_size(config.small_font);
    canvas.draw_string(left + (width - text_w) / 2, bottom - config.small_font, text);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::font::ELLIPSIS;

    fn cell_count() -> usize {
        SECTIONS.iter().flat_map(|s| s.rows.iter()).map(|r| r.len()).sum()
    }

    fn full_record(len: usize) -> ApplicationRecord {
        let mut record = ApplicationRecord::blank();
        for section in SECTIONS {
            for row in section.rows {
                for cell in row.iter() {
                    record.set(cell.key, "W".repeat(len));
                }
            }
        }
        for ((_, a), (_, b)) in SIGNATURE_PAIRS {
            record.set(a, "M".repeat(len));
            record.set(b, "M".repeat(len));
        }
        record
    }

    fn page_count(bytes: &[u8]) -> usize {
        lopdf::Document::load_mem(bytes).expect("parse").get_pages().len()
    }

    #[test]
    fn empty_record_renders_placeholders_on_one_page() {
        let (doc, report) = layout_document(&ApplicationRecord::blank(), &RenderOptions::default());
        assert_eq!(doc.pages.len(), 1);
        let dashes = doc.drawn_strings().iter().filter(|s| **s == PLACEHOLDER).count();
        assert_eq!(dashes, cell_count());
        assert_eq!(doc.meta_values("field").len(), cell_count());
        assert_eq!(report.logo, LogoOutcome::NotConfigured);

        let bytes = render(&ApplicationRecord::blank(), &RenderOptions::default()).expect("pdf");
        assert!(!bytes.is_empty());
        assert_eq!(page_count(&bytes), 1);
    }

    #[test]
    fn blank_mode_draws_no_placeholders() {
        let options = RenderOptions {
            empty_fields: EmptyFields::Blank,
            ..RenderOptions::default()
        };
        let (doc, _) = layout_document(&ApplicationRecord::blank(), &options);
        assert!(!doc.drawn_strings().contains(&PLACEHOLDER));
    }

    #[test]
    fn values_are_presented_and_required_labels_marked() {
        let record: ApplicationRecord = [
            ("legalName", "Acme Holdings LLC"),
            ("businessStartDate", "2019-07-01"),
            ("existingLoans", "yes"),
            ("ownerFirstName", "Grace"),
            ("ownerLastName", "Hopper"),
        ]
        .into_iter()
        .collect();
        let options = RenderOptions {
            company_name: "Northwind Capital".to_string(),
            ..RenderOptions::default()
        };
        let (doc, _) = layout_document(&record, &options);
        let strings = doc.drawn_strings();
        assert!(strings.contains(&"Acme Holdings LLC"));
        assert!(strings.contains(&"07/01/2019"));
        assert!(strings.contains(&"YES"));
        assert!(strings.contains(&"Legal Business Name *"));
        assert!(strings.contains(&"DBA"));
        assert!(strings.contains(&"Owner 1 Printed Name *"));
        assert!(strings.contains(&"Owner 2 Printed Name"));
        // Printed name appears in the ownership grid and on the signature line.
        assert_eq!(strings.iter().filter(|s| **s == "Grace Hopper").count(), 2);
        assert!(strings.iter().filter(|s| **s == "Northwind Capital").count() >= 2);
        assert!(strings.iter().any(|s| s.contains("Northwind")
            && s.len() > "Northwind Capital".len()));
    }

    #[test]
    fn rendering_is_deterministic() {
        let record = full_record(12);
        let options = RenderOptions {
            company_name: "Acme Funding".to_string(),
            ..RenderOptions::default()
        };
        let a = render(&record, &options).expect("pdf");
        let b = render(&record, &options).expect("pdf");
        assert_eq!(a, b);
    }

    #[test]
    fn maximal_record_stays_on_one_page_and_truncates_with_ellipsis() {
        let record = full_record(200);
        let (doc, report) = layout_document(&record, &RenderOptions::default());
        assert_eq!(doc.pages.len(), 1);
        let strings = doc.drawn_strings();
        assert!(strings.iter().any(|s| s.ends_with(ELLIPSIS)));
        let bytes = render(&record, &RenderOptions::default()).expect("pdf");
        assert_eq!(page_count(&bytes), 1);
    }

    #[test]
    fn body_ends_at_the_bottom_margin() {
        // Single-pass rescale: small overshoot past the margin is tolerated.
        let slack = Pt::from_f32(2.0);
        for (margin, header_scale) in [(36.0, 1.0), (108.0, 2.0)] {
            let options = RenderOptions {
                margin,
                header_scale,
                ..RenderOptions::default()
            };
            let (_, report) = layout_document(&full_record(200), &options);
            let limit = Size::letter().height - Pt::from_f32(margin);
            assert!(
                report.body_bottom <= limit + slack,
                "margin {margin}: body ends at {:?}, limit {:?}",
                report.body_bottom,
                limit
            );
        }
    }

    #[test]
    fn fonts_and_rows_respect_floors_under_heavy_compression() {
        let options = RenderOptions {
            margin: 500.0,
            company_name: "Q".repeat(400),
            header_scale: 2.0,
            logo: Some(LogoSource::Svg(
                r#"<svg width="100" height="100"><rect width="100" height="100"/></svg>"#.to_string(),
            )),
            ..RenderOptions::default()
        };
        let (_, report) = layout_document(&full_record(80), &options);
        let c = report.config;
        assert!(c.row_height >= Pt::from_f32(layout::ROW_HEIGHT.1));
        assert!(c.value_font >= Pt::from_f32(layout::VALUE_FONT.1));
        assert!(c.label_font >= Pt::from_f32(layout::LABEL_FONT.1));
        assert!(report.clause_font >= Pt::from_f32(AUTH_FONT.1));
        assert!(report.scale < 1.0);
    }

    #[test]
    fn bigger_header_never_increases_scale() {
        let record = full_record(10);
        let small = layout_document(
            &record,
            &RenderOptions {
                header_scale: 0.5,
                ..RenderOptions::default()
            },
        )
        .1;
        let large = layout_document(
            &record,
            &RenderOptions {
                header_scale: 2.0,
                ..RenderOptions::default()
            },
        )
        .1;
        assert!(large.available < small.available);
        assert!(large.scale <= small.scale);
    }

    #[test]
    fn missing_or_broken_logo_falls_back_to_text_header() {
        let missing = RenderOptions {
            company_name: "Acme".to_string(),
            logo: Some(LogoSource::Path(PathBuf::from("/nonexistent/fundform/logo.svg"))),
            ..RenderOptions::default()
        };
        let (doc, report) = layout_document(&ApplicationRecord::blank(), &missing);
        assert_eq!(report.logo, LogoOutcome::Unusable);
        assert!(doc.drawn_strings().contains(&"Acme"));

        let garbage = RenderOptions {
            logo: Some(LogoSource::Svg("<html>nope</html>".to_string())),
            ..RenderOptions::default()
        };
        assert_eq!(layout_document(&ApplicationRecord::blank(), &garbage).1.logo, LogoOutcome::Unusable);
    }

    #[test]
    fn data_uri_logo_is_drawn() {
        let svg = r##"<svg width="40" height="20"><rect width="40" height="20" fill="#123456"/></svg>"##;
        let encoded = base64::engine::general_purpose::STANDARD.encode(svg);
        let options = RenderOptions {
            company_name: "Acme".to_string(),
            logo: Some(LogoSource::DataUri(format!("data:image/svg+xml;base64,{encoded}"))),
            ..RenderOptions::default()
        };
        let (doc, report) = layout_document(&ApplicationRecord::blank(), &options);
        assert_eq!(report.logo, LogoOutcome::Drawn);
        // Footer still names the company; the header does not.
        assert_eq!(doc.drawn_strings().iter().filter(|s| **s == "Acme").count(), 1);

        let plain = RenderOptions {
            logo: Some(LogoSource::DataUri(format!("data:image/svg+xml,{svg}"))),
            ..RenderOptions::default()
        };
        assert_eq!(layout_document(&ApplicationRecord::blank(), &plain).1.logo, LogoOutcome::Drawn);
        assert_eq!(parse_data_uri("data:text/plain;base64,@@@"), None);
    }

    #[test]
    fn clause_fitting_prefers_largest_size_that_fits() {
        let clause = layout::authorization_clause("Acme");
        let width = Pt::from_f32(540.0);
        let nominal = Pt::from_f32(7.5);
        let full = layout::clause_height(&clause, nominal, width);

        let fitted = fit_clause(&clause, nominal, width, full);
        assert_eq!(fitted.font_size, nominal);
        assert!(!fitted.truncated);

        let tighter = full * 0.8f32;
        let fitted = fit_clause(&clause, nominal, width, tighter);
        assert!(fitted.font_size < nominal);
        assert!(layout::clause_height(&clause, fitted.font_size, width) <= tighter);
        let one_up = fitted.font_size + Pt::from_f32(AUTH_FONT_STEP);
        assert!(one_up > nominal || layout::clause_height(&clause, one_up, width) > tighter);
    }

    #[test]
    fn clause_is_truncated_when_floor_does_not_fit() {
        let clause = layout::authorization_clause("Acme");
        let fitted = fit_clause(&clause, Pt::from_f32(7.5), Pt::from_f32(540.0), Pt::from_f32(10.0));
        assert!(fitted.truncated);
        assert_eq!(fitted.font_size, Pt::from_f32(AUTH_FONT.1));
        assert_eq!(fitted.lines.len(), 1);
        assert!(fitted.lines[0].ends_with(ELLIPSIS));
    }
}
