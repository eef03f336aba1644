mod canvas;
mod debug;
mod error;
mod fill;
mod font;
mod generate;
mod layout;
mod mapping;
mod normalize;
mod pdf;
mod pdfinspect;
mod record;
mod render;
mod svg;
mod types;

pub use canvas::{Canvas, Command, Document, Page};
pub use debug::DebugLogger;
use debug::EventValue;
pub use error::FundFormError;
pub use fill::{
    FillOptions, FillReport, checked_template_path, fill_template, fill_template_bytes,
    fill_template_with_report,
};
pub use font::{ELLIPSIS, StandardFont, measure_text_width, truncate_with_ellipsis, wrap_text};
pub use generate::{GeneratedPdf, PdfSource, select_pipeline, sha256_hex};
pub use layout::{
    AUTHORIZATION_TITLE, Cell, LayoutConfig, SECTIONS, SIGNATURE_PAIRS, Section, SignaturePair,
    authorization_clause, cell_widths, clause_height, content_height, display_label,
    estimate_height, is_required, resolve_scale,
};
pub use mapping::{DATE_FIELDS, FIELD_ALIASES, YES_NO_FIELDS, presentation_values};
pub use normalize::{format_date, join_name, normalize_str, normalize_value, to_yes_no};
pub use pdfinspect::{
    PdfInspectError, PdfInspectErrorCode, PdfInspectReport, inspect_pdf_bytes, inspect_pdf_path,
};
pub use record::ApplicationRecord;
pub use render::{
    DOCUMENT_TITLE, EmptyFields, LayoutReport, LogoOutcome, LogoSource, PLACEHOLDER,
    RenderOptions, layout_document, render, render_blank_specimen,
};
pub use types::{Color, Margins, Pt, Size};

use std::path::PathBuf;

pub const ENV_COMPANY_NAME: &str = "FUNDFORM_COMPANY_NAME";
pub const ENV_TEMPLATE_PATH: &str = "FUNDFORM_TEMPLATE_PATH";
pub const ENV_LOGO_PATH: &str = "FUNDFORM_LOGO_PATH";
pub const ENV_FLATTEN: &str = "FUNDFORM_FLATTEN";
pub const ENV_DISALLOWED_TEMPLATES: &str = "FUNDFORM_DISALLOWED_TEMPLATES";

/// Configured generator for funding-application PDFs. Each call is
/// independent; the only shared state is the optional debug log.
#[derive(Debug, Clone)]
pub struct ApplicationPdf {
    render_options: RenderOptions,
    fill_options: FillOptions,
    debug: Option<DebugLogger>,
}

#[derive(Debug, Clone, Default)]
pub struct ApplicationPdfBuilder {
    render_options: RenderOptions,
    fill_options: FillOptions,
    debug_path: Option<PathBuf>,
}

impl ApplicationPdf {
    pub fn builder() -> ApplicationPdfBuilder {
        ApplicationPdfBuilder::new()
    }

    pub fn render_options(&self) -> &RenderOptions {
        &self.render_options
    }

    pub fn fill_options(&self) -> &FillOptions {
        &self.fill_options
    }

    fn emit_debug_summary(&self, context: &str) {
        if let Some(logger) = self.debug.as_ref() {
            logger.emit_summary(context);
            logger.flush();
        }
    }

    /// Fills the template when one is configured and usable, otherwise lays
    /// the application out from scratch. Only a layout failure is an error.
    pub fn generate(&self, record: &ApplicationRecord) -> Result<GeneratedPdf, FundFormError> {
        let attempt = self.fill_template(record);
        let generated = select_pipeline(Some(attempt), || self.render_layout(record));
        self.finish_generation(generated)
    }

    pub fn generate_layout(
        &self,
        record: &ApplicationRecord,
    ) -> Result<GeneratedPdf, FundFormError> {
        let generated = select_pipeline(None, || self.render_layout(record));
        self.finish_generation(generated)
    }

    fn finish_generation(
        &self,
        generated: Result<GeneratedPdf, FundFormError>,
    ) -> Result<GeneratedPdf, FundFormError> {
        if let Some(logger) = self.debug.as_ref() {
            match &generated {
                Ok(pdf) => {
                    if let Some(reason) = pdf.source.fallback_reason() {
                        logger.event("generate.fallback", &[("reason", EventValue::Str(reason))]);
                        logger.increment("generate.fallbacks", 1);
                    }
                    logger.event(
                        "generate.done",
                        &[
                            ("source", EventValue::Str(pdf.source.as_str())),
                            ("bytes", EventValue::Int(pdf.len() as u64)),
                            ("sha256", EventValue::Str(&pdf.sha256)),
                        ],
                    );
                    logger.increment(&format!("generate.{}", pdf.source.as_str()), 1);
                }
                Err(err) => {
                    logger.event(
                        "generate.error",
                        &[
                            ("code", EventValue::Str(err.code())),
                            ("message", EventValue::Str(&err.to_string())),
                        ],
                    );
                }
            }
        }
        self.emit_debug_summary("generate");
        generated
    }

    pub fn render_layout(&self, record: &ApplicationRecord) -> Result<Vec<u8>, FundFormError> {
        let (document, report) = layout_document(record, &self.render_options);
        if let Some(logger) = self.debug.as_ref() {
            logger.event(
                "layout.scale",
                &[
                    ("estimated", EventValue::Num(report.estimated.to_f32() as f64)),
                    ("available", EventValue::Num(report.available.to_f32() as f64)),
                    ("scale", EventValue::Num(report.scale as f64)),
                    ("clause_font", EventValue::Num(report.clause_font.to_f32() as f64)),
                    ("clause_truncated", EventValue::Bool(report.clause_truncated)),
                ],
            );
            logger.event("layout.logo", &[("outcome", EventValue::Str(report.logo.as_str()))]);
            logger.increment("layout.renders", 1);
        }
        render::serialize(&document)
    }

    pub fn fill_template(&self, record: &ApplicationRecord) -> Result<Vec<u8>, FundFormError> {
        let result = fill_template_with_report(record, &self.fill_options);
        if let Some(logger) = self.debug.as_ref() {
            match &result {
                Ok((_, report)) => {
                    logger.event(
                        "fill.fields",
                        &[
                            ("found", EventValue::Int(report.fields_found as u64)),
                            ("written", EventValue::Int(report.fields_written as u64)),
                            ("skipped", EventValue::Int(report.fields_skipped as u64)),
                            ("flattened", EventValue::Int(report.widgets_flattened as u64)),
                        ],
                    );
                    logger.increment("fill.fields_written", report.fields_written as u64);
                }
                Err(err) => {
                    logger.event("fill.error", &[("code", EventValue::Str(err.code()))]);
                }
            }
        }
        result.map(|(bytes, _)| bytes)
    }

    pub fn render_blank_specimen(&self) -> Result<Vec<u8>, FundFormError> {
        self.render_layout(&ApplicationRecord::blank())
    }
}

impl ApplicationPdfBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from the `FUNDFORM_*` environment variables. Unset or
    /// unparseable variables leave the defaults in place.
    pub fn from_env() -> Self {
        Self::new().apply_env(|key| std::env::var(key).ok())
    }

    fn apply_env(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let value = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        if let Some(name) = value(ENV_COMPANY_NAME) {
            self = self.company_name(name);
        }
        if let Some(path) = value(ENV_TEMPLATE_PATH) {
            self = self.template_path(path);
        }
        if let Some(logo) = value(ENV_LOGO_PATH) {
            self = if logo.starts_with("data:") {
                self.logo(LogoSource::DataUri(logo))
            } else {
                self.logo_path(logo)
            };
        }
        if let Some(flag) = value(ENV_FLATTEN) {
            match to_yes_no(&flag).as_str() {
                "YES" => self = self.flatten(true),
                "NO" => self = self.flatten(false),
                _ => {}
            }
        }
        if let Some(patterns) = value(ENV_DISALLOWED_TEMPLATES) {
            for pattern in patterns.split(',') {
                self = self.disallow_template_pattern(pattern);
            }
        }
        self
    }

    pub fn company_name(mut self, name: impl Into<String>) -> Self {
        self.render_options.company_name = name.into();
        self
    }

    pub fn margin(mut self, points: f32) -> Self {
        self.render_options.margin = points;
        self
    }

    pub fn logo(mut self, source: LogoSource) -> Self {
        self.render_options.logo = Some(source);
        self
    }

    pub fn logo_path(self, path: impl Into<PathBuf>) -> Self {
        self.logo(LogoSource::Path(path.into()))
    }

    pub fn logo_svg(self, markup: impl Into<String>) -> Self {
        self.logo(LogoSource::Svg(markup.into()))
    }

    pub fn header_scale(mut self, scale: f32) -> Self {
        self.render_options.header_scale = scale;
        self
    }

    pub fn empty_fields(mut self, mode: EmptyFields) -> Self {
        self.render_options.empty_fields = mode;
        self
    }

    pub fn template_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.fill_options.template_path = Some(path.into());
        self
    }

    pub fn flatten(mut self, enabled: bool) -> Self {
        self.fill_options.flatten = enabled;
        self
    }

    pub fn disallow_template_pattern(mut self, pattern: impl Into<String>) -> Self {
        let pattern = pattern.into().trim().to_string();
        if !pattern.is_empty() {
            self.fill_options.disallowed_patterns.push(pattern);
        }
        self
    }

    pub fn debug_log(mut self, path: impl Into<PathBuf>) -> Self {
        self.debug_path = Some(path.into());
        self
    }

    pub fn build(self) -> Result<ApplicationPdf, FundFormError> {
        let debug = match self.debug_path {
            Some(path) => Some(DebugLogger::new(path)?),
            None => None,
        };
        Ok(ApplicationPdf {
            render_options: self.render_options,
            fill_options: self.fill_options,
            debug,
        })
    }
}
