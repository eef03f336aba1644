//! Command-line front end: turns an application record (JSON object) into a
//! single-page PDF, filling a template when one is usable.

use clap::Parser;
use fundform::{
    ApplicationPdf, ApplicationPdfBuilder, ApplicationRecord, EmptyFields, GeneratedPdf,
    LogoSource, PdfSource, inspect_pdf_bytes,
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "fundform-pdf")]
#[command(about = "Generate a one-page funding application PDF")]
#[command(version)]
struct Cli {
    /// Application record as a JSON object of field values
    #[arg(long, required_unless_present = "blank")]
    record: Option<PathBuf>,

    /// Output PDF path
    #[arg(short, long)]
    out: PathBuf,

    /// Fillable PDF template; overrides FUNDFORM_TEMPLATE_PATH
    #[arg(long)]
    template: Option<PathBuf>,

    /// Keep the filled template's form fields editable
    #[arg(long)]
    no_flatten: bool,

    /// Skip the template and always use the fixed layout
    #[arg(long)]
    layout_only: bool,

    /// Render an empty specimen form instead of a record
    #[arg(long, conflicts_with = "record")]
    blank: bool,

    /// Company name for the header, footer and authorization clause
    #[arg(long)]
    company: Option<String>,

    /// Logo as an SVG file path or a data: URI
    #[arg(long)]
    logo: Option<String>,

    /// Page margin in points
    #[arg(long)]
    margin: Option<f32>,

    /// Header size multiplier
    #[arg(long)]
    header_scale: Option<f32>,

    /// Leave empty cells blank instead of showing a dash
    #[arg(long)]
    blank_fields: bool,

    /// Refuse templates whose path contains this text (repeatable)
    #[arg(long = "disallow-template")]
    disallow_template: Vec<String>,

    /// Write JSON-lines diagnostics to this file
    #[arg(long)]
    debug_log: Option<PathBuf>,
}

impl Cli {
    fn builder(&self) -> ApplicationPdfBuilder {
        let mut builder = ApplicationPdfBuilder::from_env();
        if let Some(company) = &self.company {
            builder = builder.company_name(company.clone());
        }
        if let Some(logo) = &self.logo {
            builder = if logo.starts_with("data:") {
                builder.logo(LogoSource::DataUri(logo.clone()))
            } else {
                builder.logo_path(logo.clone())
            };
        }
        if let Some(margin) = self.margin {
            builder = builder.margin(margin);
        }
        if let Some(scale) = self.header_scale {
            builder = builder.header_scale(scale);
        }
        if self.blank_fields {
            builder = builder.empty_fields(EmptyFields::Blank);
        }
        if let Some(template) = &self.template {
            builder = builder.template_path(template.clone());
        }
        if self.no_flatten {
            builder = builder.flatten(false);
        }
        for pattern in &self.disallow_template {
            builder = builder.disallow_template_pattern(pattern.clone());
        }
        if let Some(path) = &self.debug_log {
            builder = builder.debug_log(path.clone());
        }
        builder
    }

    fn load_record(&self) -> Result<ApplicationRecord, Box<dyn std::error::Error>> {
        match (&self.record, self.blank) {
            (_, true) | (None, _) => Ok(ApplicationRecord::blank()),
            (Some(path), false) => {
                let json = std::fs::read_to_string(path)
                    .map_err(|err| format!("cannot read record {}: {err}", path.display()))?;
                Ok(ApplicationRecord::from_json_str(&json)?)
            }
        }
    }
}

fn generate(cli: &Cli, generator: &ApplicationPdf) -> Result<GeneratedPdf, Box<dyn std::error::Error>> {
    let record = cli.load_record()?;
    let pdf = if cli.layout_only || cli.blank {
        generator.generate_layout(&record)?
    } else {
        generator.generate(&record)?
    };
    Ok(pdf)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let generator = cli.builder().build()?;
    let pdf = generate(&cli, &generator)?;
    pdf.write_to(&cli.out)?;

    if let PdfSource::Layout {
        fallback_reason: Some(reason),
    } = &pdf.source
    {
        eprintln!("[fundform][generate] template not used: {reason}");
    }
    let (pages, fields) = match inspect_pdf_bytes(&pdf.bytes) {
        Ok(report) => (
            report.page_count.to_string(),
            report.form_field_count.to_string(),
        ),
        Err(err) => (format!("uninspectable ({err})"), "-".to_string()),
    };
    println!(
        "{} source={} bytes={} pages={} fields={} sha256={}",
        cli.out.display(),
        pdf.source.as_str(),
        pdf.len(),
        pages,
        fields,
        pdf.sha256
    );
    Ok(())
}
