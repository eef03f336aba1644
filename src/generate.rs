use crate::error::FundFormError;
use sha2::{Digest, Sha256};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PdfSource {
    Template,
    Layout {
        fallback_reason: Option<String>,
    },
}

impl PdfSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            PdfSource::Template => "template",
            PdfSource::Layout { .. } => "layout",
        }
    }

    pub fn fallback_reason(&self) -> Option<&str> {
        match self {
            PdfSource::Template => None,
            PdfSource::Layout { fallback_reason } => fallback_reason.as_deref(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedPdf {
    pub bytes: Vec<u8>,
    pub source: PdfSource,
    pub sha256: String,
}

impl GeneratedPdf {
    pub fn new(bytes: Vec<u8>, source: PdfSource) -> Self {
        let sha256 = sha256_hex(&bytes);
        Self {
            bytes,
            source,
            sha256,
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn write_to(&self, path: impl AsRef<Path>) -> Result<(), FundFormError> {
        std::fs::write(path, &self.bytes)?;
        Ok(())
    }
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let digest = hasher.finalize();
    let mut out = String::with_capacity(digest.len() * 2);
    for b in digest {
        use std::fmt::Write;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

/// Resolves a template attempt into a document. A successful attempt wins; a
/// failed or absent one hands over to `layout`, whose error is the only one
/// surfaced.
pub fn select_pipeline(
    attempt: Option<Result<Vec<u8>, FundFormError>>,
    layout: impl FnOnce() -> Result<Vec<u8>, FundFormError>,
) -> Result<GeneratedPdf, FundFormError> {
    let fallback_reason = match attempt {
        Some(Ok(bytes)) => return Ok(GeneratedPdf::new(bytes, PdfSource::Template)),
        Some(Err(err)) => Some(format!("{}: {}", err.code(), err)),
        None => None,
    };
    let bytes = layout()?;
    Ok(GeneratedPdf::new(bytes, PdfSource::Layout { fallback_reason }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn successful_template_attempt_wins() {
        let out = select_pipeline(Some(Ok(b"%PDF-template".to_vec())), || {
            panic!("layout must not run")
        })
        .expect("generated");
        assert_eq!(out.source, PdfSource::Template);
        assert_eq!(out.bytes, b"%PDF-template");
        assert_eq!(out.source.fallback_reason(), None);
    }

    #[test]
    fn failed_attempt_falls_back_with_reason() {
        let out = select_pipeline(Some(Err(FundFormError::NoFillableFields)), || {
            Ok(b"%PDF-layout".to_vec())
        })
        .expect("generated");
        assert_eq!(out.source.as_str(), "layout");
        let reason = out.source.fallback_reason().expect("reason");
        assert!(reason.starts_with("NO_FILLABLE_FIELDS"));
        assert_eq!(out.bytes, b"%PDF-layout");
    }

    #[test]
    fn skipped_attempt_has_no_reason() {
        let out = select_pipeline(None, || Ok(vec![1, 2, 3])).expect("generated");
        assert_eq!(
            out.source,
            PdfSource::Layout {
                fallback_reason: None
            }
        );
    }

    #[test]
    fn layout_failure_is_surfaced() {
        let err = select_pipeline(Some(Err(FundFormError::TemplatePathUnset)), || {
            Err(FundFormError::Serialization("disk full".to_string()))
        })
        .expect_err("fatal");
        assert_eq!(err.code(), "SERIALIZATION_FAILED");
    }

    #[test]
    fn fingerprint_is_sha256_hex() {
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        let out = GeneratedPdf::new(b"abc".to_vec(), PdfSource::Template);
        assert_eq!(out.sha256, sha256_hex(b"abc"));
        assert_eq!(out.len(), 3);
    }
}
