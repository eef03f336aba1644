use std::fmt;
use std::path::PathBuf;

#[derive(Debug)]
pub enum FundFormError {
    TemplatePathUnset,
    TemplateDisallowed(String),
    TemplateUnreadable(PathBuf, std::io::Error),
    TemplateInvalid(String),
    NoFillableFields,
    InvalidRecord(String),
    Serialization(String),
    Io(std::io::Error),
}

impl FundFormError {
    pub fn code(&self) -> &'static str {
        match self {
            FundFormError::TemplatePathUnset => "TEMPLATE_PATH_UNSET",
            FundFormError::TemplateDisallowed(_) => "TEMPLATE_DISALLOWED",
            FundFormError::TemplateUnreadable(_, _) => "TEMPLATE_UNREADABLE",
            FundFormError::TemplateInvalid(_) => "TEMPLATE_INVALID",
            FundFormError::NoFillableFields => "NO_FILLABLE_FIELDS",
            FundFormError::InvalidRecord(_) => "INVALID_RECORD",
            FundFormError::Serialization(_) => "SERIALIZATION_FAILED",
            FundFormError::Io(_) => "IO_ERROR",
        }
    }
}

impl fmt::Display for FundFormError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FundFormError::TemplatePathUnset => write!(f, "no fillable template path configured"),
            FundFormError::TemplateDisallowed(path) => {
                write!(f, "template path is not allowed for this form: {}", path)
            }
            FundFormError::TemplateUnreadable(path, err) => {
                write!(f, "template unreadable: {}: {}", path.display(), err)
            }
            FundFormError::TemplateInvalid(message) => {
                write!(f, "template is not a usable pdf: {}", message)
            }
            FundFormError::NoFillableFields => write!(f, "template has no fillable fields"),
            FundFormError::InvalidRecord(message) => {
                write!(f, "invalid application record: {}", message)
            }
            FundFormError::Serialization(message) => {
                write!(f, "pdf serialization failed: {}", message)
            }
            FundFormError::Io(err) => write!(f, "io error: {}", err),
        }
    }
}

impl std::error::Error for FundFormError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FundFormError::TemplateUnreadable(_, err) => Some(err),
            FundFormError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for FundFormError {
    fn from(value: std::io::Error) -> Self {
        FundFormError::Io(value)
    }
}

pub(crate) fn lopdf_err(err: lopdf::Error) -> FundFormError {
    FundFormError::TemplateInvalid(err.to_string())
}
