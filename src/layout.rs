use crate::font::{StandardFont, wrap_text};
use crate::types::Pt;

// Geometry for one render, derived from a single scale factor. Every value
// shrinks with the scale but never below its floor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutConfig {
    pub scale: f32,
    pub row_height: Pt,
    pub label_font: Pt,
    pub value_font: Pt,
    pub section_header_height: Pt,
    pub section_title_font: Pt,
    pub section_gap: Pt,
    pub cell_padding: Pt,
    pub auth_font: Pt,
    pub signature_line_height: Pt,
    pub small_font: Pt,
}

pub const ROW_HEIGHT: (f32, f32) = (26.0, 14.0);
pub const LABEL_FONT: (f32, f32) = (6.5, 4.5);
pub const VALUE_FONT: (f32, f32) = (9.0, 5.5);
pub const SECTION_HEADER_HEIGHT: (f32, f32) = (16.0, 9.0);
pub const SECTION_TITLE_FONT: (f32, f32) = (9.5, 6.0);
pub const SECTION_GAP: (f32, f32) = (8.0, 2.0);
pub const CELL_PADDING: (f32, f32) = (4.0, 1.5);
pub const AUTH_FONT: (f32, f32) = (7.5, 5.0);
pub const SIGNATURE_LINE_HEIGHT: (f32, f32) = (24.0, 14.0);
pub const SMALL_FONT: (f32, f32) = (7.0, 5.0);

pub const AUTH_LEADING: f32 = 1.25;
// Paired signature rows below the clause: printed name, signature, date,
// then EIN/website.
pub const SIGNATURE_ROWS: usize = 4;

fn scaled((nominal, floor): (f32, f32), scale: f32) -> Pt {
    Pt::from_f32((nominal * scale).max(floor))
}

impl LayoutConfig {
    pub fn for_scale(scale: f32) -> Self {
        let scale = if scale.is_finite() {
            scale.clamp(f32::MIN_POSITIVE, 1.0)
        } else {
            1.0
        };
        Self {
            scale,
            row_height: scaled(ROW_HEIGHT, scale),
            label_font: scaled(LABEL_FONT, scale),
            value_font: scaled(VALUE_FONT, scale),
            section_header_height: scaled(SECTION_HEADER_HEIGHT, scale),
            section_title_font: scaled(SECTION_TITLE_FONT, scale),
            section_gap: scaled(SECTION_GAP, scale),
            cell_padding: scaled(CELL_PADDING, scale),
            auth_font: scaled(AUTH_FONT, scale),
            signature_line_height: scaled(SIGNATURE_LINE_HEIGHT, scale),
            small_font: scaled(SMALL_FONT, scale),
        }
    }

    pub fn nominal() -> Self {
        Self::for_scale(1.0)
    }

    pub fn legend_height(&self) -> Pt {
        self.small_font + self.section_gap
    }

    pub fn footer_reserve(&self) -> Pt {
        self.small_font + self.section_gap
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cell {
    pub label: &'static str,
    pub key: &'static str,
    pub span: u16,
}

#[derive(Debug, Clone, Copy)]
pub struct Section {
    pub title: &'static str,
    pub rows: &'static [&'static [Cell]],
}

const fn cell(label: &'static str, key: &'static str, span: u16) -> Cell {
    Cell { label, key, span }
}

pub const SECTIONS: &[Section] = &[
    Section {
        title: "Business Information",
        rows: &[
            &[
                cell("Legal Business Name", "legalName", 3),
                cell("DBA", "dba", 2),
            ],
            &[
                cell("Business Address", "businessAddress", 3),
                cell("City", "businessCity", 2),
                cell("State", "businessState", 1),
                cell("Zip", "businessZip", 1),
            ],
            &[
                cell("Business Phone", "businessPhone", 2),
                cell("Business Email", "businessEmail", 2),
                cell("Website", "website", 2),
            ],
            &[
                cell("Federal Tax ID (EIN)", "ein", 2),
                cell("Entity Type", "entityType", 2),
                cell("State of Inc.", "stateOfIncorporation", 1),
                cell("Business Start Date", "businessStartDate", 2),
            ],
            &[
                cell("Industry", "industry", 2),
                cell("Employees", "numberOfEmployees", 1),
                cell("Annual Revenue", "annualRevenue", 2),
                cell("Avg. Monthly Revenue", "monthlyRevenue", 2),
            ],
            &[
                cell("Amount Requested", "requestedAmount", 2),
                cell("Use of Funds", "useOfFunds", 3),
                cell("Term", "loanTerm", 1),
            ],
            &[
                cell("Avg. Bank Balance", "averageBankBalance", 2),
                cell("Bank Name", "bankName", 2),
                cell("Existing Loans", "existingLoans", 1),
                cell("Existing Balance", "existingLoanBalance", 2),
            ],
            &[
                cell("Contact Name", "contactName", 2),
                cell("Contact Email", "email", 2),
                cell("Contact Phone", "phone", 2),
            ],
        ],
    },
    Section {
        title: "Ownership Information",
        rows: &[
            &[
                cell("Owner 1 Name", "ownerName", 3),
                cell("Title", "ownerTitle", 2),
                cell("Ownership %", "ownerOwnership", 1),
            ],
            &[
                cell("Home Address", "ownerAddress", 3),
                cell("City", "ownerCity", 2),
                cell("State", "ownerState", 1),
                cell("Zip", "ownerZip", 1),
            ],
            &[
                cell("SSN", "ownerSsn", 2),
                cell("Date of Birth", "ownerDob", 2),
                cell("Credit Score", "ownerCreditScore", 1),
                cell("Phone", "ownerPhone", 2),
                cell("Email", "ownerEmail", 3),
            ],
            &[
                cell("Owner 2 Name", "owner2Name", 3),
                cell("Title", "owner2Title", 2),
                cell("Ownership %", "owner2Ownership", 1),
            ],
            &[
                cell("Home Address", "owner2Address", 3),
                cell("City", "owner2City", 2),
                cell("State", "owner2State", 1),
                cell("Zip", "owner2Zip", 1),
            ],
            &[
                cell("SSN", "owner2Ssn", 2),
                cell("Date of Birth", "owner2Dob", 2),
                cell("Credit Score", "owner2CreditScore", 1),
                cell("Phone", "owner2Phone", 2),
                cell("Email", "owner2Email", 3),
            ],
        ],
    },
    Section {
        title: "References",
        rows: &[
            &[
                cell("Trade Reference 1", "tradeReference1Name", 3),
                cell("Phone", "tradeReference1Phone", 2),
            ],
            &[
                cell("Trade Reference 2", "tradeReference2Name", 3),
                cell("Phone", "tradeReference2Phone", 2),
            ],
            &[
                cell("Landlord / Mortgage Holder", "landlordName", 3),
                cell("Phone", "landlordPhone", 2),
                cell("Monthly Rent", "monthlyRent", 2),
            ],
        ],
    },
];

pub const AUTHORIZATION_TITLE: &str = "Authorization & Signatures";

pub type SignaturePair = ((&'static str, &'static str), (&'static str, &'static str));

pub const SIGNATURE_PAIRS: [SignaturePair; SIGNATURE_ROWS] = [
    (
        ("Owner 1 Printed Name", "ownerName"),
        ("Owner 2 Printed Name", "owner2Name"),
    ),
    (
        ("Owner 1 Signature", "ownerSignature"),
        ("Owner 2 Signature", "owner2Signature"),
    ),
    (
        ("Date", "ownerSignatureDate"),
        ("Date", "owner2SignatureDate"),
    ),
    (("Federal Tax ID (EIN)", "ein"), ("Website", "website")),
];

const REQUIRED_FIELDS: &[&str] = &[
    "legalName",
    "businessAddress",
    "businessCity",
    "businessState",
    "businessZip",
    "businessPhone",
    "ein",
    "businessStartDate",
    "annualRevenue",
    "requestedAmount",
    "useOfFunds",
    "ownerName",
    "ownerOwnership",
    "ownerAddress",
    "ownerSsn",
    "ownerDob",
    "ownerSignature",
    "ownerSignatureDate",
];

pub fn is_required(key: &str) -> bool {
    REQUIRED_FIELDS.contains(&key)
}

pub fn display_label(label: &str, key: &str) -> String {
    if is_required(key) {
        format!("{label} *")
    } else {
        label.to_string()
    }
}

pub fn authorization_clause(company_name: &str) -> String {
    let company = if company_name.trim().is_empty() {
        "the funder"
    } else {
        company_name.trim()
    };
    format!(
        "By signing below, each of the undersigned, individually and on behalf of the business \
         named above, certifies that all information and documents submitted in connection with \
         this application are true, accurate and complete, and authorizes {company} and its \
         assigns, agents, banks and financial institutions (collectively, \"Recipients\") to \
         obtain consumer, business and investigative reports and other information about the \
         business and its owners, including bank statements and card processor statements, from \
         one or more consumer reporting agencies and from creditors and other third parties. Each \
         of the undersigned also authorizes {company} to share this application and any \
         information obtained in connection with it with the Recipients for the purpose of \
         evaluating the business for financing. This authorization remains in effect until \
         revoked in writing."
    )
}

pub fn clause_height(clause: &str, font_size: Pt, width: Pt) -> Pt {
    let lines = wrap_text(StandardFont::Helvetica, font_size, clause, width).len();
    font_size * AUTH_LEADING * lines as i32
}

// Vertical space for the body below the header: legend, sections,
// authorization block and footer reserve. `clause_budget` is the height
// given to the clause paragraph.
pub fn content_height(config: &LayoutConfig, clause_budget: Pt) -> Pt {
    let sections: Pt = SECTIONS
        .iter()
        .map(|section| {
            config.section_header_height
                + config.row_height * section.rows.len() as i32
                + config.section_gap
        })
        .sum();
    let authorization = config.section_header_height
        + config.cell_padding * 2
        + clause_budget
        + config.signature_line_height * SIGNATURE_ROWS as i32;
    config.legend_height() + sections + authorization + config.footer_reserve()
}

pub fn estimate_height(clause: &str, content_width: Pt) -> Pt {
    let nominal = LayoutConfig::nominal();
    let clause_budget = clause_height(clause, nominal.auth_font, content_width);
    content_height(&nominal, clause_budget)
}

// `min(1, available / estimated)`, kept strictly positive.
pub fn resolve_scale(available: Pt, estimated: Pt) -> f32 {
    let estimated = estimated.to_f32();
    if estimated <= 0.0 {
        return 1.0;
    }
    let ratio = available.to_f32() / estimated;
    if !ratio.is_finite() {
        return 1.0;
    }
    ratio.clamp(0.01, 1.0)
}

// Splits `total` across the row by span. Widths sum to `total` exactly; the
// last cell absorbs the rounding remainder.
pub fn cell_widths(cells: &[Cell], total: Pt) -> Vec<Pt> {
    let span_total: i32 = cells.iter().map(|c| c.span.max(1) as i32).sum();
    let mut widths = Vec::with_capacity(cells.len());
    let mut used = Pt::ZERO;
    for (idx, cell) in cells.iter().enumerate() {
        let width = if idx + 1 == cells.len() {
            total - used
        } else {
            total.mul_ratio(cell.span.max(1) as i32, span_total)
        };
        used += width;
        widths.push(width);
    }
    widths
}
