use crate::normalize::{format_date, to_yes_no};
use crate::record::ApplicationRecord;
use std::collections::BTreeMap;

pub const YES_NO_FIELDS: &[&str] = &["existingLoans", "agreeTerms", "authorizeCredit"];

pub const DATE_FIELDS: &[&str] = &[
    "businessStartDate",
    "ownerDob",
    "owner2Dob",
    "ownerSignatureDate",
    "owner2SignatureDate",
    "submittedAt",
];

// Alternate names under which a value is also published, for templates
// built against older field names.
pub const FIELD_ALIASES: &[(&str, &[&str])] = &[
    ("legalName", &["businessName", "companyName"]),
    ("dba", &["dbaName"]),
    ("ein", &["taxId", "federalTaxId"]),
    ("website", &["businessWebsite"]),
    ("requestedAmount", &["amountRequested", "loanAmount"]),
    ("ownerName", &["owner1Name"]),
    ("ownerSsn", &["ownerSSN"]),
    ("owner2Ssn", &["owner2SSN"]),
    ("email", &["contactEmail"]),
    ("phone", &["contactPhone"]),
];

// Every record value plus the derived presentation strings both pipelines
// draw from: composed names, yes/no flags, reformatted dates and aliases.
// Empty values are left out.
pub fn presentation_values(record: &ApplicationRecord) -> BTreeMap<String, String> {
    let mut values: BTreeMap<String, String> = record
        .iter()
        .filter(|(_, value)| !value.is_empty())
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect();

    for (key, composed) in [
        ("ownerName", record.owner_name()),
        ("owner2Name", record.owner2_name()),
        ("contactName", record.contact_name()),
    ] {
        if !composed.is_empty() {
            values.insert(key.to_string(), composed);
        }
    }

    for key in YES_NO_FIELDS {
        if let Some(value) = values.get_mut(*key) {
            *value = to_yes_no(value);
        }
    }
    for key in DATE_FIELDS {
        if let Some(value) = values.get_mut(*key) {
            *value = format_date(value);
        }
    }

    for (canonical, aliases) in FIELD_ALIASES {
        let Some(value) = values.get(*canonical).cloned() else {
            continue;
        };
        for alias in *aliases {
            values.entry(alias.to_string()).or_insert_with(|| value.clone());
        }
    }

    values
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derives_names_flags_dates_and_aliases() {
        let record: ApplicationRecord = [
            ("legalName", "Acme Holdings LLC"),
            ("ein", "12-3456789"),
            ("ownerFirstName", "Grace"),
            ("ownerLastName", "Hopper"),
            ("ownerDob", "1970-01-31"),
            ("agreeTerms", "on"),
            ("existingLoans", "false"),
            ("authorizeCredit", "Pending"),
            ("dba", ""),
        ]
        .into_iter()
        .collect();

        let values = presentation_values(&record);
        assert_eq!(values["ownerName"], "Grace Hopper");
        assert_eq!(values["owner1Name"], "Grace Hopper");
        assert_eq!(values["ownerDob"], "01/31/1970");
        assert_eq!(values["agreeTerms"], "YES");
        assert_eq!(values["existingLoans"], "NO");
        assert_eq!(values["authorizeCredit"], "Pending");
        assert_eq!(values["businessName"], "Acme Holdings LLC");
        assert_eq!(values["taxId"], "12-3456789");
        assert_eq!(values["federalTaxId"], "12-3456789");
        assert!(!values.contains_key("dba"));
        assert!(!values.contains_key("dbaName"));
        assert!(!values.contains_key("owner2Name"));
    }

    #[test]
    fn explicit_alias_values_are_not_overwritten() {
        let record: ApplicationRecord = [("legalName", "Acme"), ("businessName", "Acme Retail")]
            .into_iter()
            .collect();
        let values = presentation_values(&record);
        assert_eq!(values["businessName"], "Acme Retail");
    }

    #[test]
    fn empty_record_yields_no_values() {
        assert!(presentation_values(&ApplicationRecord::blank()).is_empty());
    }
}
