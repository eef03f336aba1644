use crate::error::FundFormError;
use crate::normalize::{join_name, normalize_str, normalize_value};
use serde_json::Value;
use std::collections::BTreeMap;

// A submitted application: field name to display string. Values are
// normalized when they enter the record, so readers never see untrimmed or
// structured input. Missing keys read as `""`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplicationRecord {
    fields: BTreeMap<String, String>,
}

impl ApplicationRecord {
    pub fn blank() -> Self {
        Self::default()
    }

    pub fn from_json_str(json: &str) -> Result<Self, FundFormError> {
        let value: Value = serde_json::from_str(json)
            .map_err(|err| FundFormError::InvalidRecord(err.to_string()))?;
        Self::from_json_value(&value)
    }

    pub fn from_json_value(value: &Value) -> Result<Self, FundFormError> {
        let Value::Object(map) = value else {
            return Err(FundFormError::InvalidRecord(
                "expected a JSON object of field values".to_string(),
            ));
        };
        let mut record = Self::blank();
        for (key, raw) in map {
            record.set(key, normalize_value(raw));
        }
        Ok(record)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl AsRef<str>) {
        let key = key.into().trim().to_string();
        if key.is_empty() {
            return;
        }
        self.fields.insert(key, normalize_str(value.as_ref()));
    }

    pub fn with(mut self, key: impl Into<String>, value: impl AsRef<str>) -> Self {
        self.set(key, value);
        self
    }

    pub fn get(&self, key: &str) -> &str {
        self.fields.get(key).map(String::as_str).unwrap_or("")
    }

    pub fn has_value(&self, key: &str) -> bool {
        !self.get(key).is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.values().all(|value| value.is_empty())
    }

    pub fn owner_name(&self) -> String {
        self.composed_name("ownerName", "ownerFirstName", "ownerLastName")
    }

    pub fn owner2_name(&self) -> String {
        self.composed_name("owner2Name", "owner2FirstName", "owner2LastName")
    }

    pub fn contact_name(&self) -> String {
        self.composed_name("contactName", "contactFirstName", "contactLastName")
    }

    // First/last take precedence; a pre-composed value is the fallback.
    fn composed_name(&self, full: &str, first: &str, last: &str) -> String {
        let joined = join_name(self.get(first), self.get(last));
        if joined.is_empty() {
            self.get(full).to_string()
        } else {
            joined
        }
    }
}

impl<K: Into<String>, V: AsRef<str>> FromIterator<(K, V)> for ApplicationRecord {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut record = Self::blank();
        for (key, value) in iter {
            record.set(key, value);
        }
        record
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_ingestion_normalizes_every_value() {
        let record = ApplicationRecord::from_json_str(
            r#"{"legalName":"  Acme LLC ","numberOfEmployees":12,"agreeTerms":true,
                "useOfFunds":["Inventory","","Payroll "],"dba":null}"#,
        )
        .expect("record");
        assert_eq!(record.get("legalName"), "Acme LLC");
        assert_eq!(record.get("numberOfEmployees"), "12");
        assert_eq!(record.get("agreeTerms"), "true");
        assert_eq!(record.get("useOfFunds"), "Inventory, Payroll");
        assert_eq!(record.get("dba"), "");
        assert!(!record.has_value("dba"));
        assert_eq!(record.get("missing"), "");
    }

    #[test]
    fn non_object_json_is_rejected() {
        let err = ApplicationRecord::from_json_str("[1,2]").expect_err("array");
        assert_eq!(err.code(), "INVALID_RECORD");
        let err = ApplicationRecord::from_json_str("{not json").expect_err("syntax");
        assert_eq!(err.code(), "INVALID_RECORD");
    }

    #[test]
    fn composed_names_prefer_first_and_last() {
        let record: ApplicationRecord = [
            ("ownerFirstName", "Grace"),
            ("ownerLastName", " Hopper"),
            ("owner2Name", "Alan Turing"),
            ("contactLastName", "Lamarr"),
        ]
        .into_iter()
        .collect();
        assert_eq!(record.owner_name(), "Grace Hopper");
        assert_eq!(record.owner2_name(), "Alan Turing");
        assert_eq!(record.contact_name(), "Lamarr");
    }

    #[test]
    fn blank_record_is_empty() {
        let record = ApplicationRecord::blank().with("dba", "   ");
        assert!(record.is_empty());
        assert_eq!(record.len(), 1);
    }
}
