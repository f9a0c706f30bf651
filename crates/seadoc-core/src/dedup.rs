//! Exact-duplicate detection for newly extracted records.
//!
//! A candidate is a duplicate of an existing record only when every field
//! *present on the candidate* matches its counterpart exactly after
//! normalization. Fields the candidate never had are excluded from the
//! comparison entirely, so partial extractions do not produce false
//! negatives. A candidate with no identifying fields never matches anything.
//!
//! Known looseness, kept deliberately: a candidate whose only present field
//! is `cert_no` can be declared a duplicate on `cert_no` alone.

use serde::{Deserialize, Serialize};

use crate::collab::{CertificateRecord, DocumentFields, RecordStore};

/// Normalized identifying fields of a candidate record. Built once per
/// duplicate check and discarded afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateKey {
    pub name: Option<String>,
    pub cert_no: Option<String>,
    pub issue_date: Option<String>,
    pub expiry_date: Option<String>,
    pub last_endorsement_date: Option<String>,
}

/// Trim and lowercase a text field; empty strings count as absent.
fn norm_text(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(|v| v.trim().to_lowercase())
        .filter(|v| !v.is_empty())
}

/// Trim a date/number field; matching is exact string equality.
fn norm_exact(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl DuplicateKey {
    pub fn from_fields(fields: &DocumentFields) -> Self {
        Self {
            name: norm_text(&fields.name),
            cert_no: norm_text(&fields.cert_no),
            issue_date: norm_exact(&fields.issue_date),
            expiry_date: norm_exact(&fields.expiry_date),
            last_endorsement_date: norm_exact(&fields.last_endorsement_date),
        }
    }

    /// True when no identifying field is present.
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.cert_no.is_none()
            && self.issue_date.is_none()
            && self.expiry_date.is_none()
            && self.last_endorsement_date.is_none()
    }

    /// All-present-fields exact comparison against an existing record.
    fn matches(&self, existing: &DocumentFields) -> bool {
        fn field_matches(candidate: &Option<String>, existing: Option<String>) -> bool {
            match candidate {
                // Absent on the candidate: excluded from the comparison.
                None => true,
                Some(value) => existing.as_deref() == Some(value.as_str()),
            }
        }

        field_matches(&self.name, norm_text(&existing.name))
            && field_matches(&self.cert_no, norm_text(&existing.cert_no))
            && field_matches(&self.issue_date, norm_exact(&existing.issue_date))
            && field_matches(&self.expiry_date, norm_exact(&existing.expiry_date))
            && field_matches(
                &self.last_endorsement_date,
                norm_exact(&existing.last_endorsement_date),
            )
    }
}

/// Find an existing record the candidate duplicates, if any.
///
/// The lookup is narrowed by certificate number when the candidate has one;
/// the store's `find_by` narrowing is case-insensitive, so narrowing never
/// changes the verdict versus scanning the full set.
pub async fn find_duplicate(
    key: &DuplicateKey,
    ship_id: &str,
    store: &dyn RecordStore,
) -> anyhow::Result<Option<CertificateRecord>> {
    if key.is_empty() {
        // No identifying fields: declaring a duplicate would match everything.
        return Ok(None);
    }

    let candidates = store.find_by(ship_id, key.cert_no.as_deref()).await?;

    let duplicate = candidates
        .into_iter()
        .find(|record| key.matches(&record.fields));

    if let Some(record) = &duplicate {
        tracing::info!(ship_id, record_id = %record.id, "Duplicate record detected");
    }

    Ok(duplicate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::MemoryStore;

    fn record(id: &str, fields: DocumentFields) -> CertificateRecord {
        CertificateRecord {
            id: id.to_string(),
            ship_id: "ship-1".to_string(),
            fields,
            file_id: None,
            upload_error: None,
        }
    }

    fn fields(name: Option<&str>, cert_no: Option<&str>, issue: Option<&str>) -> DocumentFields {
        DocumentFields {
            name: name.map(String::from),
            cert_no: cert_no.map(String::from),
            issue_date: issue.map(String::from),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn matches_when_all_present_fields_equal() {
        let store = MemoryStore::with_records(vec![record(
            "rec-1",
            fields(Some("Safety Certificate"), Some("SC-100"), Some("2024-01-01")),
        )]);

        // Candidate lacks issue_date; it is excluded from the comparison
        let key = DuplicateKey::from_fields(&fields(
            Some("  SAFETY certificate "),
            Some("sc-100"),
            None,
        ));

        let found = find_duplicate(&key, "ship-1", &store).await.unwrap();
        assert_eq!(found.unwrap().id, "rec-1");
    }

    #[tokio::test]
    async fn no_match_when_any_present_field_differs() {
        let store = MemoryStore::with_records(vec![record(
            "rec-1",
            fields(Some("Safety Certificate"), Some("SC-100"), Some("2024-01-01")),
        )]);

        let key = DuplicateKey::from_fields(&fields(
            Some("Safety Certificate"),
            Some("SC-100"),
            Some("2024-06-01"),
        ));

        let found = find_duplicate(&key, "ship-1", &store).await.unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn whitespace_and_case_normalize_before_comparison() {
        let store = MemoryStore::with_records(vec![record(
            "rec-1",
            fields(Some("Load Line Certificate"), None, None),
        )]);

        let key =
            DuplicateKey::from_fields(&fields(Some("  load line CERTIFICATE  "), None, None));

        let found = find_duplicate(&key, "ship-1", &store).await.unwrap();
        assert!(found.is_some());
    }

    #[tokio::test]
    async fn empty_key_never_matches() {
        let store = MemoryStore::with_records(vec![record("rec-1", DocumentFields::default())]);

        let key = DuplicateKey::from_fields(&DocumentFields::default());
        assert!(key.is_empty());

        let found = find_duplicate(&key, "ship-1", &store).await.unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn cert_no_alone_can_match() {
        // Documented looseness: cert_no as the only present field matches.
        let store = MemoryStore::with_records(vec![record(
            "rec-1",
            fields(None, Some("SC-9"), None),
        )]);

        let key = DuplicateKey::from_fields(&fields(None, Some("sc-9"), None));

        let found = find_duplicate(&key, "ship-1", &store).await.unwrap();
        assert!(found.is_some());
    }

    #[tokio::test]
    async fn narrowing_by_cert_no_equals_full_scan() {
        let records = vec![
            record("rec-1", fields(Some("A"), Some("SC-1"), None)),
            record("rec-2", fields(Some("B"), Some("SC-2"), None)),
            record("rec-3", fields(Some("C"), None, None)),
        ];

        let narrowed_store = MemoryStore::with_records(records.clone());
        let key = DuplicateKey::from_fields(&fields(Some("b"), Some("SC-2"), None));
        let narrowed = find_duplicate(&key, "ship-1", &narrowed_store)
            .await
            .unwrap();

        // Full scan: same key matched against every record directly
        let full: Vec<&CertificateRecord> =
            records.iter().filter(|r| key.matches(&r.fields)).collect();

        assert_eq!(
            narrowed.map(|r| r.id),
            full.first().map(|r| r.id.clone())
        );
    }

    #[tokio::test]
    async fn records_for_other_ships_are_invisible() {
        let mut other = record("rec-1", fields(Some("A"), Some("SC-1"), None));
        other.ship_id = "ship-2".to_string();
        let store = MemoryStore::with_records(vec![other]);

        let key = DuplicateKey::from_fields(&fields(Some("A"), Some("SC-1"), None));
        let found = find_duplicate(&key, "ship-1", &store).await.unwrap();
        assert!(found.is_none());
    }
}
