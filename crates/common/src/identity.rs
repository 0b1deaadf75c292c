//! Pseudonymous recipient identities and send-correlation ids.
//!
//! The gateway never sees employee names: each recipient is registered under
//! a deterministic, one-way identifier derived from the upper-cased name
//! pair. The same derivation runs on every dispatch, so a recipient that was
//! registered in an earlier process lifetime is recognized again.
//!
//! Known limitation, accepted by design: two employees sharing the exact
//! same name pair collide onto one subscriber id.

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Derive the stable subscriber id for an employee name pair.
///
/// Case-normalizing: `derive_subscriber_id("ana", "LI")` equals
/// `derive_subscriber_id("ANA", "li")`. The algorithm (uppercase, join with
/// `:`, SHA-256, lowercase hex) is fixed; changing it would orphan every
/// recipient already registered with the gateway.
pub fn derive_subscriber_id(first_name: &str, last_name: &str) -> String {
    let normalized = format!(
        "{}:{}",
        first_name.trim().to_uppercase(),
        last_name.trim().to_uppercase()
    );
    let digest = Sha256::digest(normalized.as_bytes());
    hex::encode(digest)
}

/// Generate the correlation id for a survey send.
///
/// Derived from sender + subject + send timestamp (not from recipients), so
/// every recipient of one survey shares the id and later result submissions
/// can be matched back to the originating send.
pub fn survey_message_id(sender: &str, subject: &str, sent_at: DateTime<Utc>) -> String {
    let material = format!("{}|{}|{}", sender, subject, sent_at.timestamp_millis());
    let digest = Sha256::digest(material.as_bytes());
    // 16 bytes of the digest is plenty for correlation and keeps ids short.
    hex::encode(&digest[..16])
}

/// Checksum over a day's digested item ids, stored in the sent-marker.
///
/// Ids are sorted before hashing so the checksum is independent of query
/// ordering.
pub fn checksum_ids(ids: &[Uuid]) -> String {
    let mut sorted: Vec<String> = ids.iter().map(Uuid::to_string).collect();
    sorted.sort();
    let digest = Sha256::digest(sorted.join(",").as_bytes());
    hex::encode(digest)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subscriber_id_deterministic() {
        let a = derive_subscriber_id("Ana", "Li");
        let b = derive_subscriber_id("Ana", "Li");
        assert_eq!(a, b);
    }

    #[test]
    fn test_subscriber_id_case_insensitive() {
        assert_eq!(
            derive_subscriber_id("ana", "LI"),
            derive_subscriber_id("ANA", "li")
        );
    }

    #[test]
    fn test_subscriber_id_trims_whitespace() {
        assert_eq!(
            derive_subscriber_id(" Ana ", "Li"),
            derive_subscriber_id("Ana", " Li")
        );
    }

    #[test]
    fn test_subscriber_id_distinct_names_distinct_ids() {
        assert_ne!(
            derive_subscriber_id("Ana", "Li"),
            derive_subscriber_id("Ana", "Liu")
        );
    }

    #[test]
    fn test_subscriber_id_is_hex_sha256() {
        let id = derive_subscriber_id("Ana", "Li");
        assert_eq!(id.len(), 64);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_survey_message_id_depends_on_timestamp() {
        let t1 = Utc::now();
        let t2 = t1 + chrono::Duration::milliseconds(5);
        let a = survey_message_id("hr@acme.test", "Pulse check", t1);
        let b = survey_message_id("hr@acme.test", "Pulse check", t2);
        assert_ne!(a, b);
        assert_eq!(a.len(), 32);
    }

    #[test]
    fn test_checksum_order_independent() {
        let x = Uuid::new_v4();
        let y = Uuid::new_v4();
        assert_eq!(checksum_ids(&[x, y]), checksum_ids(&[y, x]));
    }

    #[test]
    fn test_checksum_detects_membership_change() {
        let x = Uuid::new_v4();
        let y = Uuid::new_v4();
        assert_ne!(checksum_ids(&[x]), checksum_ids(&[x, y]));
    }
}
