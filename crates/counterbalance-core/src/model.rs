//! Shared data model for order assignments and reference documents.

use std::fmt;

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type DocId = i64;
pub type QueryId = i64;

/// Primary key of an order assignment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OrderKey {
    pub user_id: String,
    pub query_id: QueryId,
}

impl OrderKey {
    pub fn new(user_id: impl Into<String>, query_id: QueryId) -> Self {
        Self {
            user_id: user_id.into(),
            query_id,
        }
    }
}

impl fmt::Display for OrderKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.user_id, self.query_id)
    }
}

/// Digits of sub-second precision kept for stored timestamps (microseconds).
pub const TIMESTAMP_PRECISION: u16 = 6;

/// The presentation order persisted for one participant and query.
///
/// Written once on first access and never modified afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderAssignment {
    pub user_id: String,
    pub query_id: QueryId,
    pub doc_ids: Vec<DocId>,
    pub created_at: DateTime<Utc>,
}

impl OrderAssignment {
    /// `created_at` is truncated to microseconds, the precision every store
    /// keeps, so an assignment compares equal to its stored copy.
    pub fn new(key: &OrderKey, doc_ids: Vec<DocId>, created_at: DateTime<Utc>) -> Self {
        Self {
            user_id: key.user_id.clone(),
            query_id: key.query_id,
            doc_ids,
            created_at: created_at.trunc_subsecs(TIMESTAMP_PRECISION),
        }
    }

    pub fn key(&self) -> OrderKey {
        OrderKey::new(self.user_id.clone(), self.query_id)
    }
}

/// A candidate document belonging to one query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocId,
    pub query_id: QueryId,
    /// Display number; candidates are listed in ascending order of this.
    pub display_no: i64,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query {
    pub id: QueryId,
    pub content: String,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("malformed document order '{raw}'")]
pub struct OrderFormatError {
    pub raw: String,
}

/// Serialise an order as comma-joined ids, e.g. `"12,13,11"`.
pub fn encode_order(doc_ids: &[DocId]) -> String {
    doc_ids
        .iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

/// Inverse of [`encode_order`]. The empty string decodes to an empty order.
pub fn decode_order(raw: &str) -> Result<Vec<DocId>, OrderFormatError> {
    if raw.trim().is_empty() {
        return Ok(Vec::new());
    }
    raw.split(',')
        .map(|part| part.trim().parse::<DocId>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| OrderFormatError {
            raw: raw.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn encode_matches_stored_layout() {
        assert_eq!(encode_order(&[12, 13, 11]), "12,13,11");
        assert_eq!(encode_order(&[]), "");
    }

    #[test]
    fn decode_tolerates_whitespace() {
        assert_eq!(decode_order(" 3, 1 ,2").unwrap(), vec![3, 1, 2]);
        assert_eq!(decode_order("").unwrap(), Vec::<DocId>::new());
    }

    #[test]
    fn decode_rejects_garbage() {
        let err = decode_order("1,,2").unwrap_err();
        assert_eq!(err.raw, "1,,2");
        assert!(decode_order("a,b").is_err());
    }

    #[test]
    fn order_key_display() {
        assert_eq!(OrderKey::new("alice", 2).to_string(), "alice/2");
    }

    #[test]
    fn created_at_is_truncated_to_micros() {
        let ts = Utc.with_ymd_and_hms(2026, 4, 1, 12, 0, 0).unwrap()
            + chrono::Duration::nanoseconds(123_456_789);
        let a = OrderAssignment::new(&OrderKey::new("alice", 1), vec![1], ts);
        assert_eq!(a.created_at.timestamp_subsec_nanos(), 123_456_000);
        assert_eq!(a.created_at.timestamp_subsec_micros(), 123_456);
    }

    #[test]
    fn assignment_json_roundtrip_keeps_order() {
        let key = OrderKey::new("alice", 1);
        let a = OrderAssignment::new(&key, vec![5, 3, 9], Utc::now());
        let json = serde_json::to_string(&a).unwrap();
        let parsed: OrderAssignment = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.doc_ids, vec![5, 3, 9]);
        assert_eq!(parsed.key(), key);
    }
}
