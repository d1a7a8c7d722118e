//! Interaction events logged while a participant works through a query.

use std::fmt;

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

use crate::model::{QueryId, TIMESTAMP_PRECISION};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EventError {
    #[error("log payload has no userId")]
    MissingUserId,
    #[error("invalid log payload: {0}")]
    Payload(String),
}

/// Kind of interaction. Unknown kinds are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventType {
    PassageSelection,
    OpenDoc,
    CloseDoc,
    Pass,
    Other(String),
}

impl EventType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::PassageSelection => "PASSAGE_SELECTION",
            Self::OpenDoc => "OPEN_DOC",
            Self::CloseDoc => "CLOSE_DOC",
            Self::Pass => "PASS",
            Self::Other(s) => s,
        }
    }
}

impl From<&str> for EventType {
    fn from(s: &str) -> Self {
        match s {
            "PASSAGE_SELECTION" => Self::PassageSelection,
            "OPEN_DOC" => Self::OpenDoc,
            "CLOSE_DOC" => Self::CloseDoc,
            "PASS" => Self::Pass,
            other => Self::Other(other.to_string()),
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for EventType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for EventType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(Self::from(s.as_str()))
    }
}

/// One append-only interaction log entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InteractionEvent {
    pub user_id: String,
    pub query_id: QueryId,
    /// Display number of the document involved, 0 when none.
    pub doc_ref: i64,
    pub event_type: EventType,
    /// Selection start offset, -1 when not a selection.
    pub start_idx: i64,
    /// Selection end offset, -1 when not a selection.
    pub end_idx: i64,
    /// Milliseconds since the previous event.
    pub duration: i64,
    pub pass_flag: bool,
    pub timestamp: DateTime<Utc>,
}

/// JSON body posted by the browser for each interaction.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogRequest {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub qid: QueryId,
    #[serde(default)]
    pub docno: i64,
    #[serde(default)]
    pub event_type: String,
    #[serde(default = "minus_one")]
    pub start_index: i64,
    #[serde(default = "minus_one")]
    pub end_index: i64,
    #[serde(default)]
    pub duration: i64,
    #[serde(default, deserialize_with = "flag")]
    pub pass_flag: bool,
}

fn minus_one() -> i64 {
    -1
}

/// Accept `0`/`1` as well as `true`/`false`.
fn flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Int(i64),
    }
    Ok(match Flag::deserialize(deserializer)? {
        Flag::Bool(b) => b,
        Flag::Int(i) => i != 0,
    })
}

impl LogRequest {
    pub fn from_json(body: &str) -> Result<Self, EventError> {
        serde_json::from_str(body).map_err(|e| EventError::Payload(e.to_string()))
    }

    /// Stamp the request with the server-side time, at stored precision.
    pub fn into_event(self, now: DateTime<Utc>) -> Result<InteractionEvent, EventError> {
        let user_id = self
            .user_id
            .filter(|u| !u.trim().is_empty())
            .ok_or(EventError::MissingUserId)?;
        Ok(InteractionEvent {
            user_id,
            query_id: self.qid,
            doc_ref: self.docno,
            event_type: EventType::from(self.event_type.as_str()),
            start_idx: self.start_index,
            end_idx: self.end_index,
            duration: self.duration,
            pass_flag: self.pass_flag,
            timestamp: now.trunc_subsecs(TIMESTAMP_PRECISION),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_payload() {
        let body = r#"{
            "userId": "P-01",
            "qid": 2,
            "docno": 23,
            "eventType": "PASSAGE_SELECTION",
            "startIndex": 10,
            "endIndex": 42,
            "duration": 1800,
            "passFlag": 1
        }"#;
        let ev = LogRequest::from_json(body)
            .unwrap()
            .into_event(Utc::now())
            .unwrap();
        assert_eq!(ev.user_id, "P-01");
        assert_eq!(ev.query_id, 2);
        assert_eq!(ev.doc_ref, 23);
        assert_eq!(ev.event_type, EventType::PassageSelection);
        assert_eq!((ev.start_idx, ev.end_idx), (10, 42));
        assert_eq!(ev.duration, 1800);
        assert!(ev.pass_flag);
    }

    #[test]
    fn missing_fields_take_defaults() {
        let ev = LogRequest::from_json(r#"{"userId":"u"}"#)
            .unwrap()
            .into_event(Utc::now())
            .unwrap();
        assert_eq!(ev.query_id, 0);
        assert_eq!(ev.doc_ref, 0);
        assert_eq!(ev.event_type, EventType::Other(String::new()));
        assert_eq!((ev.start_idx, ev.end_idx), (-1, -1));
        assert_eq!(ev.duration, 0);
        assert!(!ev.pass_flag);
    }

    #[test]
    fn event_timestamp_drops_nanoseconds() {
        let now = DateTime::from_timestamp(1_767_225_600, 987_654_321).unwrap();
        let ev = LogRequest::from_json(r#"{"userId":"u"}"#)
            .unwrap()
            .into_event(now)
            .unwrap();
        assert_eq!(ev.timestamp.timestamp_subsec_nanos(), 987_654_000);
    }

    #[test]
    fn boolean_pass_flag() {
        let req = LogRequest::from_json(r#"{"userId":"u","passFlag":true}"#).unwrap();
        assert!(req.pass_flag);
    }

    #[test]
    fn missing_or_blank_user_rejected() {
        let now = Utc::now();
        let err = LogRequest::from_json(r#"{"qid":1}"#)
            .unwrap()
            .into_event(now)
            .unwrap_err();
        assert_eq!(err, EventError::MissingUserId);
        let err = LogRequest::from_json(r#"{"userId":"  "}"#)
            .unwrap()
            .into_event(now)
            .unwrap_err();
        assert_eq!(err, EventError::MissingUserId);
    }

    #[test]
    fn malformed_json_is_payload_error() {
        assert!(matches!(
            LogRequest::from_json("not json"),
            Err(EventError::Payload(_))
        ));
    }

    #[test]
    fn unknown_event_type_is_preserved() {
        assert_eq!(
            EventType::from("SCROLL"),
            EventType::Other("SCROLL".into())
        );
        assert_eq!(EventType::from("SCROLL").to_string(), "SCROLL");
        assert_eq!(EventType::OpenDoc.to_string(), "OPEN_DOC");
    }

    #[test]
    fn event_type_serialises_as_string() {
        let json = serde_json::to_string(&EventType::CloseDoc).unwrap();
        assert_eq!(json, "\"CLOSE_DOC\"");
        let back: EventType = serde_json::from_str(&json).unwrap();
        assert_eq!(back, EventType::CloseDoc);
    }
}
