//! Ticket data types.

use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use super::TicketError;

// ============================================================================
// Loose field decoding
// ============================================================================

/// Service-desk exports encode booleans as "Yes"/"No" and numbers as strings.
#[derive(Deserialize)]
#[serde(untagged)]
enum Loose {
    Bool(bool),
    Int(u64),
    Text(String),
}

impl Loose {
    fn to_flag(&self) -> Option<bool> {
        match self {
            Loose::Bool(b) => Some(*b),
            Loose::Int(n) => Some(*n != 0),
            Loose::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
                "yes" | "true" | "1" => Some(true),
                "no" | "false" | "0" => Some(false),
                _ => None,
            },
        }
    }

    fn to_u32(&self) -> Option<u32> {
        match self {
            Loose::Bool(_) => None,
            Loose::Int(n) => u32::try_from(*n).ok(),
            Loose::Text(s) => s.trim().parse().ok(),
        }
    }
}

fn flag<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
    Ok(Option::<Loose>::deserialize(d)?
        .and_then(|v| v.to_flag())
        .unwrap_or(false))
}

fn optional_flag<'de, D: Deserializer<'de>>(d: D) -> Result<Option<bool>, D::Error> {
    Ok(Option::<Loose>::deserialize(d)?.and_then(|v| v.to_flag()))
}

fn optional_u32<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u32>, D::Error> {
    Ok(Option::<Loose>::deserialize(d)?.and_then(|v| v.to_u32()))
}

fn optional_text<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    Ok(Option::<String>::deserialize(d)?.filter(|s| !s.trim().is_empty()))
}

// ============================================================================
// Ticket
// ============================================================================

/// A requested item describing one database to provision.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Ticket {
    /// Human facing number, e.g. `RITM0001001`. Also used as branch name.
    pub number: String,
    /// Record identifier in the ticket store.
    pub sys_id: String,
    /// Owning cloud account.
    #[serde(default)]
    pub account: String,
    /// Catalog item the request was filed under.
    #[serde(default, rename = "cat_item_name")]
    pub catalog_item_name: String,
    /// Engine family, e.g. `mysql8.0`.
    pub engine: String,
    /// Resource identifier slug, e.g. `test-rds`.
    pub identifier: String,
    /// Initial database name.
    #[serde(default)]
    pub name: String,
    /// Size tier, e.g. `small`.
    #[serde(default)]
    pub size: String,
    /// Place the instance in multiple availability zones.
    #[serde(default, deserialize_with = "flag")]
    pub multi_az: bool,
    /// Master username.
    #[serde(default)]
    pub username: String,
    #[serde(default, deserialize_with = "optional_u32")]
    pub monitoring_interval: Option<u32>,
    #[serde(default, deserialize_with = "optional_flag")]
    pub performance_insights_enabled: Option<bool>,
    #[serde(default, deserialize_with = "optional_u32")]
    pub performance_insights_retention_period: Option<u32>,
    #[serde(default)]
    pub opened_by: String,
    #[serde(default)]
    pub requested_for: String,
    #[serde(default)]
    pub supervisor: String,
    #[serde(default)]
    pub comments: String,
    /// Per-environment size tiers (request summary mode only).
    #[serde(default, deserialize_with = "optional_text")]
    pub development_size: Option<String>,
    #[serde(default, deserialize_with = "optional_text")]
    pub test_size: Option<String>,
    #[serde(default, deserialize_with = "optional_text")]
    pub production_size: Option<String>,

    /// The record exactly as exported, kept for the request summary.
    #[serde(skip)]
    pub raw: Map<String, Value>,
}

impl Ticket {
    /// Parse an exported record.
    pub fn from_json(json: &str) -> Result<Self, TicketError> {
        let raw: Map<String, Value> =
            serde_json::from_str(json).map_err(|e| TicketError::Parse(e.to_string()))?;
        let mut ticket: Ticket = serde_json::from_value(Value::Object(raw.clone()))
            .map_err(|e| TicketError::Parse(e.to_string()))?;
        ticket.raw = raw;
        ticket.check_required()?;
        Ok(ticket)
    }

    /// Read and parse an exported record from disk.
    pub fn from_file(path: &Path) -> Result<Self, TicketError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| TicketError::Read(format!("{}: {}", path.display(), e)))?;
        Self::from_json(&content)
    }

    fn check_required(&self) -> Result<(), TicketError> {
        for (field, value) in [
            ("number", &self.number),
            ("sys_id", &self.sys_id),
            ("engine", &self.engine),
            ("identifier", &self.identifier),
        ] {
            if value.trim().is_empty() {
                return Err(TicketError::MissingField(field.to_string()));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RECORD: &str = r#"{
        "account": "grace-paas-development",
        "cat_item_name": "RDS Provisioning Request",
        "comments": "",
        "engine": "mysql8.0",
        "identifier": "test-rds",
        "development_count": "1",
        "development_multi_az": "false",
        "development_size": "small",
        "production_size": "large",
        "test_size": "",
        "multi_az": "Yes",
        "size": "small",
        "name": "TestDB",
        "number": "RITM0001001",
        "opened_by": "by@example.com",
        "requested_for": "for@example.com",
        "supervisor": "supervisor@example.com",
        "sys_id": "99aa00000aa9aa00a9a99999a99aaa99",
        "username": "TestUser",
        "monitoring_interval": "15"
    }"#;

    #[test]
    fn test_parse_record() {
        let ticket = Ticket::from_json(RECORD).unwrap();
        assert_eq!(ticket.number, "RITM0001001");
        assert_eq!(ticket.engine, "mysql8.0");
        assert_eq!(ticket.catalog_item_name, "RDS Provisioning Request");
        assert!(ticket.multi_az);
        assert_eq!(ticket.monitoring_interval, Some(15));
        assert_eq!(ticket.performance_insights_enabled, None);
        assert_eq!(ticket.development_size.as_deref(), Some("small"));
        assert_eq!(ticket.test_size, None);
        assert_eq!(
            ticket.raw.get("development_count"),
            Some(&Value::String("1".into()))
        );
    }

    #[test]
    fn test_multi_az_no() {
        let json = RECORD.replace(r#""multi_az": "Yes""#, r#""multi_az": "No""#);
        let ticket = Ticket::from_json(&json).unwrap();
        assert!(!ticket.multi_az);
    }

    #[test]
    fn test_missing_required_field() {
        let json = RECORD.replace(r#""identifier": "test-rds""#, r#""identifier": " ""#);
        let err = Ticket::from_json(&json).unwrap_err();
        assert!(matches!(err, TicketError::MissingField(ref f) if f == "identifier"));
    }

    #[test]
    fn test_not_an_object() {
        let err = Ticket::from_json("[1, 2]").unwrap_err();
        assert!(matches!(err, TicketError::Parse(_)));
    }

    #[test]
    fn test_from_file_missing() {
        let err = Ticket::from_file(Path::new("/nonexistent/ritm.json")).unwrap_err();
        assert!(matches!(err, TicketError::Read(_)));
    }
}
