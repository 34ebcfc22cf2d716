//! Data models for feedjoin.
//!
//! This module contains the input records read from JSON (users,
//! transactions, products, catalog items) and the flattened asteroid
//! rows produced from the NeoWs feed.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

/// Opaque identifier shared between an entity and its events.
///
/// Upstream sources send either JSON integers or strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordId {
    Int(i64),
    Text(String),
}

impl RecordId {
    /// Whether this id carries no usable value (empty or blank string).
    pub fn is_blank(&self) -> bool {
        matches!(self, RecordId::Text(s) if s.trim().is_empty())
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordId::Int(n) => write!(f, "{}", n),
            RecordId::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<i64> for RecordId {
    fn from(n: i64) -> Self {
        RecordId::Int(n)
    }
}

impl From<i32> for RecordId {
    fn from(n: i32) -> Self {
        RecordId::Int(n.into())
    }
}

impl From<&str> for RecordId {
    fn from(s: &str) -> Self {
        RecordId::Text(s.to_string())
    }
}

/// Status tag carried by a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Status {
    Success,
    Failed,
    Pending,
    Other(String),
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Success => write!(f, "success"),
            Status::Failed => write!(f, "failed"),
            Status::Pending => write!(f, "pending"),
            Status::Other(s) => write!(f, "{}", s),
        }
    }
}

impl From<&str> for Status {
    fn from(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "success" | "succeeded" => Status::Success,
            "failed" | "failure" => Status::Failed,
            "pending" => Status::Pending,
            other => Status::Other(other.to_string()),
        }
    }
}

impl From<String> for Status {
    fn from(s: String) -> Self {
        Status::from(s.as_str())
    }
}

impl From<Status> for String {
    fn from(status: Status) -> Self {
        status.to_string()
    }
}

impl FromStr for Status {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Status::from(s))
    }
}

/// A user from the directory source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// Identifier shared with transactions.
    pub user_id: RecordId,
    /// Display name.
    pub name: String,
    /// Any other attributes the source carries (e.g. `status`).
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

impl User {
    #[allow(dead_code)] // Builder utility
    pub fn new(user_id: impl Into<RecordId>, name: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            name: name.into(),
            attributes: Map::new(),
        }
    }
}

/// A transaction from the event log.
///
/// Every field is optional on the wire; the aggregator decides what a
/// missing field means.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    #[serde(default)]
    pub user_id: Option<RecordId>,
    /// Raw amount, either a JSON number or a numeric string.
    #[serde(default)]
    pub amount: Option<Value>,
    #[serde(default, alias = "status")]
    pub state: Option<Status>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
}

impl Transaction {
    #[allow(dead_code)] // Builder utility
    pub fn new(user_id: impl Into<RecordId>, amount: impl Into<Value>, state: Status) -> Self {
        Self {
            user_id: Some(user_id.into()),
            amount: Some(amount.into()),
            state: Some(state),
            currency: None,
            date: None,
        }
    }

    /// Coerce the raw amount to a finite number.
    pub fn amount_value(&self) -> Option<f64> {
        self.amount.as_ref().and_then(coerce_amount)
    }

    /// Raw amount rendered for error messages.
    pub fn raw_amount(&self) -> String {
        match &self.amount {
            Some(value) => value.to_string(),
            None => "<missing>".to_string(),
        }
    }
}

/// Accepts JSON numbers and numeric strings; rejects NaN and infinities.
pub fn coerce_amount(raw: &Value) -> Option<f64> {
    let value = match raw {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;

    value.is_finite().then_some(value)
}

/// A flattened near-earth object from the NeoWs feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asteroid {
    /// Feed date the object was listed under (YYYY-MM-DD).
    #[serde(default)]
    pub date: String,
    pub name: String,
    pub min_diameter_m: f64,
    pub max_diameter_m: f64,
    pub is_hazardous: bool,
}

impl Asteroid {
    pub fn hazard_label(&self) -> &'static str {
        if self.is_hazardous {
            "Hazardous"
        } else {
            "Not Hazardous"
        }
    }
}

/// A product as reported by the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: RecordId,
    pub price: f64,
}

/// An item in the master catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogItem {
    pub id: RecordId,
    pub name: String,
}

/// A client product joined with its catalog entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncedProduct {
    pub id: RecordId,
    pub name: String,
    pub price: f64,
}
