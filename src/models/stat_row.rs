//! Normalized row ready for storage.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{Dataset, Season};

/// One row of one dataset, keyed for idempotent upserts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatRow {
    pub dataset: Dataset,
    /// Key columns joined with `:` (season first for seasonal datasets).
    pub natural_key: String,
    pub season: Option<Season>,
    /// Column name to value, as returned by the API.
    pub payload: Map<String, Value>,
}

impl StatRow {
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.payload.get(column)
    }

    /// Integer column, accepting numbers or numeric strings.
    pub fn get_i64(&self, column: &str) -> Option<i64> {
        match self.payload.get(column)? {
            Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn payload_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_get_i64_accepts_strings() {
        let payload = json!({"FROM_YEAR": "2003", "TO_YEAR": 2024, "NAME": "x"});
        let row = StatRow {
            dataset: Dataset::Players,
            natural_key: "2544".into(),
            season: None,
            payload: payload.as_object().unwrap().clone(),
        };
        assert_eq!(row.get_i64("FROM_YEAR"), Some(2003));
        assert_eq!(row.get_i64("TO_YEAR"), Some(2024));
        assert_eq!(row.get_i64("NAME"), None);
        assert_eq!(row.get_i64("MISSING"), None);
    }
}
