// Intent snapshots as served by the chain service. The matching and
// embedding pipeline that produces these lives outside this node; we
// only consume them for contradiction analysis.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A party's natural-language statement of desires and constraints,
/// identified by hash.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Intent {
    /// Content hash identifying the intent on the ledger
    pub hash: String,

    /// Party that declared the intent
    pub owner_id: String,

    /// The natural-language statement itself
    pub description: String,

    /// Hard constraints stated alongside the intent
    #[serde(default)]
    pub constraints: Vec<String>,

    pub declared_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intent_wire_shape() {
        let json = serde_json::json!({
            "hash": "abc123",
            "ownerId": "party-a",
            "description": "sell 100 units within two weeks",
            "constraints": ["price >= 140", "delivery <= 14 days"],
            "declaredAt": "2026-01-01T00:00:00Z"
        });
        let intent: Intent = serde_json::from_value(json).unwrap();
        assert_eq!(intent.owner_id, "party-a");
        assert_eq!(intent.constraints.len(), 2);
    }
}
