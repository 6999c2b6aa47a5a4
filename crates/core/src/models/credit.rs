//! Credit history models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One credit balance change
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreditTransaction {
    pub id: u64,
    pub amount: i64,
    #[serde(default)]
    pub reason: String,
    pub created_at: DateTime<Utc>,
}

/// Paged response from `GET /me/credit/history`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreditHistory {
    pub total: i64,
    #[serde(default)]
    pub items: Vec<CreditTransaction>,
}
