//! Check-in models: wheel configuration, daily status, and spin results

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One weighted slice of the check-in wheel
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewardOption {
    pub id: u64,
    pub label: String,
    pub credits: i64,
    #[serde(default)]
    pub color: Option<String>,
    /// Selection weight. Server-side only; the client never draws from it.
    #[serde(default, alias = "probability")]
    pub probability_weight: u32,
}

/// A single decay step rendered in the console legend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecayRule {
    pub threshold: i64,
    pub multiplier_percent: u32,
}

/// Response from `GET /me/check_in/config`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckInConfig {
    #[serde(default)]
    pub level: i32,
    pub base_reward: i64,
    pub decay_threshold: i64,
    pub min_multiplier_percent: u32,
    /// Multiplier currently applied to this user, 100 = full reward
    #[serde(default = "default_multiplier")]
    pub current_multiplier: u32,
    #[serde(default)]
    pub reward_options: Vec<RewardOption>,
    #[serde(default)]
    pub decay_rules: Vec<DecayRule>,
}

fn default_multiplier() -> u32 {
    100
}

impl Default for CheckInConfig {
    fn default() -> Self {
        Self {
            level: 0,
            base_reward: 0,
            decay_threshold: 0,
            min_multiplier_percent: 0,
            current_multiplier: default_multiplier(),
            reward_options: Vec::new(),
            decay_rules: Vec::new(),
        }
    }
}

/// One row of check-in history
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckInLogEntry {
    pub id: u64,
    pub check_in_date: DateTime<Utc>,
    pub earned_credits: i64,
    pub streak: u32,
}

/// Response from `GET /me/check_in/status`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CheckInStatus {
    pub checked_in_today: bool,
    #[serde(default)]
    pub today_reward: Option<i64>,
    #[serde(default)]
    pub streak: u32,
    #[serde(default)]
    pub credits: i64,
    #[serde(default)]
    pub recent_logs: Vec<CheckInLogEntry>,
}

/// Server-chosen spin outcome from `POST /me/check_in/spin`
///
/// `wheel_index` points into the config's `reward_options`; the multiplier is
/// server-authoritative and only displayed here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpinResult {
    pub wheel_index: usize,
    pub label: String,
    pub base_credits: i64,
    pub multiplier_percent: u32,
    pub final_credits: i64,
    #[serde(default)]
    pub color: Option<String>,
}

impl SpinResult {
    /// What `final_credits` must equal: round(base × multiplier / 100)
    pub fn expected_final_credits(&self) -> i64 {
        (self.base_credits as f64 * self.multiplier_percent as f64 / 100.0).round() as i64
    }
}

/// Full response from a successful spin
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpinResponse {
    pub reward: SpinResult,
    #[serde(default)]
    pub streak: u32,
    #[serde(default)]
    pub credits: i64,
    #[serde(default)]
    pub recent_logs: Vec<CheckInLogEntry>,
}

/// Error body the backend sends with non-2xx statuses, e.g.
/// `{"error": "already_checked_in"}`
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorBody {
    pub error: String,
}
