// src/usage.rs
//
// Tracks how often and how recently each template or phrase was applied, so
// the lookup can rank the radiologist's habitual choices first.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::UsageError;

/// Largest ranking boost usage can earn (scores are lower-is-better)
pub const MAX_USAGE_BOOST: f32 = 0.2;

/// Days to consider for "recent" usage
const RECENT_DAYS: i64 = 7;

/// Use count at which the frequency part of the boost saturates
const SATURATION_COUNT: f32 = 20.0;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct UsageRecord {
    pub id: String,
    pub use_count: u32,
    pub last_used: DateTime<Utc>,
}

impl UsageRecord {
    /// Boost in `[0, MAX_USAGE_BOOST]`, half log-frequency and half recency
    pub fn boost_at(&self, now: DateTime<Utc>) -> f32 {
        if self.use_count == 0 {
            return 0.0;
        }

        let frequency = ((1.0 + self.use_count as f32).ln() / (1.0 + SATURATION_COUNT).ln()).min(1.0);

        let recency = if self.last_used > now - Duration::days(RECENT_DAYS) {
            1.0
        } else {
            // Decay score based on how old the last use is
            let days_old = (now - self.last_used).num_days() as f32;
            (1.0 / (1.0 + days_old / 30.0)).max(0.1)
        };

        (MAX_USAGE_BOOST * (0.5 * frequency + 0.5 * recency)).clamp(0.0, MAX_USAGE_BOOST)
    }
}

#[derive(Debug, Default, Clone)]
pub struct UsageTracker {
    /// Candidate id -> usage data
    usage_map: HashMap<String, UsageRecord>,
}

impl UsageTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that a template or phrase was applied
    pub fn record_usage(&mut self, id: &str) {
        self.record_usage_at(id, Utc::now());
    }

    pub fn record_usage_at(&mut self, id: &str, now: DateTime<Utc>) {
        match self.usage_map.get_mut(id) {
            Some(usage) => {
                usage.use_count = usage.use_count.saturating_add(1);
                usage.last_used = now;
            }
            None => {
                self.usage_map.insert(
                    id.to_string(),
                    UsageRecord {
                        id: id.to_string(),
                        use_count: 1,
                        last_used: now,
                    },
                );
            }
        }
    }

    pub fn get(&self, id: &str) -> Option<&UsageRecord> {
        self.usage_map.get(id)
    }

    /// All records, most used first
    pub fn records(&self) -> Vec<UsageRecord> {
        let mut records: Vec<UsageRecord> = self.usage_map.values().cloned().collect();
        records.sort_by(|a, b| b.use_count.cmp(&a.use_count).then_with(|| a.id.cmp(&b.id)));
        records
    }

    pub fn len(&self) -> usize {
        self.usage_map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.usage_map.is_empty()
    }

    /// Load usage data from persistent storage. A missing file is an empty history.
    pub fn load_from_file(path: &Path) -> Result<Self, UsageError> {
        if !path.exists() {
            return Ok(Self::new());
        }

        let data = fs::read_to_string(path).map_err(|source| UsageError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let usage_list: Vec<UsageRecord> = serde_json::from_str(&data)?;

        let usage_map = usage_list
            .into_iter()
            .map(|usage| (usage.id.clone(), usage))
            .collect();
        Ok(Self { usage_map })
    }

    pub fn save_to_file(&self, path: &Path) -> Result<(), UsageError> {
        let json = serde_json::to_string_pretty(&self.records())?;

        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).map_err(|source| UsageError::Io {
                path: dir.to_path_buf(),
                source,
            })?;
        }
        fs::write(path, json).map_err(|source| UsageError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        log::debug!("[UsageTracker] Saved {} usage records to {}", self.len(), path.display());
        Ok(())
    }
}
