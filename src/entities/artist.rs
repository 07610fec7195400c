// 🎨 Artist record - one row of artist.csv

use serde::{Deserialize, Serialize};

/// Painter as supplied by the upstream dataset.
///
/// `artist_id` is the logical identifier used by `work.artist_id`.
/// Name parts other than `full_name` are frequently blank upstream,
/// so everything beyond the id, full name and nationality is optional.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Artist {
    pub artist_id: i64,
    pub full_name: String,
    pub first_name: Option<String>,
    pub middle_names: Option<String>,
    pub last_name: Option<String>,
    pub nationality: String,
    pub style: Option<String>,
    pub birth: Option<i64>,
    pub death: Option<i64>,
}

impl Artist {
    /// Display name: the full name, falling back to "first last" when the
    /// upstream full_name column is blank.
    pub fn display_name(&self) -> String {
        if !self.full_name.trim().is_empty() {
            return self.full_name.clone();
        }

        let mut parts = Vec::new();
        if let Some(first) = &self.first_name {
            parts.push(first.as_str());
        }
        if let Some(last) = &self.last_name {
            parts.push(last.as_str());
        }
        parts.join(" ")
    }

    /// Years lived, when both birth and death are recorded.
    pub fn lifespan_years(&self) -> Option<i64> {
        match (self.birth, self.death) {
            (Some(birth), Some(death)) if death >= birth => Some(death - birth),
            _ => None,
        }
    }
}
