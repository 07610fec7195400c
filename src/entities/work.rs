// 🖼️ Work records - work.csv, subject.csv and image_link.csv

use serde::{Deserialize, Serialize};

/// Painting as supplied upstream.
///
/// `museum_id` is blank for works not hanging anywhere; `style` is blank
/// for a few hundred rows. The upstream extract also repeats whole rows,
/// which is why `work_id` is a logical key here and not a primary key in
/// the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Work {
    pub work_id: i64,
    pub name: String,
    pub artist_id: i64,
    pub style: Option<String>,
    pub museum_id: Option<i64>,
}

impl Work {
    pub fn is_on_display(&self) -> bool {
        self.museum_id.is_some()
    }
}

/// Subject tag for a work. A work carries any number of subjects; the
/// logical key is (work_id, subject).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subject {
    pub work_id: i64,
    pub subject: String,
}

/// Image URLs for a work; logical key (work_id, url).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageLink {
    pub work_id: i64,
    pub url: Option<String>,
    pub thumbnail_small_url: Option<String>,
    pub thumbnail_large_url: Option<String>,
}
