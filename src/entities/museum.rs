// 🏛️ Museum records - museum.csv and museum_hours.csv

use serde::{Deserialize, Serialize};

/// Museum as supplied upstream.
///
/// The address columns are dirty: a handful of rows carry a street number
/// in `city`, and `state`/`postal`/`phone`/`url` are often blank. Nothing
/// is repaired at load time; the quality engine reports the dirt and the
/// reports ignore it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Museum {
    pub museum_id: i64,
    pub name: String,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal: Option<String>,
    pub country: String,
    pub phone: Option<String>,
    pub url: Option<String>,
}

impl Museum {
    /// "City, Country" for display; falls back to the country alone when
    /// the city is blank.
    pub fn location(&self) -> String {
        match &self.city {
            Some(city) if !city.trim().is_empty() => format!("{}, {}", city, self.country),
            _ => self.country.clone(),
        }
    }

    /// True when the city column holds a purely numeric string
    /// (a street number that slid into the wrong column upstream).
    pub fn has_numeric_city(&self) -> bool {
        match &self.city {
            Some(city) => {
                let trimmed = city.trim();
                !trimmed.is_empty() && trimmed.chars().all(|c| c.is_ascii_digit())
            }
            None => false,
        }
    }
}

/// One weekly-schedule entry: a museum, a day name, and open/close
/// clock strings exactly as supplied (`10:30:AM`). Parsing lives in
/// the `hours` module; the raw strings are kept so the quality engine
/// can point at the offending text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MuseumHours {
    pub museum_id: i64,
    pub day: String,
    pub open: String,
    pub close: String,
}
