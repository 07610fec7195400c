// 📊 Reports - the analytical queries, as named operations over the store
//
// Aggregation happens in SQL (GROUP BY); every ranked report then goes
// through ranking::rank_filter rather than re-inlining the order/rank/
// filter dance. All reports read committed store state and tolerate
// pre-prune duplicates via COUNT(DISTINCT ...) / SELECT DISTINCT.

use anyhow::Result;
use rusqlite::{params, Connection};
use serde::Serialize;
use std::collections::{HashMap, HashSet};

use crate::hours::{normalize_day, open_minutes, DAY_NAMES};
use crate::ranking::{position_count, rank_filter, Positions, RankMethod, RankOrder};

// ============================================================================
// ROW TYPES
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkListing {
    pub work_id: i64,
    pub name: String,
    pub artist: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MuseumListing {
    pub museum_id: i64,
    pub name: String,
    pub city: Option<String>,
    pub country: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiscountedWork {
    pub work_id: i64,
    pub size_id: i64,
    pub name: String,
    pub sale_price: f64,
    pub regular_price: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CanvasPrice {
    pub label: String,
    pub sale_price: f64,
    pub position: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubjectPopularity {
    pub subject: String,
    pub works: i64,
    pub position: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MuseumPopularity {
    pub museum_id: i64,
    pub name: String,
    pub works: i64,
    pub position: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArtistPopularity {
    pub artist_id: i64,
    pub name: String,
    pub nationality: String,
    pub works: i64,
    pub position: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CanvasPopularity {
    pub size_id: i64,
    pub label: String,
    pub works: i64,
    pub position: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OpenStretch {
    pub museum_id: i64,
    pub museum: String,
    pub day: String,
    pub open: String,
    pub close: String,
    pub minutes: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PopularityTier {
    Popular,
    Unpopular,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StylePopularity {
    pub style: String,
    pub works: i64,
    pub position: usize,
    pub tier: PopularityTier,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MuseumStyleCount {
    pub museum_id: i64,
    pub museum: String,
    pub style: String,
    pub works: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TravelingArtist {
    pub artist_id: i64,
    pub name: String,
    pub countries: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocationCount {
    pub place: String,
    pub museums: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopLocations {
    pub countries: Vec<LocationCount>,
    pub cities: Vec<LocationCount>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PricedWork {
    pub work_id: i64,
    pub size_id: i64,
    pub work: String,
    pub artist: Option<String>,
    pub museum: Option<String>,
    pub canvas: Option<String>,
    pub sale_price: f64,
    pub regular_price: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceExtremes {
    pub most_expensive: Vec<PricedWork>,
    pub least_expensive: Vec<PricedWork>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CountryWorks {
    pub country: String,
    pub works: i64,
    pub position: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubjectSpecialist {
    pub artist_id: i64,
    pub name: String,
    pub nationality: String,
    pub works: i64,
    pub position: usize,
}

// ============================================================================
// LOOKUP HELPERS
// ============================================================================

fn museum_directory(conn: &Connection) -> Result<HashMap<i64, MuseumListing>> {
    let mut stmt = conn.prepare("SELECT museum_id, name, city, country FROM museum")?;

    let museums = stmt
        .query_map([], |row| {
            Ok(MuseumListing {
                museum_id: row.get(0)?,
                name: row.get(1)?,
                city: row.get(2)?,
                country: row.get(3)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(museums.into_iter().map(|m| (m.museum_id, m)).collect())
}

fn artist_directory(conn: &Connection) -> Result<HashMap<i64, (String, String)>> {
    let mut stmt = conn.prepare("SELECT artist_id, full_name, nationality FROM artist")?;

    let artists = stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(artists
        .into_iter()
        .map(|(id, name, nationality)| (id, (name, nationality)))
        .collect())
}

/// (id, count) groups from an aggregate query with two columns.
fn id_counts(conn: &Connection, sql: &str) -> Result<Vec<(i64, f64)>> {
    let mut stmt = conn.prepare(sql)?;
    let groups = stmt
        .query_map([], |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)? as f64))
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(groups)
}

/// (label, count) groups from an aggregate query with two columns.
fn label_counts(conn: &Connection, sql: &str) -> Result<Vec<(String, f64)>> {
    let mut stmt = conn.prepare(sql)?;
    let groups = stmt
        .query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as f64))
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(groups)
}

// ============================================================================
// LISTING REPORTS
// ============================================================================

/// Works not hanging in any museum.
pub fn works_not_on_display(conn: &Connection) -> Result<Vec<WorkListing>> {
    let mut stmt = conn.prepare(
        "SELECT DISTINCT w.work_id, w.name, a.full_name
         FROM work w
         LEFT JOIN artist a ON a.artist_id = w.artist_id
         WHERE w.museum_id IS NULL
         ORDER BY w.work_id",
    )?;

    let rows = stmt
        .query_map([], |row| {
            Ok(WorkListing {
                work_id: row.get(0)?,
                name: row.get(1)?,
                artist: row.get(2)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(rows)
}

/// Museums holding no works at all.
pub fn museums_without_works(conn: &Connection) -> Result<Vec<MuseumListing>> {
    let mut stmt = conn.prepare(
        "SELECT m.museum_id, m.name, m.city, m.country
         FROM museum m
         WHERE NOT EXISTS (SELECT 1 FROM work w WHERE w.museum_id = m.museum_id)
         ORDER BY m.museum_id",
    )?;

    let rows = stmt
        .query_map([], |row| {
            Ok(MuseumListing {
                museum_id: row.get(0)?,
                name: row.get(1)?,
                city: row.get(2)?,
                country: row.get(3)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(rows)
}

/// Price points with a sale price below half the regular price.
pub fn discounted_works(conn: &Connection) -> Result<Vec<DiscountedWork>> {
    let mut stmt = conn.prepare(
        "SELECT DISTINCT ps.work_id, ps.size_id, w.name, ps.sale_price, ps.regular_price
         FROM product_size ps
         JOIN work w ON w.work_id = ps.work_id
         WHERE ps.sale_price < ps.regular_price / 2.0
         ORDER BY ps.work_id, ps.size_id",
    )?;

    let rows = stmt
        .query_map([], |row| {
            Ok(DiscountedWork {
                work_id: row.get(0)?,
                size_id: row.get(1)?,
                name: row.get(2)?,
                sale_price: row.get(3)?,
                regular_price: row.get(4)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(rows)
}

// ============================================================================
// RANKED REPORTS
// ============================================================================

/// Canvas label(s) commanding the highest sale price. Dense rank so a
/// price tie lists every winning label.
pub fn priciest_canvas_size(conn: &Connection) -> Result<Vec<CanvasPrice>> {
    let mut stmt = conn.prepare(
        "SELECT cs.label, MAX(ps.sale_price)
         FROM product_size ps
         JOIN canvas_size cs ON cs.size_id = ps.size_id
         GROUP BY cs.label",
    )?;
    let groups = stmt
        .query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, f64>(1)?))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let ranked = rank_filter(
        groups,
        RankOrder::Descending,
        RankMethod::Dense,
        &Positions::single(1),
    );

    Ok(ranked
        .into_iter()
        .map(|r| CanvasPrice {
            label: r.key,
            sale_price: r.score,
            position: r.position,
        })
        .collect())
}

/// Most-painted subjects, dense-ranked so ties share a position.
pub fn top_subjects(conn: &Connection, n: usize) -> Result<Vec<SubjectPopularity>> {
    let groups = label_counts(
        conn,
        "SELECT s.subject, COUNT(DISTINCT s.work_id)
         FROM subject s
         GROUP BY s.subject",
    )?;

    let ranked = rank_filter(
        groups,
        RankOrder::Descending,
        RankMethod::Dense,
        &Positions::top(n),
    );

    Ok(ranked
        .into_iter()
        .map(|r| SubjectPopularity {
            subject: r.key,
            works: r.score as i64,
            position: r.position,
        })
        .collect())
}

/// Museums with the most works on display, ordinal top-n.
pub fn most_popular_museums(conn: &Connection, n: usize) -> Result<Vec<MuseumPopularity>> {
    let groups = id_counts(
        conn,
        "SELECT w.museum_id, COUNT(DISTINCT w.work_id)
         FROM work w
         WHERE w.museum_id IS NOT NULL
         GROUP BY w.museum_id",
    )?;
    let directory = museum_directory(conn)?;

    let ranked = rank_filter(
        groups,
        RankOrder::Descending,
        RankMethod::Ordinal,
        &Positions::top(n),
    );

    Ok(ranked
        .into_iter()
        .map(|r| MuseumPopularity {
            museum_id: r.key,
            name: directory
                .get(&r.key)
                .map(|m| m.name.clone())
                .unwrap_or_else(|| format!("museum {}", r.key)),
            works: r.score as i64,
            position: r.position,
        })
        .collect())
}

/// Artists with the most works (displayed or not), ordinal top-n.
pub fn most_popular_artists(conn: &Connection, n: usize) -> Result<Vec<ArtistPopularity>> {
    let groups = id_counts(
        conn,
        "SELECT w.artist_id, COUNT(DISTINCT w.work_id)
         FROM work w
         GROUP BY w.artist_id",
    )?;
    let directory = artist_directory(conn)?;

    let ranked = rank_filter(
        groups,
        RankOrder::Descending,
        RankMethod::Ordinal,
        &Positions::top(n),
    );

    Ok(ranked
        .into_iter()
        .map(|r| {
            let (name, nationality) = directory
                .get(&r.key)
                .cloned()
                .unwrap_or_else(|| (format!("artist {}", r.key), String::new()));
            ArtistPopularity {
                artist_id: r.key,
                name,
                nationality,
                works: r.score as i64,
                position: r.position,
            }
        })
        .collect())
}

/// Canvas sizes the fewest works were printed on, dense-ranked ascending.
pub fn least_popular_canvas_sizes(conn: &Connection, n: usize) -> Result<Vec<CanvasPopularity>> {
    let groups = id_counts(
        conn,
        "SELECT ps.size_id, COUNT(DISTINCT ps.work_id)
         FROM product_size ps
         GROUP BY ps.size_id",
    )?;

    let mut labels: HashMap<i64, String> = HashMap::new();
    let mut stmt = conn.prepare("SELECT size_id, label FROM canvas_size")?;
    let rows = stmt
        .query_map([], |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
        })?
        .collect::<Result<Vec<_>, _>>()?;
    for (size_id, label) in rows {
        labels.entry(size_id).or_insert(label);
    }

    let ranked = rank_filter(
        groups,
        RankOrder::Ascending,
        RankMethod::Dense,
        &Positions::top(n),
    );

    Ok(ranked
        .into_iter()
        .map(|r| CanvasPopularity {
            size_id: r.key,
            label: labels
                .get(&r.key)
                .cloned()
                .unwrap_or_else(|| format!("size {}", r.key)),
            works: r.score as i64,
            position: r.position,
        })
        .collect())
}

// ============================================================================
// SCHEDULE REPORTS
// ============================================================================

/// Day-sets per museum, with day names normalized. Rows whose day does
/// not normalize are skipped (the quality engine reports them).
fn open_days(conn: &Connection) -> Result<HashMap<i64, HashSet<&'static str>>> {
    let mut stmt = conn.prepare("SELECT museum_id, day FROM museum_hours")?;

    let rows = stmt
        .query_map([], |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut days: HashMap<i64, HashSet<&'static str>> = HashMap::new();
    for (museum_id, raw_day) in rows {
        if let Some(day) = normalize_day(&raw_day) {
            days.entry(museum_id).or_default().insert(day);
        }
    }

    Ok(days)
}

/// Museums open on every one of the given days.
pub fn museums_open_on(conn: &Connection, wanted: &[&str]) -> Result<Vec<MuseumListing>> {
    let mut required = Vec::with_capacity(wanted.len());
    for raw in wanted {
        let day = normalize_day(raw)
            .ok_or_else(|| anyhow::anyhow!("Unrecognized day name: {}", raw))?;
        required.push(day);
    }

    let days = open_days(conn)?;
    let directory = museum_directory(conn)?;

    let mut ids: Vec<i64> = days
        .iter()
        .filter(|(_, open)| required.iter().all(|day| open.contains(day)))
        .map(|(id, _)| *id)
        .collect();
    ids.sort_unstable();

    Ok(ids
        .into_iter()
        .filter_map(|id| directory.get(&id).cloned())
        .collect())
}

/// Museums open all seven days.
pub fn museums_open_every_day(conn: &Connection) -> Result<Vec<MuseumListing>> {
    museums_open_on(conn, &DAY_NAMES)
}

/// The (museum, day) with the longest open stretch.
pub fn longest_open_museum(conn: &Connection) -> Result<Option<OpenStretch>> {
    let mut stmt = conn.prepare("SELECT museum_id, day, open, close FROM museum_hours")?;

    let rows = stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut groups: Vec<((i64, String), f64)> = Vec::new();
    let mut raw: HashMap<(i64, String), (String, String)> = HashMap::new();

    for (museum_id, raw_day, open, close) in rows {
        let day = match normalize_day(&raw_day) {
            Some(day) => day.to_string(),
            None => continue,
        };
        let minutes = match open_minutes(&open, &close) {
            Some(minutes) => minutes,
            None => continue,
        };

        let key = (museum_id, day);
        // Duplicate (museum, day) rows: keep the first copy, like the pruner would
        if raw.contains_key(&key) {
            continue;
        }
        raw.insert(key.clone(), (open, close));
        groups.push((key, minutes as f64));
    }

    let ranked = rank_filter(
        groups,
        RankOrder::Descending,
        RankMethod::Ordinal,
        &Positions::single(1),
    );

    let top = match ranked.into_iter().next() {
        Some(top) => top,
        None => return Ok(None),
    };

    let directory = museum_directory(conn)?;
    let (museum_id, day) = top.key.clone();
    let (open, close) = raw.remove(&top.key).unwrap_or_default();

    Ok(Some(OpenStretch {
        museum_id,
        museum: directory
            .get(&museum_id)
            .map(|m| m.name.clone())
            .unwrap_or_else(|| format!("museum {}", museum_id)),
        day,
        open,
        close,
        minutes: top.score as i64,
    }))
}

// ============================================================================
// STYLE AND GEOGRAPHY REPORTS
// ============================================================================

/// The `head` most and `tail` least popular styles in one result, via a
/// rank-range union over ordinal positions.
pub fn style_popularity(conn: &Connection, head: usize, tail: usize) -> Result<Vec<StylePopularity>> {
    let groups = label_counts(
        conn,
        "SELECT w.style, COUNT(DISTINCT w.work_id)
         FROM work w
         WHERE w.style IS NOT NULL
         GROUP BY w.style",
    )?;

    let total = position_count(&groups, RankMethod::Ordinal);
    let positions = if total <= head + tail {
        Positions::all()
    } else {
        Positions::range(1, head).and_range(total - tail + 1, total)
    };

    let ranked = rank_filter(groups, RankOrder::Descending, RankMethod::Ordinal, &positions);

    Ok(ranked
        .into_iter()
        .map(|r| StylePopularity {
            style: r.key,
            works: r.score as i64,
            tier: if r.position <= head {
                PopularityTier::Popular
            } else {
                PopularityTier::Unpopular
            },
            position: r.position,
        })
        .collect())
}

/// Museum holding the most works of the single most popular style.
pub fn museum_with_most_of_top_style(conn: &Connection) -> Result<Option<MuseumStyleCount>> {
    let top_style = match style_popularity(conn, 1, 0)?.into_iter().next() {
        Some(style) => style.style,
        None => return Ok(None),
    };

    let mut stmt = conn.prepare(
        "SELECT w.museum_id, COUNT(DISTINCT w.work_id)
         FROM work w
         WHERE w.style = ?1 AND w.museum_id IS NOT NULL
         GROUP BY w.museum_id",
    )?;
    let groups = stmt
        .query_map(params![top_style], |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)? as f64))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let ranked = rank_filter(
        groups,
        RankOrder::Descending,
        RankMethod::Ordinal,
        &Positions::single(1),
    );

    let top = match ranked.into_iter().next() {
        Some(top) => top,
        None => return Ok(None),
    };

    let directory = museum_directory(conn)?;
    Ok(Some(MuseumStyleCount {
        museum_id: top.key,
        museum: directory
            .get(&top.key)
            .map(|m| m.name.clone())
            .unwrap_or_else(|| format!("museum {}", top.key)),
        style: top_style,
        works: top.score as i64,
    }))
}

/// Artists whose works hang in at least `min_countries` distinct
/// countries, most-traveled first.
pub fn artists_exhibited_in_multiple_countries(
    conn: &Connection,
    min_countries: i64,
) -> Result<Vec<TravelingArtist>> {
    let mut stmt = conn.prepare(
        "SELECT w.artist_id, COUNT(DISTINCT m.country)
         FROM work w
         JOIN museum m ON m.museum_id = w.museum_id
         GROUP BY w.artist_id
         HAVING COUNT(DISTINCT m.country) >= ?1",
    )?;
    let groups = stmt
        .query_map(params![min_countries], |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)? as f64))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let directory = artist_directory(conn)?;
    let ranked = rank_filter(
        groups,
        RankOrder::Descending,
        RankMethod::Ordinal,
        &Positions::all(),
    );

    Ok(ranked
        .into_iter()
        .map(|r| TravelingArtist {
            artist_id: r.key,
            name: directory
                .get(&r.key)
                .map(|(name, _)| name.clone())
                .unwrap_or_else(|| format!("artist {}", r.key)),
            countries: r.score as i64,
        })
        .collect())
}

/// Country and city with the most museums; dense rank 1 lists every tied
/// winner.
pub fn top_museum_locations(conn: &Connection) -> Result<TopLocations> {
    let country_groups = label_counts(
        conn,
        "SELECT country, COUNT(DISTINCT museum_id) FROM museum GROUP BY country",
    )?;
    let city_groups = label_counts(
        conn,
        "SELECT city, COUNT(DISTINCT museum_id)
         FROM museum
         WHERE city IS NOT NULL
         GROUP BY city",
    )?;

    let winners = |groups: Vec<(String, f64)>| -> Vec<LocationCount> {
        rank_filter(
            groups,
            RankOrder::Descending,
            RankMethod::Dense,
            &Positions::single(1),
        )
        .into_iter()
        .map(|r| LocationCount {
            place: r.key,
            museums: r.score as i64,
        })
        .collect()
    };

    Ok(TopLocations {
        countries: winners(country_groups),
        cities: winners(city_groups),
    })
}

/// Most and least expensive price points, with work, artist, museum and
/// canvas attached. Dense rank 1 from each end lists every tied row.
pub fn price_extremes(conn: &Connection) -> Result<PriceExtremes> {
    let mut stmt = conn.prepare(
        "SELECT DISTINCT ps.work_id, ps.size_id, w.name, a.full_name, m.name, cs.label,
                ps.sale_price, ps.regular_price
         FROM product_size ps
         JOIN work w ON w.work_id = ps.work_id
         LEFT JOIN artist a ON a.artist_id = w.artist_id
         LEFT JOIN museum m ON m.museum_id = w.museum_id
         LEFT JOIN canvas_size cs ON cs.size_id = ps.size_id",
    )?;

    let rows = stmt
        .query_map([], |row| {
            Ok(PricedWork {
                work_id: row.get(0)?,
                size_id: row.get(1)?,
                work: row.get(2)?,
                artist: row.get(3)?,
                museum: row.get(4)?,
                canvas: row.get(5)?,
                sale_price: row.get(6)?,
                regular_price: row.get(7)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut by_key: HashMap<(i64, i64), PricedWork> = HashMap::new();
    for row in rows {
        by_key.entry((row.work_id, row.size_id)).or_insert(row);
    }

    let groups: Vec<((i64, i64), f64)> = by_key
        .iter()
        .map(|(key, row)| (*key, row.sale_price))
        .collect();

    let pick = |order: RankOrder| -> Vec<PricedWork> {
        rank_filter(groups.clone(), order, RankMethod::Dense, &Positions::single(1))
            .into_iter()
            .filter_map(|r| by_key.get(&r.key).cloned())
            .collect()
    };

    Ok(PriceExtremes {
        most_expensive: pick(RankOrder::Descending),
        least_expensive: pick(RankOrder::Ascending),
    })
}

/// Country whose museums hold the k-th-highest number of works. Ordinal
/// rank, ties broken on country name.
pub fn country_by_work_count_at_rank(conn: &Connection, k: usize) -> Result<Option<CountryWorks>> {
    let groups = label_counts(
        conn,
        "SELECT m.country, COUNT(DISTINCT w.work_id)
         FROM work w
         JOIN museum m ON m.museum_id = w.museum_id
         GROUP BY m.country",
    )?;

    let ranked = rank_filter(
        groups,
        RankOrder::Descending,
        RankMethod::Ordinal,
        &Positions::single(k),
    );

    Ok(ranked.into_iter().next().map(|r| CountryWorks {
        country: r.key,
        works: r.score as i64,
        position: r.position,
    }))
}

/// Artists with the most works on a given subject displayed outside a
/// country, dense-ranked top-n.
pub fn top_subject_artists_outside(
    conn: &Connection,
    subject: &str,
    country: &str,
    n: usize,
) -> Result<Vec<SubjectSpecialist>> {
    let mut stmt = conn.prepare(
        "SELECT w.artist_id, COUNT(DISTINCT w.work_id)
         FROM work w
         JOIN subject s ON s.work_id = w.work_id
         JOIN museum m ON m.museum_id = w.museum_id
         WHERE s.subject = ?1 AND m.country <> ?2
         GROUP BY w.artist_id",
    )?;
    let groups = stmt
        .query_map(params![subject, country], |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)? as f64))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let directory = artist_directory(conn)?;
    let ranked = rank_filter(
        groups,
        RankOrder::Descending,
        RankMethod::Dense,
        &Positions::top(n),
    );

    Ok(ranked
        .into_iter()
        .map(|r| {
            let (name, nationality) = directory
                .get(&r.key)
                .cloned()
                .unwrap_or_else(|| (format!("artist {}", r.key), String::new()));
            SubjectSpecialist {
                artist_id: r.key,
                name,
                nationality,
                works: r.score as i64,
                position: r.position,
            }
        })
        .collect())
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{
        insert_artists, insert_canvas_sizes, insert_museum_hours, insert_museums,
        insert_product_sizes, insert_subjects, insert_works, setup_database,
    };
    use crate::entities::{Artist, CanvasSize, Museum, MuseumHours, ProductSize, Subject, Work};

    fn artist(artist_id: i64, full_name: &str, nationality: &str) -> Artist {
        Artist {
            artist_id,
            full_name: full_name.to_string(),
            first_name: None,
            middle_names: None,
            last_name: None,
            nationality: nationality.to_string(),
            style: None,
            birth: None,
            death: None,
        }
    }

    fn museum(museum_id: i64, name: &str, city: &str, country: &str) -> Museum {
        Museum {
            museum_id,
            name: name.to_string(),
            address: None,
            city: Some(city.to_string()),
            state: None,
            postal: None,
            country: country.to_string(),
            phone: None,
            url: None,
        }
    }

    fn hours(museum_id: i64, day: &str, open: &str, close: &str) -> MuseumHours {
        MuseumHours {
            museum_id,
            day: day.to_string(),
            open: open.to_string(),
            close: close.to_string(),
        }
    }

    fn work(work_id: i64, name: &str, artist_id: i64, style: &str, museum_id: Option<i64>) -> Work {
        Work {
            work_id,
            name: name.to_string(),
            artist_id,
            style: Some(style.to_string()),
            museum_id,
        }
    }

    fn price(work_id: i64, size_id: i64, sale: f64, regular: f64) -> ProductSize {
        ProductSize {
            work_id,
            size_id,
            sale_price: sale,
            regular_price: regular,
        }
    }

    /// Small but complete gallery: four museums, three artists, six works,
    /// schedules, subjects and prices — including the pre-prune duplicate
    /// copies the reports must tolerate.
    fn fixture() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();

        insert_artists(
            &conn,
            &[
                artist(500, "Rembrandt van Rijn", "Dutch"),
                artist(501, "Claude Monet", "French"),
                artist(502, "Vincent van Gogh", "Dutch"),
            ],
        )
        .unwrap();

        insert_museums(
            &conn,
            &[
                museum(30, "The Louvre", "Paris", "France"),
                museum(31, "The Met", "New York", "USA"),
                museum(32, "Empty Hall", "London", "UK"),
                museum(33, "Musee d'Orsay", "Paris", "France"),
            ],
        )
        .unwrap();

        let mut schedule = vec![
            hours(31, "Sunday", "10:00:AM", "09:00:PM"),
            hours(31, "Monday", "10:00:AM", "05:00:PM"),
            hours(32, "Monday", "10:00:AM", "05:00:PM"),
        ];
        for day in DAY_NAMES {
            schedule.push(hours(30, day, "09:00:AM", "06:00:PM"));
        }
        insert_museum_hours(&conn, &schedule).unwrap();

        insert_works(
            &conn,
            &[
                work(1, "The Night Watch", 500, "Baroque", Some(30)),
                // Duplicate physical copy of work 1, as the upstream CSV has
                work(1, "The Night Watch", 500, "Baroque", Some(30)),
                work(2, "Water Lilies", 501, "Impressionism", Some(30)),
                work(3, "The Starry Night", 502, "Post-Impressionism", Some(31)),
                work(4, "Sunflowers", 502, "Post-Impressionism", None),
                work(5, "Irises", 502, "Post-Impressionism", Some(30)),
                work(6, "Haystacks", 501, "Impressionism", Some(30)),
            ],
        )
        .unwrap();

        insert_subjects(
            &conn,
            &[
                Subject { work_id: 1, subject: "Portraits".to_string() },
                Subject { work_id: 2, subject: "Flowers".to_string() },
                Subject { work_id: 3, subject: "Landscape".to_string() },
                Subject { work_id: 4, subject: "Flowers".to_string() },
                Subject { work_id: 5, subject: "Flowers".to_string() },
                Subject { work_id: 6, subject: "Landscape".to_string() },
            ],
        )
        .unwrap();

        insert_canvas_sizes(
            &conn,
            &[
                CanvasSize { size_id: 24, width: Some(24), height: Some(30), label: "24\" x 30\"".to_string() },
                CanvasSize { size_id: 36, width: Some(36), height: Some(48), label: "36\" x 48\"".to_string() },
                CanvasSize { size_id: 30, width: Some(30), height: None, label: "30\"".to_string() },
            ],
        )
        .unwrap();

        insert_product_sizes(
            &conn,
            &[
                price(1, 24, 85.0, 125.0),
                price(1, 24, 85.0, 125.0),
                price(1, 36, 125.0, 125.0),
                price(2, 24, 30.0, 95.0),
                price(3, 36, 200.0, 225.0),
                price(4, 30, 10.0, 85.0),
                price(5, 24, 95.0, 125.0),
            ],
        )
        .unwrap();

        conn
    }

    #[test]
    fn test_works_not_on_display() {
        let conn = fixture();
        let rows = works_not_on_display(&conn).unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].work_id, 4);
        assert_eq!(rows[0].name, "Sunflowers");
        assert_eq!(rows[0].artist.as_deref(), Some("Vincent van Gogh"));
    }

    #[test]
    fn test_museums_without_works() {
        let conn = fixture();
        let rows = museums_without_works(&conn).unwrap();

        let ids: Vec<i64> = rows.iter().map(|m| m.museum_id).collect();
        assert_eq!(ids, vec![32, 33]);
    }

    #[test]
    fn test_discounted_works() {
        let conn = fixture();
        let rows = discounted_works(&conn).unwrap();

        // sale below half of regular: (2,24) at 30/95 and (4,30) at 10/85
        assert_eq!(rows.len(), 2);
        assert_eq!((rows[0].work_id, rows[0].size_id), (2, 24));
        assert_eq!((rows[1].work_id, rows[1].size_id), (4, 30));
    }

    #[test]
    fn test_priciest_canvas_size() {
        let conn = fixture();
        let rows = priciest_canvas_size(&conn).unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].label, "36\" x 48\"");
        assert_eq!(rows[0].sale_price, 200.0);
    }

    #[test]
    fn test_top_subjects() {
        let conn = fixture();
        let rows = top_subjects(&conn, 3).unwrap();

        assert_eq!(rows.len(), 3);
        assert_eq!((rows[0].subject.as_str(), rows[0].works, rows[0].position), ("Flowers", 3, 1));
        assert_eq!((rows[1].subject.as_str(), rows[1].works, rows[1].position), ("Landscape", 2, 2));
        assert_eq!((rows[2].subject.as_str(), rows[2].works, rows[2].position), ("Portraits", 1, 3));
    }

    #[test]
    fn test_museums_open_on_sunday_and_monday() {
        let conn = fixture();
        let rows = museums_open_on(&conn, &["Sunday", "Monday"]).unwrap();

        let ids: Vec<i64> = rows.iter().map(|m| m.museum_id).collect();
        assert_eq!(ids, vec![30, 31]);
    }

    #[test]
    fn test_museums_open_on_rejects_bad_day() {
        let conn = fixture();
        assert!(museums_open_on(&conn, &["Funday"]).is_err());
    }

    #[test]
    fn test_museums_open_every_day() {
        let conn = fixture();
        let rows = museums_open_every_day(&conn).unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].museum_id, 30);
    }

    #[test]
    fn test_most_popular_museums() {
        let conn = fixture();
        let rows = most_popular_museums(&conn, 2).unwrap();

        // The duplicate copy of work 1 must not inflate the count
        assert_eq!(rows.len(), 2);
        assert_eq!((rows[0].museum_id, rows[0].works, rows[0].position), (30, 4, 1));
        assert_eq!((rows[1].museum_id, rows[1].works, rows[1].position), (31, 1, 2));
    }

    #[test]
    fn test_most_popular_artists() {
        let conn = fixture();
        let rows = most_popular_artists(&conn, 2).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!((rows[0].artist_id, rows[0].works), (502, 3));
        assert_eq!(rows[0].name, "Vincent van Gogh");
        assert_eq!((rows[1].artist_id, rows[1].works), (501, 2));
    }

    #[test]
    fn test_least_popular_canvas_sizes() {
        let conn = fixture();
        let rows = least_popular_canvas_sizes(&conn, 1).unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].size_id, 30);
        assert_eq!(rows[0].works, 1);
        assert_eq!(rows[0].label, "30\"");
    }

    #[test]
    fn test_longest_open_museum() {
        let conn = fixture();
        let top = longest_open_museum(&conn).unwrap().unwrap();

        assert_eq!(top.museum_id, 31);
        assert_eq!(top.day, "Sunday");
        assert_eq!(top.minutes, 660);
        assert_eq!(top.museum, "The Met");
    }

    #[test]
    fn test_style_popularity_head_and_tail() {
        let conn = fixture();
        let rows = style_popularity(&conn, 1, 1).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].style, "Post-Impressionism");
        assert_eq!(rows[0].tier, PopularityTier::Popular);
        assert_eq!(rows[1].style, "Baroque");
        assert_eq!(rows[1].tier, PopularityTier::Unpopular);
        assert_eq!(rows[1].position, 3);
    }

    #[test]
    fn test_museum_with_most_of_top_style() {
        let conn = fixture();
        let top = museum_with_most_of_top_style(&conn).unwrap().unwrap();

        // Post-Impressionism is the top style; museums 30 and 31 tie with
        // one work each, so the ordinal tie-break picks the smaller id
        assert_eq!(top.style, "Post-Impressionism");
        assert_eq!(top.museum_id, 30);
        assert_eq!(top.works, 1);
    }

    #[test]
    fn test_artists_exhibited_in_multiple_countries() {
        let conn = fixture();
        let rows = artists_exhibited_in_multiple_countries(&conn, 2).unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].artist_id, 502);
        assert_eq!(rows[0].countries, 2);
    }

    #[test]
    fn test_top_museum_locations() {
        let conn = fixture();
        let top = top_museum_locations(&conn).unwrap();

        assert_eq!(top.countries.len(), 1);
        assert_eq!(top.countries[0].place, "France");
        assert_eq!(top.countries[0].museums, 2);
        assert_eq!(top.cities.len(), 1);
        assert_eq!(top.cities[0].place, "Paris");
    }

    #[test]
    fn test_price_extremes() {
        let conn = fixture();
        let extremes = price_extremes(&conn).unwrap();

        assert_eq!(extremes.most_expensive.len(), 1);
        let most = &extremes.most_expensive[0];
        assert_eq!((most.work_id, most.size_id), (3, 36));
        assert_eq!(most.sale_price, 200.0);
        assert_eq!(most.museum.as_deref(), Some("The Met"));
        assert_eq!(most.canvas.as_deref(), Some("36\" x 48\""));

        assert_eq!(extremes.least_expensive.len(), 1);
        let least = &extremes.least_expensive[0];
        assert_eq!((least.work_id, least.size_id), (4, 30));
        assert_eq!(least.museum, None);
    }

    #[test]
    fn test_country_by_work_count_at_rank() {
        let conn = fixture();

        let first = country_by_work_count_at_rank(&conn, 1).unwrap().unwrap();
        assert_eq!(first.country, "France");
        assert_eq!(first.works, 4);

        let second = country_by_work_count_at_rank(&conn, 2).unwrap().unwrap();
        assert_eq!(second.country, "USA");
        assert_eq!(second.works, 1);

        assert!(country_by_work_count_at_rank(&conn, 9).unwrap().is_none());
    }

    #[test]
    fn test_top_subject_artists_outside() {
        let conn = fixture();
        let rows = top_subject_artists_outside(&conn, "Landscape", "France", 1).unwrap();

        // Landscapes outside France: only The Starry Night at The Met
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].artist_id, 502);
        assert_eq!(rows[0].works, 1);
        assert_eq!(rows[0].nationality, "Dutch");
    }

    #[test]
    fn test_empty_store_reports() {
        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();

        assert!(works_not_on_display(&conn).unwrap().is_empty());
        assert!(most_popular_museums(&conn, 5).unwrap().is_empty());
        assert!(longest_open_museum(&conn).unwrap().is_none());
        assert!(museum_with_most_of_top_style(&conn).unwrap().is_none());
        assert!(country_by_work_count_at_rank(&conn, 1).unwrap().is_none());
        let extremes = price_extremes(&conn).unwrap();
        assert!(extremes.most_expensive.is_empty());
    }
}
