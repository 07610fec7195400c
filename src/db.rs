use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::entities::{Artist, CanvasSize, ImageLink, Museum, MuseumHours, ProductSize, Subject, Work};

/// Data tables managed by this store, in ingest order.
///
/// SQLite's implicit rowid is the physical identity of every row: the
/// ingest never declares UNIQUE constraints on logical keys, because the
/// upstream CSVs genuinely contain duplicated rows and representing them
/// faithfully is the point — the pruner is the cleanup tool.
pub const DATA_TABLES: [&str; 8] = [
    "artist",
    "museum",
    "museum_hours",
    "work",
    "canvas_size",
    "product_size",
    "subject",
    "image_link",
];

pub fn setup_database(conn: &Connection) -> Result<()> {
    // Enable WAL mode for crash recovery
    conn.pragma_update(None, "journal_mode", "WAL")?;

    // ==========================================================================
    // Dataset tables - mirror the eight upstream CSVs, duplicates and all
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS artist (
            artist_id INTEGER NOT NULL,
            full_name TEXT NOT NULL,
            first_name TEXT,
            middle_names TEXT,
            last_name TEXT,
            nationality TEXT NOT NULL,
            style TEXT,
            birth INTEGER,
            death INTEGER
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS museum (
            museum_id INTEGER NOT NULL,
            name TEXT NOT NULL,
            address TEXT,
            city TEXT,
            state TEXT,
            postal TEXT,
            country TEXT NOT NULL,
            phone TEXT,
            url TEXT
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS museum_hours (
            museum_id INTEGER NOT NULL,
            day TEXT NOT NULL,
            open TEXT NOT NULL,
            close TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS work (
            work_id INTEGER NOT NULL,
            name TEXT NOT NULL,
            artist_id INTEGER NOT NULL,
            style TEXT,
            museum_id INTEGER
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS canvas_size (
            size_id INTEGER NOT NULL,
            width INTEGER,
            height INTEGER,
            label TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS product_size (
            work_id INTEGER NOT NULL,
            size_id INTEGER NOT NULL,
            sale_price REAL NOT NULL,
            regular_price REAL NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS subject (
            work_id INTEGER NOT NULL,
            subject TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS image_link (
            work_id INTEGER NOT NULL,
            url TEXT,
            thumbnail_small_url TEXT,
            thumbnail_large_url TEXT
        )",
        [],
    )?;

    // ==========================================================================
    // Import log - one row per ingested file
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS import_log (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            batch_id TEXT NOT NULL,
            source_file TEXT NOT NULL,
            row_count INTEGER NOT NULL,
            started_at TEXT NOT NULL,
            finished_at TEXT NOT NULL
        )",
        [],
    )?;

    // ==========================================================================
    // Indexes - join columns used by every report
    // ==========================================================================
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_work_artist ON work(artist_id)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_work_museum ON work(museum_id)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_product_size_work ON product_size(work_id, size_id)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_subject_work ON subject(work_id)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_hours_museum ON museum_hours(museum_id)",
        [],
    )?;

    Ok(())
}

/// Deserialize every row of one CSV file.
pub fn load_records<T: DeserializeOwned>(csv_path: &Path) -> Result<Vec<T>> {
    let mut rdr = csv::Reader::from_path(csv_path)
        .with_context(|| format!("Failed to open CSV file {}", csv_path.display()))?;

    let mut records = Vec::new();
    for result in rdr.deserialize() {
        let record: T = result
            .with_context(|| format!("Failed to deserialize row in {}", csv_path.display()))?;
        records.push(record);
    }

    Ok(records)
}

// ============================================================================
// INSERTERS
// ============================================================================

pub fn insert_artists(conn: &Connection, artists: &[Artist]) -> Result<usize> {
    let mut stmt = conn.prepare(
        "INSERT INTO artist (
            artist_id, full_name, first_name, middle_names, last_name,
            nationality, style, birth, death
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
    )?;

    for artist in artists {
        stmt.execute(params![
            artist.artist_id,
            artist.full_name,
            artist.first_name,
            artist.middle_names,
            artist.last_name,
            artist.nationality,
            artist.style,
            artist.birth,
            artist.death,
        ])?;
    }

    Ok(artists.len())
}

pub fn insert_museums(conn: &Connection, museums: &[Museum]) -> Result<usize> {
    let mut stmt = conn.prepare(
        "INSERT INTO museum (
            museum_id, name, address, city, state, postal, country, phone, url
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
    )?;

    for museum in museums {
        stmt.execute(params![
            museum.museum_id,
            museum.name,
            museum.address,
            museum.city,
            museum.state,
            museum.postal,
            museum.country,
            museum.phone,
            museum.url,
        ])?;
    }

    Ok(museums.len())
}

pub fn insert_museum_hours(conn: &Connection, hours: &[MuseumHours]) -> Result<usize> {
    let mut stmt = conn.prepare(
        "INSERT INTO museum_hours (museum_id, day, open, close)
         VALUES (?1, ?2, ?3, ?4)",
    )?;

    for entry in hours {
        stmt.execute(params![entry.museum_id, entry.day, entry.open, entry.close])?;
    }

    Ok(hours.len())
}

pub fn insert_works(conn: &Connection, works: &[Work]) -> Result<usize> {
    let mut stmt = conn.prepare(
        "INSERT INTO work (work_id, name, artist_id, style, museum_id)
         VALUES (?1, ?2, ?3, ?4, ?5)",
    )?;

    for work in works {
        stmt.execute(params![
            work.work_id,
            work.name,
            work.artist_id,
            work.style,
            work.museum_id,
        ])?;
    }

    Ok(works.len())
}

pub fn insert_canvas_sizes(conn: &Connection, sizes: &[CanvasSize]) -> Result<usize> {
    let mut stmt = conn.prepare(
        "INSERT INTO canvas_size (size_id, width, height, label)
         VALUES (?1, ?2, ?3, ?4)",
    )?;

    for size in sizes {
        stmt.execute(params![size.size_id, size.width, size.height, size.label])?;
    }

    Ok(sizes.len())
}

pub fn insert_product_sizes(conn: &Connection, prices: &[ProductSize]) -> Result<usize> {
    let mut stmt = conn.prepare(
        "INSERT INTO product_size (work_id, size_id, sale_price, regular_price)
         VALUES (?1, ?2, ?3, ?4)",
    )?;

    for price in prices {
        stmt.execute(params![
            price.work_id,
            price.size_id,
            price.sale_price,
            price.regular_price,
        ])?;
    }

    Ok(prices.len())
}

pub fn insert_subjects(conn: &Connection, subjects: &[Subject]) -> Result<usize> {
    let mut stmt = conn.prepare("INSERT INTO subject (work_id, subject) VALUES (?1, ?2)")?;

    for subject in subjects {
        stmt.execute(params![subject.work_id, subject.subject])?;
    }

    Ok(subjects.len())
}

pub fn insert_image_links(conn: &Connection, links: &[ImageLink]) -> Result<usize> {
    let mut stmt = conn.prepare(
        "INSERT INTO image_link (work_id, url, thumbnail_small_url, thumbnail_large_url)
         VALUES (?1, ?2, ?3, ?4)",
    )?;

    for link in links {
        stmt.execute(params![
            link.work_id,
            link.url,
            link.thumbnail_small_url,
            link.thumbnail_large_url,
        ])?;
    }

    Ok(links.len())
}

// ============================================================================
// IMPORT LOG
// ============================================================================

/// One ingested file: which batch it belonged to, where it came from,
/// how many rows landed, and when.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportBatch {
    pub batch_id: String,
    pub source_file: String,
    pub row_count: i64,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

pub fn insert_import_batch(conn: &Connection, batch: &ImportBatch) -> Result<()> {
    conn.execute(
        "INSERT INTO import_log (batch_id, source_file, row_count, started_at, finished_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            batch.batch_id,
            batch.source_file,
            batch.row_count,
            batch.started_at.to_rfc3339(),
            batch.finished_at.to_rfc3339(),
        ],
    )?;

    Ok(())
}

pub fn get_import_log(conn: &Connection) -> Result<Vec<ImportBatch>> {
    let mut stmt = conn.prepare(
        "SELECT batch_id, source_file, row_count, started_at, finished_at
         FROM import_log
         ORDER BY id",
    )?;

    let batches = stmt
        .query_map([], |row| {
            let started_str: String = row.get(3)?;
            let finished_str: String = row.get(4)?;

            let started_at = DateTime::parse_from_rfc3339(&started_str)
                .map_err(|_| rusqlite::Error::InvalidQuery)?
                .with_timezone(&Utc);
            let finished_at = DateTime::parse_from_rfc3339(&finished_str)
                .map_err(|_| rusqlite::Error::InvalidQuery)?
                .with_timezone(&Utc);

            Ok(ImportBatch {
                batch_id: row.get(0)?,
                source_file: row.get(1)?,
                row_count: row.get(2)?,
                started_at,
                finished_at,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(batches)
}

// ============================================================================
// DATASET IMPORT
// ============================================================================

/// Row counts per ingested file, in ingest order.
#[derive(Debug, Clone, Serialize)]
pub struct ImportSummary {
    pub batch_id: String,
    pub files: Vec<(String, usize)>,
}

impl ImportSummary {
    pub fn total_rows(&self) -> usize {
        self.files.iter().map(|(_, count)| count).sum()
    }
}

/// Ingest all eight CSVs from `data_dir` into the store under a single
/// batch id. Files are loaded fully before any insert, so a malformed
/// file fails the import before it half-lands.
pub fn import_dataset(conn: &Connection, data_dir: &Path) -> Result<ImportSummary> {
    let batch_id = uuid::Uuid::new_v4().to_string();
    let mut files = Vec::new();

    let mut ingest = |file: &str, inserted: usize, started_at: DateTime<Utc>| -> Result<()> {
        let batch = ImportBatch {
            batch_id: batch_id.clone(),
            source_file: file.to_string(),
            row_count: inserted as i64,
            started_at,
            finished_at: Utc::now(),
        };
        insert_import_batch(conn, &batch)?;
        files.push((file.to_string(), inserted));
        Ok(())
    };

    let started = Utc::now();
    let artists: Vec<Artist> = load_records(&data_dir.join("artist.csv"))?;
    ingest("artist.csv", insert_artists(conn, &artists)?, started)?;

    let started = Utc::now();
    let museums: Vec<Museum> = load_records(&data_dir.join("museum.csv"))?;
    ingest("museum.csv", insert_museums(conn, &museums)?, started)?;

    let started = Utc::now();
    let hours: Vec<MuseumHours> = load_records(&data_dir.join("museum_hours.csv"))?;
    ingest("museum_hours.csv", insert_museum_hours(conn, &hours)?, started)?;

    let started = Utc::now();
    let works: Vec<Work> = load_records(&data_dir.join("work.csv"))?;
    ingest("work.csv", insert_works(conn, &works)?, started)?;

    let started = Utc::now();
    let sizes: Vec<CanvasSize> = load_records(&data_dir.join("canvas_size.csv"))?;
    ingest("canvas_size.csv", insert_canvas_sizes(conn, &sizes)?, started)?;

    let started = Utc::now();
    let prices: Vec<ProductSize> = load_records(&data_dir.join("product_size.csv"))?;
    ingest("product_size.csv", insert_product_sizes(conn, &prices)?, started)?;

    let started = Utc::now();
    let subjects: Vec<Subject> = load_records(&data_dir.join("subject.csv"))?;
    ingest("subject.csv", insert_subjects(conn, &subjects)?, started)?;

    let started = Utc::now();
    let links: Vec<ImageLink> = load_records(&data_dir.join("image_link.csv"))?;
    ingest("image_link.csv", insert_image_links(conn, &links)?, started)?;

    Ok(ImportSummary { batch_id, files })
}

/// Row count of one managed table. The name must be one of `DATA_TABLES`
/// (table names cannot be bound as parameters).
pub fn count_rows(conn: &Connection, table: &str) -> Result<i64> {
    if !DATA_TABLES.contains(&table) {
        anyhow::bail!("Unknown table: {}", table);
    }

    let count: i64 =
        conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| row.get(0))?;

    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    pub fn test_connection() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();
        conn
    }

    fn test_work(work_id: i64, museum_id: Option<i64>) -> Work {
        Work {
            work_id,
            name: format!("Work {}", work_id),
            artist_id: 500,
            style: Some("Baroque".to_string()),
            museum_id,
        }
    }

    #[test]
    fn test_setup_is_reentrant() {
        let conn = test_connection();
        // CREATE TABLE IF NOT EXISTS means a second pass is harmless
        setup_database(&conn).unwrap();
    }

    #[test]
    fn test_insert_and_count_works() {
        let conn = test_connection();

        let works = vec![test_work(1, Some(30)), test_work(2, None)];
        let inserted = insert_works(&conn, &works).unwrap();

        assert_eq!(inserted, 2);
        assert_eq!(count_rows(&conn, "work").unwrap(), 2);
    }

    #[test]
    fn test_duplicates_are_representable() {
        let conn = test_connection();

        // The store takes the CSVs as they come: the same logical row
        // twice means two physical rows
        let works = vec![test_work(1, Some(30)), test_work(1, Some(30))];
        insert_works(&conn, &works).unwrap();

        assert_eq!(count_rows(&conn, "work").unwrap(), 2);
    }

    #[test]
    fn test_count_rows_rejects_unknown_table() {
        let conn = test_connection();
        assert!(count_rows(&conn, "import_log; DROP TABLE work").is_err());
    }

    #[test]
    fn test_import_log_round_trip() {
        let conn = test_connection();

        let batch = ImportBatch {
            batch_id: uuid::Uuid::new_v4().to_string(),
            source_file: "work.csv".to_string(),
            row_count: 14776,
            started_at: Utc::now(),
            finished_at: Utc::now(),
        };
        insert_import_batch(&conn, &batch).unwrap();

        let log = get_import_log(&conn).unwrap();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].source_file, "work.csv");
        assert_eq!(log[0].row_count, 14776);
        assert_eq!(log[0].batch_id, batch.batch_id);
    }
}
