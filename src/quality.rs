// ✅ Data Quality Engine - audit the store for the dirt the dataset is
// known to carry
//
// Findings only; nothing here mutates. The pruner stays content-blind by
// contract, so payload disagreement between duplicate copies is surfaced
// here instead.

use anyhow::Result;
use rusqlite::types::Value;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;

use crate::dedup::Pruner;
use crate::hours::{normalize_day, open_minutes};

// ============================================================================
// FINDINGS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    /// Data contradicts an expected invariant.
    Critical,
    /// Data is questionable or will be skipped by reports.
    Warning,
    /// Worth knowing; reports are unaffected.
    Info,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "CRITICAL",
            Severity::Warning => "WARNING",
            Severity::Info => "INFO",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityIssue {
    pub severity: Severity,
    pub table: String,
    pub detail: String,
    pub recommendation: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QualityReport {
    pub issues: Vec<QualityIssue>,
}

impl QualityReport {
    pub fn count(&self, severity: Severity) -> usize {
        self.issues.iter().filter(|i| i.severity == severity).count()
    }

    pub fn has_critical_issues(&self) -> bool {
        self.count(Severity::Critical) > 0
    }

    pub fn summary(&self) -> String {
        format!(
            "{} findings ({} critical, {} warning, {} info)",
            self.issues.len(),
            self.count(Severity::Critical),
            self.count(Severity::Warning),
            self.count(Severity::Info),
        )
    }
}

// ============================================================================
// PAYLOAD FINGERPRINTS
// ============================================================================

/// Key and non-key columns of one pruned table, for duplicate-payload
/// comparison.
struct FingerprintSpec {
    table: &'static str,
    key_columns: &'static [&'static str],
    payload_columns: &'static [&'static str],
}

// `subject` is absent: its logical key IS the whole row, so copies cannot
// disagree.
const FINGERPRINT_SPECS: [FingerprintSpec; 4] = [
    FingerprintSpec {
        table: "work",
        key_columns: &["work_id"],
        payload_columns: &["name", "artist_id", "style", "museum_id"],
    },
    FingerprintSpec {
        table: "product_size",
        key_columns: &["work_id", "size_id"],
        payload_columns: &["sale_price", "regular_price"],
    },
    FingerprintSpec {
        table: "image_link",
        key_columns: &["work_id", "url"],
        payload_columns: &["thumbnail_small_url", "thumbnail_large_url"],
    },
    FingerprintSpec {
        table: "museum_hours",
        key_columns: &["museum_id", "day"],
        payload_columns: &["open", "close"],
    },
];

fn value_to_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Integer(i) => i.to_string(),
        Value::Real(r) => r.to_string(),
        Value::Text(t) => t.clone(),
        Value::Blob(b) => format!("{:02x?}", b),
    }
}

fn payload_fingerprint(parts: &[String]) -> String {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part.as_bytes());
        hasher.update([0x1f]);
    }
    format!("{:x}", hasher.finalize())
}

// ============================================================================
// QUALITY ENGINE
// ============================================================================

pub struct QualityEngine;

impl QualityEngine {
    pub fn new() -> Self {
        QualityEngine
    }

    /// Run every check over the whole store.
    pub fn audit(&self, conn: &Connection) -> Result<QualityReport> {
        let mut report = QualityReport::default();

        self.check_price_inversions(conn, &mut report)?;
        self.check_numeric_cities(conn, &mut report)?;
        self.check_malformed_hours(conn, &mut report)?;
        self.check_dangling_work_refs(conn, &mut report)?;
        self.check_residual_duplicates(conn, &mut report)?;
        self.check_divergent_duplicates(conn, &mut report)?;

        Ok(report)
    }

    /// Sale price above regular price breaks the one invariant the
    /// pricing data is expected to hold.
    fn check_price_inversions(&self, conn: &Connection, report: &mut QualityReport) -> Result<()> {
        let mut stmt = conn.prepare(
            "SELECT work_id, size_id, sale_price, regular_price
             FROM product_size
             WHERE sale_price > regular_price",
        )?;

        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, f64>(2)?,
                    row.get::<_, f64>(3)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        for (work_id, size_id, sale, regular) in rows {
            report.issues.push(QualityIssue {
                severity: Severity::Critical,
                table: "product_size".to_string(),
                detail: format!(
                    "work {} size {}: sale price {:.2} exceeds regular price {:.2}",
                    work_id, size_id, sale, regular
                ),
                recommendation: "Verify the price pair against the upstream source".to_string(),
            });
        }

        Ok(())
    }

    /// City columns holding a bare street number.
    fn check_numeric_cities(&self, conn: &Connection, report: &mut QualityReport) -> Result<()> {
        let mut stmt = conn.prepare("SELECT museum_id, name, city FROM museum")?;

        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Option<String>>(2)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        for (museum_id, name, city) in rows {
            let numeric = city
                .as_deref()
                .map(|c| {
                    let trimmed = c.trim();
                    !trimmed.is_empty() && trimmed.chars().all(|ch| ch.is_ascii_digit())
                })
                .unwrap_or(false);

            if numeric {
                report.issues.push(QualityIssue {
                    severity: Severity::Warning,
                    table: "museum".to_string(),
                    detail: format!(
                        "museum {} ({}): city column holds \"{}\"",
                        museum_id,
                        name,
                        city.unwrap_or_default()
                    ),
                    recommendation: "City looks like a street number; repair upstream".to_string(),
                });
            }
        }

        Ok(())
    }

    /// Day names that do not normalize, and open/close pairs that do not
    /// yield a duration.
    fn check_malformed_hours(&self, conn: &Connection, report: &mut QualityReport) -> Result<()> {
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

        for (museum_id, day, open, close) in rows {
            if normalize_day(&day).is_none() {
                report.issues.push(QualityIssue {
                    severity: Severity::Warning,
                    table: "museum_hours".to_string(),
                    detail: format!("museum {}: unrecognized day \"{}\"", museum_id, day),
                    recommendation: "Day name is not one of the seven; schedule reports skip it"
                        .to_string(),
                });
            }

            if open_minutes(&open, &close).is_none() {
                report.issues.push(QualityIssue {
                    severity: Severity::Warning,
                    table: "museum_hours".to_string(),
                    detail: format!(
                        "museum {} {}: cannot derive open duration from \"{}\"–\"{}\"",
                        museum_id, day, open, close
                    ),
                    recommendation: "Open/close pair is unparseable or contradictory".to_string(),
                });
            }
        }

        Ok(())
    }

    /// Works pointing at artists or museums the store has never seen.
    fn check_dangling_work_refs(&self, conn: &Connection, report: &mut QualityReport) -> Result<()> {
        let mut stmt = conn.prepare(
            "SELECT DISTINCT w.work_id, w.artist_id FROM work w
             WHERE NOT EXISTS (SELECT 1 FROM artist a WHERE a.artist_id = w.artist_id)",
        )?;
        let orphan_artists = stmt
            .query_map([], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;

        for (work_id, artist_id) in orphan_artists {
            report.issues.push(QualityIssue {
                severity: Severity::Warning,
                table: "work".to_string(),
                detail: format!("work {} references missing artist {}", work_id, artist_id),
                recommendation: "Artist joins will drop this work".to_string(),
            });
        }

        let mut stmt = conn.prepare(
            "SELECT DISTINCT w.work_id, w.museum_id FROM work w
             WHERE w.museum_id IS NOT NULL
               AND NOT EXISTS (SELECT 1 FROM museum m WHERE m.museum_id = w.museum_id)",
        )?;
        let orphan_museums = stmt
            .query_map([], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;

        for (work_id, museum_id) in orphan_museums {
            report.issues.push(QualityIssue {
                severity: Severity::Warning,
                table: "work".to_string(),
                detail: format!("work {} references missing museum {}", work_id, museum_id),
                recommendation: "Museum joins will drop this work".to_string(),
            });
        }

        Ok(())
    }

    /// Duplicate logical keys still present (one finding per affected
    /// table, with the row count a prune would remove).
    fn check_residual_duplicates(&self, conn: &Connection, report: &mut QualityReport) -> Result<()> {
        let pruner = Pruner::new();

        for pending in pruner.count_duplicates(conn)? {
            if pending.removed > 0 {
                report.issues.push(QualityIssue {
                    severity: Severity::Info,
                    table: pending.table.clone(),
                    detail: format!(
                        "{} duplicate physical rows awaiting prune",
                        pending.removed
                    ),
                    recommendation: "Run the pruner to keep one copy per logical key".to_string(),
                });
            }
        }

        Ok(())
    }

    /// Duplicate groups whose copies disagree on non-key columns. The
    /// pruner keeps the earliest copy without looking; this check says
    /// when that assumption of identical payloads was wrong.
    fn check_divergent_duplicates(&self, conn: &Connection, report: &mut QualityReport) -> Result<()> {
        for spec in &FINGERPRINT_SPECS {
            let columns: Vec<&str> = spec
                .key_columns
                .iter()
                .chain(spec.payload_columns.iter())
                .copied()
                .collect();
            let sql = format!("SELECT {} FROM {}", columns.join(", "), spec.table);

            let mut stmt = conn.prepare(&sql)?;
            let key_len = spec.key_columns.len();

            let rows = stmt
                .query_map([], |row| {
                    let mut values = Vec::with_capacity(columns.len());
                    for index in 0..columns.len() {
                        values.push(row.get::<_, Value>(index)?);
                    }
                    Ok(values)
                })?
                .collect::<Result<Vec<_>, _>>()?;

            // key string → distinct payload fingerprints seen
            let mut groups: HashMap<String, Vec<String>> = HashMap::new();
            for values in rows {
                let key_parts: Vec<String> =
                    values[..key_len].iter().map(value_to_string).collect();
                let payload_parts: Vec<String> =
                    values[key_len..].iter().map(value_to_string).collect();

                let fingerprint = payload_fingerprint(&payload_parts);
                let entry = groups.entry(key_parts.join("|")).or_default();
                if !entry.contains(&fingerprint) {
                    entry.push(fingerprint);
                }
            }

            let mut divergent: Vec<(&String, usize)> = groups
                .iter()
                .filter(|(_, fingerprints)| fingerprints.len() > 1)
                .map(|(key, fingerprints)| (key, fingerprints.len()))
                .collect();
            divergent.sort();

            for (key, variants) in divergent {
                report.issues.push(QualityIssue {
                    severity: Severity::Info,
                    table: spec.table.to_string(),
                    detail: format!(
                        "logical key ({}) has {} distinct payloads among its copies",
                        key, variants
                    ),
                    recommendation:
                        "Pruning keeps the earliest copy; the discarded copies differed"
                            .to_string(),
                });
            }
        }

        Ok(())
    }
}

impl Default for QualityEngine {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// TESTS
// ============================================================================
