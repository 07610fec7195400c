// 🧹 Duplicate-Row Pruner - keep one physical row per logical key
//
// Two forms, one contract: among rows sharing a logical key, the row with
// the smallest physical identity survives and every other copy is removed.
// The survivor choice is arbitrary but deterministic; payloads of the
// discarded copies are NOT compared (the quality engine reports on that
// separately).

use anyhow::Result;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::hash::Hash;

// ============================================================================
// IN-MEMORY FORM
// ============================================================================

/// Result of pruning a record collection in memory.
#[derive(Debug, Clone)]
pub struct PruneOutcome<T> {
    /// Surviving records, in their original order.
    pub kept: Vec<T>,

    /// How many records were dropped as duplicate copies.
    pub removed: usize,
}

/// Single pass over records in physical-identity order: emit a record the
/// first time its logical key is seen, drop every later copy. The seen-set
/// lives only for the duration of the call.
pub fn prune_rows<T, K, F>(records: Vec<T>, key: F) -> PruneOutcome<T>
where
    K: Eq + Hash,
    F: Fn(&T) -> K,
{
    let mut seen = HashSet::new();
    let mut kept = Vec::with_capacity(records.len());
    let mut removed = 0;

    for record in records {
        if seen.insert(key(&record)) {
            kept.push(record);
        } else {
            removed += 1;
        }
    }

    PruneOutcome { kept, removed }
}

// ============================================================================
// STORE FORM
// ============================================================================

/// One table to prune and the columns forming its logical key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PruneSpec {
    pub table: &'static str,
    pub key_columns: &'static [&'static str],
}

impl PruneSpec {
    pub const fn new(table: &'static str, key_columns: &'static [&'static str]) -> Self {
        PruneSpec { table, key_columns }
    }

    /// DELETE keeping the smallest rowid per logical key. rowid is the
    /// physical identity; MIN(rowid) is the earliest physical copy.
    fn delete_sql(&self) -> String {
        format!(
            "DELETE FROM {table} WHERE rowid NOT IN (
                SELECT MIN(rowid) FROM {table} GROUP BY {keys}
            )",
            table = self.table,
            keys = self.key_columns.join(", "),
        )
    }

    /// Physical rows minus distinct logical keys: how many rows a prune
    /// of this table would remove right now.
    fn duplicate_count_sql(&self) -> String {
        format!(
            "SELECT (SELECT COUNT(*) FROM {table}) -
                    (SELECT COUNT(*) FROM (SELECT 1 FROM {table} GROUP BY {keys}))",
            table = self.table,
            keys = self.key_columns.join(", "),
        )
    }
}

/// The five tables the upstream extract is known to duplicate.
pub const DEFAULT_PRUNE_SPECS: [PruneSpec; 5] = [
    PruneSpec::new("work", &["work_id"]),
    PruneSpec::new("product_size", &["work_id", "size_id"]),
    PruneSpec::new("subject", &["work_id", "subject"]),
    PruneSpec::new("image_link", &["work_id", "url"]),
    PruneSpec::new("museum_hours", &["museum_id", "day"]),
];

/// Removed-row count for one pruned table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TablePrune {
    pub table: String,
    pub removed: usize,
}

/// Store-level pruner over a fixed set of table specs.
pub struct Pruner {
    specs: Vec<PruneSpec>,
}

impl Pruner {
    /// Pruner covering the default keyed tables.
    pub fn new() -> Self {
        Pruner {
            specs: DEFAULT_PRUNE_SPECS.to_vec(),
        }
    }

    pub fn with_specs(specs: Vec<PruneSpec>) -> Self {
        Pruner { specs }
    }

    pub fn specs(&self) -> &[PruneSpec] {
        &self.specs
    }

    /// Prune one table; returns how many rows were deleted. Running it
    /// again immediately deletes zero rows.
    pub fn prune_table(&self, conn: &Connection, spec: &PruneSpec) -> Result<usize> {
        let removed = conn.execute(&spec.delete_sql(), [])?;
        Ok(removed)
    }

    /// Prune every configured table, in spec order.
    pub fn prune_all(&self, conn: &Connection) -> Result<Vec<TablePrune>> {
        let mut results = Vec::with_capacity(self.specs.len());

        for spec in &self.specs {
            let removed = self.prune_table(conn, spec)?;
            results.push(TablePrune {
                table: spec.table.to_string(),
                removed,
            });
        }

        Ok(results)
    }

    /// Duplicate rows currently present per table, without deleting.
    pub fn count_duplicates(&self, conn: &Connection) -> Result<Vec<TablePrune>> {
        let mut results = Vec::with_capacity(self.specs.len());

        for spec in &self.specs {
            let pending: i64 =
                conn.query_row(&spec.duplicate_count_sql(), [], |row| row.get(0))?;
            results.push(TablePrune {
                table: spec.table.to_string(),
                removed: pending as usize,
            });
        }

        Ok(results)
    }
}

impl Default for Pruner {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// TESTS
// ============================================================================
