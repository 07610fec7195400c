// Gallery Analytics - Core Library
// Exposes all modules for use in the CLI and tests

pub mod db;
pub mod dedup;
pub mod entities;
pub mod hours;
pub mod quality;
pub mod ranking;
pub mod reports;

// Re-export commonly used types
pub use db::{
    count_rows, get_import_log, import_dataset, load_records, setup_database,
    ImportBatch, ImportSummary, DATA_TABLES,
};
pub use dedup::{
    prune_rows, PruneOutcome, PruneSpec, Pruner, TablePrune, DEFAULT_PRUNE_SPECS,
};
pub use entities::{
    Artist, CanvasSize, ImageLink, Museum, MuseumHours, ProductSize, Subject, Work,
};
pub use hours::{normalize_day, open_minutes, parse_clock, DAY_NAMES};
pub use quality::{QualityEngine, QualityIssue, QualityReport, Severity};
pub use ranking::{
    position_count, rank_filter, Positions, RankMethod, RankOrder, Ranked,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
