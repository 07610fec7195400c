use anyhow::{Context, Result};
use rusqlite::Connection;
use std::env;
use std::path::Path;
use std::process;

use gallery_analytics::{import_dataset, setup_database, QualityEngine, Pruner, Severity};
use gallery_analytics::reports;

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();

    match args.get(1).map(String::as_str) {
        Some("import") if args.len() == 4 => run_import(Path::new(&args[2]), Path::new(&args[3])),
        Some("prune") if args.len() == 3 => run_prune(Path::new(&args[2])),
        Some("report") if args.len() == 4 => run_report(&args[2], Path::new(&args[3])),
        Some("quality") if args.len() == 3 => run_quality(Path::new(&args[2])),
        _ => {
            print_usage();
            process::exit(1);
        }
    }
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  gallery-analytics import <data-dir> <db>   Ingest the eight CSVs");
    eprintln!("  gallery-analytics prune <db>               Remove duplicate rows");
    eprintln!("  gallery-analytics report <name> <db>       Run one named report");
    eprintln!("  gallery-analytics quality <db>             Audit the store");
    eprintln!();
    eprintln!("Reports:");
    for (name, description) in REPORTS {
        eprintln!("  {:24} {}", name, description);
    }
}

fn open_store(db_path: &Path) -> Result<Connection> {
    if !db_path.exists() {
        eprintln!("❌ Database not found: {}", db_path.display());
        eprintln!("   Run: gallery-analytics import <data-dir> {}", db_path.display());
        process::exit(1);
    }

    let conn = Connection::open(db_path)
        .with_context(|| format!("Failed to open database {}", db_path.display()))?;
    Ok(conn)
}

fn run_import(data_dir: &Path, db_path: &Path) -> Result<()> {
    println!("🗄️  Import - CSV → SQLite + WAL");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    println!("\n🔧 Setting up database...");
    let conn = Connection::open(db_path)
        .with_context(|| format!("Failed to open database {}", db_path.display()))?;
    setup_database(&conn)?;
    println!("✓ Database initialized with WAL mode");

    println!("\n📂 Ingesting {} ...", data_dir.display());
    let summary = import_dataset(&conn, data_dir)?;
    for (file, rows) in &summary.files {
        println!("✓ {:20} {:>6} rows", file, rows);
    }

    println!("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("✅ Imported {} rows in batch {}", summary.total_rows(), summary.batch_id);

    Ok(())
}

fn run_prune(db_path: &Path) -> Result<()> {
    let conn = open_store(db_path)?;

    println!("🧹 Prune - one physical row per logical key");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let pruner = Pruner::new();
    let mut total = 0;
    for result in pruner.prune_all(&conn)? {
        println!("✓ {:16} removed {:>6} duplicate rows", result.table, result.removed);
        total += result.removed;
    }

    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    if total == 0 {
        println!("✅ Nothing to do - store already pruned");
    } else {
        println!("✅ Removed {} duplicate rows", total);
    }

    Ok(())
}

fn run_quality(db_path: &Path) -> Result<()> {
    let conn = open_store(db_path)?;

    println!("✅ Quality audit");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let report = QualityEngine::new().audit(&conn)?;

    for severity in [Severity::Critical, Severity::Warning, Severity::Info] {
        for issue in report.issues.iter().filter(|i| i.severity == severity) {
            println!("[{:8}] {:14} {}", severity.as_str(), issue.table, issue.detail);
        }
    }

    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("{}", report.summary());

    if report.has_critical_issues() {
        process::exit(2);
    }

    Ok(())
}

const REPORTS: [(&str, &str); 18] = [
    ("not-on-display", "Works not hanging in any museum"),
    ("empty-museums", "Museums with no works"),
    ("discounted", "Price points below half the regular price"),
    ("priciest-canvas", "Canvas size with the highest sale price"),
    ("top-subjects", "10 most-painted subjects"),
    ("open-sunday-monday", "Museums open on both Sunday and Monday"),
    ("open-every-day", "Museums open all seven days"),
    ("top-museums", "5 most popular museums by works"),
    ("top-artists", "5 most popular artists by works"),
    ("least-popular-canvas", "3 least used canvas sizes"),
    ("longest-open", "Museum open the longest on a single day"),
    ("styles", "3 most and 3 least popular styles"),
    ("top-style-museum", "Museum with the most works of the top style"),
    ("traveling-artists", "Artists displayed in several countries"),
    ("top-locations", "Country and city with the most museums"),
    ("price-extremes", "Most and least expensive price points"),
    ("country-rank-5", "Country with the 5th-highest work count"),
    ("portraits-abroad", "Top portrait artists outside the USA"),
];

fn run_report(name: &str, db_path: &Path) -> Result<()> {
    let conn = open_store(db_path)?;

    match name {
        "not-on-display" => {
            for row in reports::works_not_on_display(&conn)? {
                println!(
                    "{:>6}  {:40} {}",
                    row.work_id,
                    row.name,
                    row.artist.unwrap_or_default()
                );
            }
        }
        "empty-museums" => {
            for row in reports::museums_without_works(&conn)? {
                println!("{:>4}  {:40} {}, {}", row.museum_id, row.name,
                    row.city.unwrap_or_default(), row.country);
            }
        }
        "discounted" => {
            for row in reports::discounted_works(&conn)? {
                println!(
                    "{:>6}/{:<5} {:40} sale {:>8.2}  regular {:>8.2}",
                    row.work_id, row.size_id, row.name, row.sale_price, row.regular_price
                );
            }
        }
        "priciest-canvas" => {
            for row in reports::priciest_canvas_size(&conn)? {
                println!("{:16} {:>8.2}", row.label, row.sale_price);
            }
        }
        "top-subjects" => {
            for row in reports::top_subjects(&conn, 10)? {
                println!("{:>2}. {:30} {:>6} works", row.position, row.subject, row.works);
            }
        }
        "open-sunday-monday" => {
            for row in reports::museums_open_on(&conn, &["Sunday", "Monday"])? {
                println!("{:>4}  {:40} {}", row.museum_id, row.name, row.country);
            }
        }
        "open-every-day" => {
            for row in reports::museums_open_every_day(&conn)? {
                println!("{:>4}  {:40} {}", row.museum_id, row.name, row.country);
            }
        }
        "top-museums" => {
            for row in reports::most_popular_museums(&conn, 5)? {
                println!("{:>2}. {:40} {:>6} works", row.position, row.name, row.works);
            }
        }
        "top-artists" => {
            for row in reports::most_popular_artists(&conn, 5)? {
                println!("{:>2}. {:30} {:12} {:>6} works",
                    row.position, row.name, row.nationality, row.works);
            }
        }
        "least-popular-canvas" => {
            for row in reports::least_popular_canvas_sizes(&conn, 3)? {
                println!("{:>2}. {:16} {:>6} works", row.position, row.label, row.works);
            }
        }
        "longest-open" => {
            if let Some(top) = reports::longest_open_museum(&conn)? {
                println!(
                    "{} is open longest on {}: {}–{} ({} h {:02} min)",
                    top.museum, top.day, top.open, top.close,
                    top.minutes / 60, top.minutes % 60
                );
            }
        }
        "styles" => {
            for row in reports::style_popularity(&conn, 3, 3)? {
                let tier = match row.tier {
                    reports::PopularityTier::Popular => "popular",
                    reports::PopularityTier::Unpopular => "unpopular",
                };
                println!("{:>2}. {:24} {:>6} works  ({})", row.position, row.style, row.works, tier);
            }
        }
        "top-style-museum" => {
            if let Some(top) = reports::museum_with_most_of_top_style(&conn)? {
                println!("{} holds {} {} works", top.museum, top.works, top.style);
            }
        }
        "traveling-artists" => {
            for row in reports::artists_exhibited_in_multiple_countries(&conn, 2)? {
                println!("{:30} {:>3} countries", row.name, row.countries);
            }
        }
        "top-locations" => {
            let top = reports::top_museum_locations(&conn)?;
            for row in top.countries {
                println!("country  {:24} {:>4} museums", row.place, row.museums);
            }
            for row in top.cities {
                println!("city     {:24} {:>4} museums", row.place, row.museums);
            }
        }
        "price-extremes" => {
            let extremes = reports::price_extremes(&conn)?;
            for row in extremes.most_expensive {
                println!("most   {:>8.2}  {:36} {:24} {}",
                    row.sale_price, row.work,
                    row.artist.unwrap_or_default(),
                    row.canvas.unwrap_or_default());
            }
            for row in extremes.least_expensive {
                println!("least  {:>8.2}  {:36} {:24} {}",
                    row.sale_price, row.work,
                    row.artist.unwrap_or_default(),
                    row.canvas.unwrap_or_default());
            }
        }
        "country-rank-5" => {
            if let Some(row) = reports::country_by_work_count_at_rank(&conn, 5)? {
                println!("{:24} {:>6} works (rank {})", row.country, row.works, row.position);
            }
        }
        "portraits-abroad" => {
            for row in reports::top_subject_artists_outside(&conn, "Portraits", "USA", 1)? {
                println!("{:30} {:12} {:>6} works", row.name, row.nationality, row.works);
            }
        }
        _ => {
            eprintln!("❌ Unknown report: {}", name);
            print_usage();
            process::exit(1);
        }
    }

    Ok(())
}
