//! Index statistics.
//!
//! Summarises the configured collection: which embedding model it is bound
//! to, how many documents it holds, and when it was last rebuilt. Used by
//! `carbench stats` to confirm an ingest worked before serving queries.

use anyhow::{Context, Result};

use crate::config::Config;
use crate::sqlite_store::SqliteStore;
use crate::store::{CollectionInfo, VectorIndex};

/// Run the stats command: describe the collection and print a summary.
pub async fn run_stats(config: &Config) -> Result<()> {
    let store = SqliteStore::open(&config.index.path).await?;
    let info = store
        .describe(&config.index.collection)
        .await
        .with_context(|| {
            format!(
                "failed to describe collection '{}'; run `carbench ingest` first",
                config.index.collection
            )
        })?;
    store.close().await;

    let db_size = std::fs::metadata(&config.index.path)
        .map(|m| m.len())
        .unwrap_or(0);

    print!("{}", render_stats(config, &info, db_size));
    Ok(())
}

fn render_stats(config: &Config, info: &CollectionInfo, db_size: u64) -> String {
    let mut out = String::new();
    out.push_str("Car Benchmarking: Index Stats\n");
    out.push_str("==============================\n\n");
    out.push_str(&format!("  Index:       {}\n", config.index.path.display()));
    out.push_str(&format!("  Size:        {}\n\n", format_bytes(db_size)));
    out.push_str(&format!("  Collection:  {}\n", info.name));
    out.push_str(&format!("  Model:       {} ({} dims)\n", info.model, info.dims));
    out.push_str(&format!("  Documents:   {}\n", info.count));
    out.push_str(&format!(
        "  Rebuilt:     {}\n",
        format_ts_relative(info.created_at.timestamp())
    ));
    out
}

/// Format a byte count as a human-readable string.
fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.2} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}

/// Format a Unix timestamp as a relative time string (e.g. "3 hours ago").
fn format_ts_relative(ts: i64) -> String {
    let delta = chrono::Utc::now().timestamp() - ts;

    if delta < 0 {
        return format_ts_iso(ts);
    }

    if delta < 60 {
        "just now".to_string()
    } else if delta < 3600 {
        let mins = delta / 60;
        format!("{} min{} ago", mins, if mins == 1 { "" } else { "s" })
    } else if delta < 86400 {
        let hours = delta / 3600;
        format!("{} hour{} ago", hours, if hours == 1 { "" } else { "s" })
    } else if delta < 86400 * 30 {
        let days = delta / 86400;
        format!("{} day{} ago", days, if days == 1 { "" } else { "s" })
    } else {
        format_ts_iso(ts)
    }
}

fn format_ts_iso(ts: i64) -> String {
    chrono::DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| ts.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KB");
        assert_eq!(format_bytes(5 * 1024 * 1024), "5.0 MB");
    }

    #[test]
    fn test_relative_timestamps() {
        let now = chrono::Utc::now().timestamp();
        assert_eq!(format_ts_relative(now), "just now");
        assert_eq!(format_ts_relative(now - 120), "2 mins ago");
        assert_eq!(format_ts_relative(now - 3600), "1 hour ago");
        assert_eq!(format_ts_relative(0), "1970-01-01 00:00");
    }

    #[test]
    fn test_render_stats() {
        let config = Config::default();
        let info = CollectionInfo {
            name: "cars".into(),
            model: "hash-v1".into(),
            dims: 384,
            count: 11_914,
            created_at: chrono::Utc::now(),
        };
        let out = render_stats(&config, &info, 2048);
        assert!(out.contains("Collection:  cars"));
        assert!(out.contains("Model:       hash-v1 (384 dims)"));
        assert!(out.contains("Documents:   11914"));
        assert!(out.contains("Rebuilt:     just now"));
    }
}
