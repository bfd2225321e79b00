//! `trend stats`: row counts and the newest observation date.

use anyhow::Result;

use trendlens_core::store::Store;

use crate::config::Config;
use crate::db;

pub async fn run_stats(config: &Config) -> Result<()> {
    let store = db::open_store(config).await?;
    let stats = store.stats().await?;
    let collections = store.list_collections().await?;
    let active = store.active_collections().await?.len();

    let db_size = std::fs::metadata(&config.db.path)
        .map(|m| m.len())
        .unwrap_or(0);

    println!("trendlens database stats");
    println!();
    println!("  Database:     {}", config.db.path.display());
    println!("  Size:         {}", format_bytes(db_size));
    println!();
    println!("  Items:        {}", stats.items);
    println!("  Snapshots:    {}", stats.snapshots);
    println!("  Labels:       {}", stats.labels);
    println!("  Collections:  {} ({} active)", collections.len(), active);
    println!(
        "  Latest date:  {}",
        stats
            .latest_date
            .map(|d| d.to_string())
            .unwrap_or_else(|| "never".to_string())
    );

    store.close().await;
    Ok(())
}

fn format_bytes(bytes: u64) -> String {
    const KB: f64 = 1024.0;
    let b = bytes as f64;
    if b < KB {
        format!("{} B", bytes)
    } else if b < KB * KB {
        format!("{:.1} KB", b / KB)
    } else {
        format!("{:.1} MB", b / (KB * KB))
    }
}
