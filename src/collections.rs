//! `trend collections`: the watch-list registry.

use anyhow::Result;

use trendlens_core::error::validate_weight;
use trendlens_core::models::CollectionInfo;
use trendlens_core::store::Store;
use trendlens_core::ValidationError;

use crate::config::Config;
use crate::db;

pub async fn run_list(config: &Config) -> Result<()> {
    let store = db::open_store(config).await?;
    let all = store.list_collections().await?;
    store.close().await;

    if all.is_empty() {
        println!("No collections registered.");
        return Ok(());
    }

    println!(
        "{:<26} {:<12} {:>12} {:>7} {:<12} {}",
        "COLLECTION", "STATE", "POPULARITY", "WEIGHT", "COLLECTED", "NAME"
    );
    for c in &all {
        let state = if c.blacklisted {
            "blacklisted"
        } else {
            c.state.as_str()
        };
        println!(
            "{:<26} {:<12} {:>12} {:>7} {:<12} {}",
            c.id,
            state,
            c.popularity
                .map(|p| p.to_string())
                .unwrap_or_else(|| "-".to_string()),
            c.weight
                .map(|w| format!("{:.2}", w))
                .unwrap_or_else(|| "-".to_string()),
            c.last_collected_on
                .map(|d| d.to_string())
                .unwrap_or_else(|| "never".to_string()),
            c.name
        );
    }
    Ok(())
}

pub async fn run_add(
    config: &Config,
    id: &str,
    name: Option<String>,
    popularity: Option<i64>,
    weight: Option<f64>,
) -> Result<()> {
    let id = id.trim();
    if id.is_empty() {
        return Err(ValidationError::EmptySelection.into());
    }
    let weight = weight.map(validate_weight).transpose()?;

    let store = db::open_store(config).await?;
    store
        .add_collection(&CollectionInfo {
            id: id.to_string(),
            name: name.unwrap_or_default(),
            popularity,
        })
        .await?;
    if weight.is_some() {
        store.set_collection_weight(id, weight).await?;
    }
    store.close().await;

    match weight {
        Some(w) => println!("added {} (weight {:.2})", id, w),
        None => println!("added {}", id),
    }
    Ok(())
}

pub async fn run_remove(config: &Config, id: &str) -> Result<()> {
    let store = db::open_store(config).await?;
    let removed = store.remove_collection(id).await?;
    store.close().await;

    if removed {
        println!("removed {}", id);
    } else {
        println!("unknown collection: {}", id);
    }
    Ok(())
}

/// `block` / `unblock`: exclude a collection from runs without touching its state.
pub async fn run_set_blacklisted(config: &Config, id: &str, blacklisted: bool) -> Result<()> {
    let store = db::open_store(config).await?;
    let found = store.set_blacklisted(id, blacklisted).await?;
    store.close().await;

    match (found, blacklisted) {
        (false, _) => println!("unknown collection: {}", id),
        (true, true) => println!("blocked {}", id),
        (true, false) => println!("unblocked {}", id),
    }
    Ok(())
}
