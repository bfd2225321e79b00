//! `trend label` and `trend unlabeled`.

use anyhow::{bail, Result};

use trendlens_core::models::NewLabel;
use trendlens_core::store::Store;
use trendlens_core::ValidationError;

use crate::config::Config;
use crate::db;

pub async fn run_label(
    config: &Config,
    item_id: &str,
    is_target: bool,
    labeled_by: &str,
    notes: &str,
) -> Result<()> {
    let item_id = item_id.trim();
    if item_id.is_empty() {
        return Err(ValidationError::EmptyItemId.into());
    }

    let store = db::open_store(config).await?;
    if store.get_item(item_id).await?.is_none() {
        store.close().await;
        bail!("item not found: {}", item_id);
    }

    let id = store
        .insert_label(&NewLabel {
            item_id: item_id.to_string(),
            is_target,
            labeled_by: labeled_by.to_string(),
            notes: notes.to_string(),
        })
        .await?;
    let total = store.labels_for(item_id).await?.len();
    store.close().await;

    println!(
        "labeled {} as {} (label #{}, {} total)",
        item_id,
        if is_target { "yes" } else { "no" },
        id,
        total
    );
    Ok(())
}

pub async fn run_unlabeled(config: &Config, limit: usize) -> Result<()> {
    if limit == 0 {
        return Err(ValidationError::ZeroLimit.into());
    }

    let store = db::open_store(config).await?;
    let pending = store.unlabeled_items(limit).await?;
    store.close().await;

    if pending.is_empty() {
        println!("No unlabeled items.");
        return Ok(());
    }

    println!("{:<14} {:>7}  {}", "ITEM", "BEST", "TITLE");
    for u in &pending {
        println!("{:<14} {:>7.2}  {}", u.item.id, u.best_score, u.item.title);
    }
    Ok(())
}
