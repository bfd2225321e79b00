//! `trend show <ITEM_ID>`: one item with its latest scores, delta and labels.

use anyhow::{bail, Result};

use trendlens_core::detail::item_detail;

use crate::config::Config;
use crate::db;

pub async fn run_show(config: &Config, item_id: &str, json: bool) -> Result<()> {
    let store = db::open_store(config).await?;
    let detail = item_detail(&store, item_id).await?;
    store.close().await;

    let Some(detail) = detail else {
        bail!("item not found: {}", item_id);
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&detail)?);
        return Ok(());
    }

    let item = &detail.item;
    println!("--- Item ---");
    println!("id:           {}", item.id);
    println!("title:        {}", item.title);
    println!("collection:   {} ({})", item.collection_name, item.collection_id);
    println!("category:     {}", item.category);
    println!("published_at: {}", item.published_at);
    println!("duration:     {}", item.duration);
    if !item.tags.is_empty() {
        println!("tags:         {}", item.tags.join(", "));
    }
    println!();

    match &detail.latest {
        Some(latest) => {
            let s = &latest.snapshot;
            println!("--- Latest snapshot ({}, {}) ---", s.observed_on, s.partition);
            println!(
                "views: {}  likes: {}  comments: {}  rank: {}",
                s.counters.views, s.counters.likes, s.counters.comments, s.counters.rank_position
            );
            if detail.has_history {
                println!("delta 14d: {:+}", detail.delta);
            } else {
                println!("delta 14d: n/a (insufficient history)");
            }
            if let Some(h) = &latest.heuristic {
                println!();
                println!("heuristic:  {:.2}", h.total);
                println!(
                    "  keyword {:.2}  genre {:.2}  comment {:.2}  collection {:.2}  length {:.2}  penalty {:.2}",
                    h.keyword, h.genre, h.comment, h.collection, h.length, h.penalty
                );
                println!("  keywords: {}", h.evidence.keywords.join(", "));
                println!("  genres:   {}", h.evidence.genres.join(", "));
                println!("  length:   {}", h.evidence.length_category.as_str());
                if !h.evidence.slang.is_empty() {
                    println!("  slang:    {}", h.evidence.slang.join(", "));
                }
            }
            if let Some(c) = &latest.composite {
                println!();
                println!("composite:  {:.2}", c.total);
                println!(
                    "  view {:.2}  popularity {:.2}  recency {:.2}  engagement {:.2}",
                    c.view, c.popularity, c.recency, c.engagement
                );
            }
        }
        None => println!("no snapshots"),
    }
    println!();

    println!("--- Labels ({}) ---", detail.labels.len());
    for label in &detail.labels {
        println!(
            "[{}] {} by {}{}",
            label.labeled_at.format("%Y-%m-%d %H:%M"),
            if label.is_target { "yes" } else { "no" },
            label.labeled_by,
            if label.notes.is_empty() {
                String::new()
            } else {
                format!(": {}", label.notes)
            }
        );
    }
    Ok(())
}
