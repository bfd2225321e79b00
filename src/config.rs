//! TOML configuration.
//!
//! Only `[db]` is required; every other table has defaults. Validation runs
//! in [`load_config`] so commands can assume a well-formed [`Config`].

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use trendlens_core::collect::MAX_RESULTS_LIMIT;
use trendlens_core::lexicon::Lexicon;
use trendlens_core::scoring::CompositeWeights;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub collect: CollectConfig,
    #[serde(default)]
    pub scoring: ScoringConfig,
    #[serde(default)]
    pub ranking: RankingConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CatalogConfig {
    /// Root of the JSONL catalog directory.
    #[serde(default = "default_catalog_root")]
    pub root: PathBuf,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            root: default_catalog_root(),
        }
    }
}

fn default_catalog_root() -> PathBuf {
    PathBuf::from("./catalog")
}

#[derive(Debug, Deserialize, Clone)]
pub struct CollectConfig {
    #[serde(default = "default_max_results")]
    pub max_results: usize,
    #[serde(default = "default_recent_days")]
    pub recent_days: u32,
    #[serde(default)]
    pub fetch_comments: bool,
    #[serde(default)]
    pub archive_dir: Option<PathBuf>,
}

impl Default for CollectConfig {
    fn default() -> Self {
        Self {
            max_results: default_max_results(),
            recent_days: default_recent_days(),
            fetch_comments: false,
            archive_dir: None,
        }
    }
}

fn default_max_results() -> usize {
    MAX_RESULTS_LIMIT
}
fn default_recent_days() -> u32 {
    7
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct ScoringConfig {
    /// Replacement lexicon file. Built-in tables are used when absent.
    #[serde(default)]
    pub lexicon: Option<PathBuf>,
    #[serde(default)]
    pub weights: CompositeWeights,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RankingConfig {
    #[serde(default)]
    pub threshold: f64,
    #[serde(default)]
    pub min_delta: i64,
    #[serde(default = "default_rank_limit")]
    pub limit: usize,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            threshold: 0.0,
            min_delta: 0,
            limit: default_rank_limit(),
        }
    }
}

fn default_rank_limit() -> usize {
    100
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl ScoringConfig {
    /// The configured lexicon, or the built-in one.
    pub fn load_lexicon(&self) -> Result<Lexicon> {
        match &self.lexicon {
            Some(path) => {
                let content = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read lexicon file: {}", path.display()))?;
                Lexicon::from_toml_str(&content)
                    .with_context(|| format!("Invalid lexicon file: {}", path.display()))
            }
            None => Ok(Lexicon::default()),
        }
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    if !(1..=MAX_RESULTS_LIMIT).contains(&config.collect.max_results) {
        bail!("collect.max_results must be between 1 and {}", MAX_RESULTS_LIMIT);
    }

    let w = &config.scoring.weights;
    for (name, value) in [
        ("view", w.view),
        ("popularity", w.popularity),
        ("recency", w.recency),
        ("engagement", w.engagement),
    ] {
        if !value.is_finite() || value < 0.0 {
            bail!("scoring.weights.{} must be a finite number >= 0", name);
        }
    }

    if config.ranking.limit < 1 {
        bail!("ranking.limit must be >= 1");
    }
    if !config.ranking.threshold.is_finite() {
        bail!("ranking.threshold must be a finite number");
    }

    if config.scoring.lexicon.is_some() {
        config.scoring.load_lexicon()?;
    }

    Ok(config)
}
