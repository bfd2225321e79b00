//! Vocabulary tables for the heuristic scorer.
//!
//! A [`Lexicon`] is plain data handed to
//! [`HeuristicScorer::new`](crate::scoring::heuristic::HeuristicScorer::new).
//! [`Lexicon::default`] is the built-in Korean senior-audience table set;
//! [`Lexicon::from_toml_str`] loads a replacement. Fields omitted from a TOML
//! file keep their built-in values.
//!
//! ```toml
//! entity_bonus = 3.0
//!
//! [[keywords]]
//! term = "건강"
//! weight = 3.0
//!
//! [genres.top]
//! label = "트로트"
//! terms = ["트로트"]
//! bonus = 5.0
//! ```

use std::collections::HashMap;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

/// A term and the points it contributes on a match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightedTerm {
    pub term: String,
    pub weight: f64,
}

impl WeightedTerm {
    pub fn new(term: impl Into<String>, weight: f64) -> Self {
        Self {
            term: term.into(),
            weight,
        }
    }
}

fn weighted(table: &[(&str, f64)]) -> Vec<WeightedTerm> {
    table
        .iter()
        .map(|(term, weight)| WeightedTerm::new(*term, *weight))
        .collect()
}

fn strings(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

/// One genre signal: fires once if any of `terms` appears in title + tags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenreSignal {
    /// Evidence label recorded when the signal fires.
    pub label: String,
    pub terms: Vec<String>,
    pub bonus: f64,
}

/// The three disjoint genre signals. All of them may fire on one item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenreRules {
    pub top: GenreSignal,
    pub cluster: GenreSignal,
    pub flagship: GenreSignal,
}

impl GenreRules {
    pub fn signals(&self) -> [&GenreSignal; 3] {
        [&self.top, &self.cluster, &self.flagship]
    }
}

impl Default for GenreRules {
    fn default() -> Self {
        Self {
            top: GenreSignal {
                label: "트로트".into(),
                terms: strings(&["트로트"]),
                bonus: 5.0,
            },
            cluster: GenreSignal {
                label: "교양/전통".into(),
                terms: strings(&["국악", "전통", "교양", "다큐", "시사"]),
                bonus: 2.0,
            },
            flagship: GenreSignal {
                label: "가요무대".into(),
                terms: strings(&["가요무대"]),
                bonus: 5.0,
            },
        }
    }
}

/// Step function over collection popularity favoring small sources.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PopularityTiers {
    /// Popularity strictly below this is "small".
    pub small_below: i64,
    /// Popularity strictly below this (and not small) is "medium".
    pub medium_below: i64,
    pub small: f64,
    pub medium: f64,
    pub large: f64,
}

impl PopularityTiers {
    pub fn score(&self, popularity: i64) -> f64 {
        if popularity < self.small_below {
            self.small
        } else if popularity < self.medium_below {
            self.medium
        } else {
            self.large
        }
    }
}

impl Default for PopularityTiers {
    fn default() -> Self {
        Self {
            small_below: 10_000,
            medium_below: 100_000,
            small: 1.2,
            medium: 1.0,
            large: 0.8,
        }
    }
}

/// Complete vocabulary for [`HeuristicScorer`](crate::scoring::heuristic::HeuristicScorer).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Lexicon {
    /// Ordered keyword table. Order fixes evidence order.
    pub keywords: Vec<WeightedTerm>,
    pub entities: Vec<String>,
    pub entity_bonus: f64,
    /// Evidence prefix for entity hits (`<prefix>:<name>`).
    pub entity_label: String,
    pub genres: GenreRules,
    pub comment_indicators: Vec<WeightedTerm>,
    pub comment_damping: f64,
    pub comment_scan_limit: usize,
    pub slang: Vec<String>,
    pub slang_penalty: f64,
    /// Explicitly weighted collections; a hit returns `weight * bypass_multiplier`.
    pub collection_bypass: HashMap<String, f64>,
    pub bypass_multiplier: f64,
    pub tiers: PopularityTiers,
}

impl Default for Lexicon {
    fn default() -> Self {
        Self {
            keywords: weighted(&[
                // health
                ("건강", 3.0),
                ("관절", 2.5),
                ("무릎", 2.5),
                ("혈당", 2.5),
                ("혈압", 2.5),
                ("당뇨", 2.0),
                ("고혈압", 2.0),
                ("치매", 2.0),
                ("치아", 1.5),
                ("운동", 1.5),
                ("스트레칭", 1.5),
                ("요가", 1.0),
                // welfare and retirement
                ("연금", 3.0),
                ("노후", 3.0),
                ("실버", 3.0),
                ("시니어", 3.0),
                ("은퇴", 2.5),
                ("복지", 2.0),
                ("국민연금", 3.0),
                ("기초연금", 3.0),
                // music
                ("트로트", 3.0),
                ("가요무대", 3.0),
                ("국악", 2.5),
                ("옛노래", 2.5),
                ("가곡", 2.0),
                ("민요", 2.5),
                ("7080", 2.5),
                ("8090", 2.0),
                // lifestyle
                ("텃밭", 2.5),
                ("전원", 2.0),
                ("귀농", 2.5),
                ("등산", 2.0),
                ("산책", 1.5),
                ("낚시", 1.5),
                ("전통", 2.0),
                ("한식", 1.5),
                ("된장", 1.5),
                ("김장", 2.0),
                // family
                ("손주", 3.0),
                ("손자", 2.5),
                ("손녀", 2.5),
                ("할머니", 2.0),
                ("할아버지", 2.0),
                ("부모님", 1.5),
                ("효도", 2.0),
                // documentary and culture
                ("다큐", 1.5),
                ("시사", 1.5),
                ("교양", 1.5),
                ("역사", 1.5),
                ("문화재", 1.5),
                ("전통시장", 1.5),
            ]),
            entities: strings(&[
                "임영웅", "영탁", "이찬원", "장민호", "김호중", "송가인", "홍진영", "진성",
                "태진아", "주현미", "설운도", "남진", "나훈아", "현숙", "박상철",
            ]),
            entity_bonus: 3.0,
            entity_label: "트로트".into(),
            genres: GenreRules::default(),
            comment_indicators: weighted(&[
                ("어머니", 2.0),
                ("아버지", 2.0),
                ("부모님", 1.5),
                ("엄마", 1.5),
                ("아빠", 1.5),
                ("손주", 3.0),
                ("무릎", 2.0),
                ("관절", 2.0),
                ("연세", 2.0),
                ("~하십니다", 1.5),
                ("~하세요", 1.5),
            ]),
            comment_damping: 0.1,
            comment_scan_limit: 50,
            slang: strings(&[
                "ㅋㅋ", "ㄹㅇ", "ㅇㅈ", "ㅇㅋ", "실화냐", "개꿀", "레전드", "띵곡", "갓", "킹",
                "혜자", "핵", "찢었다", "미쳤다",
            ]),
            slang_penalty: 0.5,
            collection_bypass: HashMap::new(),
            bypass_multiplier: 5.0,
            tiers: PopularityTiers::default(),
        }
    }
}

impl Lexicon {
    /// An empty vocabulary with the default numeric parameters. Useful as a
    /// base for test doubles.
    pub fn empty() -> Self {
        Self {
            keywords: Vec::new(),
            entities: Vec::new(),
            genres: GenreRules {
                top: GenreSignal {
                    terms: Vec::new(),
                    ..GenreRules::default().top
                },
                cluster: GenreSignal {
                    terms: Vec::new(),
                    ..GenreRules::default().cluster
                },
                flagship: GenreSignal {
                    terms: Vec::new(),
                    ..GenreRules::default().flagship
                },
            },
            comment_indicators: Vec::new(),
            slang: Vec::new(),
            ..Self::default()
        }
    }

    /// Parse a lexicon file. Missing tables fall back to the built-in ones.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let lexicon: Lexicon = toml::from_str(content).context("Failed to parse lexicon")?;
        lexicon.validate()?;
        Ok(lexicon)
    }

    fn validate(&self) -> Result<()> {
        let weights = self
            .keywords
            .iter()
            .chain(self.comment_indicators.iter())
            .map(|t| t.weight);
        let scalars = [
            self.entity_bonus,
            self.comment_damping,
            self.slang_penalty,
            self.bypass_multiplier,
            self.genres.top.bonus,
            self.genres.cluster.bonus,
            self.genres.flagship.bonus,
            self.tiers.small,
            self.tiers.medium,
            self.tiers.large,
        ];
        if weights.chain(scalars).any(|w| !w.is_finite()) {
            bail!("lexicon weights must be finite numbers");
        }
        if let Some(t) = self.keywords.iter().find(|t| t.term.is_empty()) {
            bail!("lexicon keyword with weight {} has an empty term", t.weight);
        }
        if self.tiers.small_below > self.tiers.medium_below {
            bail!(
                "tiers.small_below ({}) must not exceed tiers.medium_below ({})",
                self.tiers.small_below,
                self.tiers.medium_below
            );
        }
        Ok(())
    }
}
