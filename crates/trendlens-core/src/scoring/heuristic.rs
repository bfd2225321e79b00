//! Heuristic lexicon scorer.
//!
//! # Scoring
//!
//! ```text
//! total = keyword × 1.0 + genre × 1.5 + comment × 0.5
//!       + collection × 1.0 + length × 0.8 + penalty
//! ```
//!
//! `penalty` is already negative and is added unweighted. Every field of
//! [`HeuristicScore`] is rounded to two decimals; the sum is taken at full
//! precision first.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::duration;
use crate::lexicon::{Lexicon, WeightedTerm};
use crate::models::{Collection, Comment, Item};
use crate::normalize::round2;

const KEYWORD_WEIGHT: f64 = 1.0;
const GENRE_WEIGHT: f64 = 1.5;
const COMMENT_WEIGHT: f64 = 0.5;
const COLLECTION_WEIGHT: f64 = 1.0;
const LENGTH_WEIGHT: f64 = 0.8;

/// Description matches count at this fraction of a title match.
const DESCRIPTION_FACTOR: f64 = 0.5;

/// Duration bucket used by the length sub-score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LengthBucket {
    /// Under one minute.
    ShortForm,
    Brief,
    Ideal,
    Medium,
    Long,
    Unknown,
}

impl LengthBucket {
    pub fn from_minutes(minutes: f64) -> Self {
        if minutes < 1.0 {
            Self::ShortForm
        } else if minutes < 3.0 {
            Self::Brief
        } else if minutes <= 30.0 {
            Self::Ideal
        } else if minutes <= 60.0 {
            Self::Medium
        } else {
            Self::Long
        }
    }

    pub fn score(&self) -> f64 {
        match self {
            Self::ShortForm => -2.0,
            Self::Brief => 0.0,
            Self::Ideal => 2.0,
            Self::Medium => 1.0,
            Self::Long => 0.5,
            Self::Unknown => 0.0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ShortForm => "short_form",
            Self::Brief => "brief",
            Self::Ideal => "ideal",
            Self::Medium => "medium",
            Self::Long => "long",
            Self::Unknown => "unknown",
        }
    }
}

/// What the scorer matched, for display and audit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evidence {
    pub keywords: Vec<String>,
    pub genres: Vec<String>,
    pub comment_indicators: Vec<String>,
    pub length_category: LengthBucket,
    pub slang: Vec<String>,
}

/// Output of [`HeuristicScorer::score`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeuristicScore {
    pub total: f64,
    pub keyword: f64,
    pub genre: f64,
    pub comment: f64,
    pub collection: f64,
    pub length: f64,
    /// Zero or negative.
    pub penalty: f64,
    pub evidence: Evidence,
}

fn push_unique(list: &mut Vec<String>, value: String) {
    if !list.contains(&value) {
        list.push(value);
    }
}

/// Rule-based scorer over an injected [`Lexicon`].
#[derive(Debug, Clone, Default)]
pub struct HeuristicScorer {
    lexicon: Lexicon,
}

impl HeuristicScorer {
    pub fn new(lexicon: Lexicon) -> Self {
        Self { lexicon }
    }

    pub fn lexicon(&self) -> &Lexicon {
        &self.lexicon
    }

    /// Score an item.
    ///
    /// `comments` is optional; `None` or an empty slice gives a comment
    /// sub-score of `0`. `collection` supplies the popularity used for the
    /// tier step; an unknown collection counts as popularity `0`.
    pub fn score(
        &self,
        item: &Item,
        comments: Option<&[Comment]>,
        collection: Option<&Collection>,
    ) -> HeuristicScore {
        let mut keywords = Vec::new();
        let title_score = self.keyword_score(&item.title, &mut keywords);
        let description_score = self.keyword_score(&item.description, &mut keywords);
        let keyword = title_score + description_score * DESCRIPTION_FACTOR;

        let (genre, genres) = self.genre_score(&item.title, &item.tags);
        let (comment, comment_indicators) = match comments {
            Some(c) if !c.is_empty() => self.comment_score(c),
            _ => (0.0, Vec::new()),
        };
        let collection_score = self.collection_score(&item.collection_id, collection);
        let length_category = self.length_bucket(item);
        let length = length_category.score();
        let (penalty, slang) = self.slang_penalty(&item.title, &item.description);

        let total = keyword * KEYWORD_WEIGHT
            + genre * GENRE_WEIGHT
            + comment * COMMENT_WEIGHT
            + collection_score * COLLECTION_WEIGHT
            + length * LENGTH_WEIGHT
            + penalty;

        HeuristicScore {
            total: round2(total),
            keyword: round2(keyword),
            genre: round2(genre),
            comment: round2(comment),
            collection: round2(collection_score),
            length: round2(length),
            penalty: round2(penalty),
            evidence: Evidence {
                keywords,
                genres,
                comment_indicators,
                length_category,
                slang,
            },
        }
    }

    /// Keyword and entity points for one text field. Matches are appended to
    /// `evidence` in table order, skipping ones already recorded.
    fn keyword_score(&self, text: &str, evidence: &mut Vec<String>) -> f64 {
        if text.is_empty() {
            return 0.0;
        }
        let text = text.to_lowercase();
        let mut score = 0.0;

        for WeightedTerm { term, weight } in &self.lexicon.keywords {
            if text.contains(&term.to_lowercase()) {
                score += weight;
                push_unique(evidence, term.clone());
            }
        }
        for entity in &self.lexicon.entities {
            if text.contains(&entity.to_lowercase()) {
                score += self.lexicon.entity_bonus;
                push_unique(evidence, format!("{}:{}", self.lexicon.entity_label, entity));
            }
        }
        score
    }

    fn genre_score(&self, title: &str, tags: &[String]) -> (f64, Vec<String>) {
        let combined = format!("{} {}", title, tags.join(" ")).to_lowercase();
        let mut score = 0.0;
        let mut labels = Vec::new();

        for signal in self.lexicon.genres.signals() {
            if signal
                .terms
                .iter()
                .any(|t| combined.contains(&t.to_lowercase()))
            {
                score += signal.bonus;
                labels.push(signal.label.clone());
            }
        }
        (score, labels)
    }

    /// Every (comment, indicator) hit adds `weight × damping`; evidence lists
    /// each indicator once.
    fn comment_score(&self, comments: &[Comment]) -> (f64, Vec<String>) {
        let mut score = 0.0;
        let mut indicators = Vec::new();

        for comment in comments.iter().take(self.lexicon.comment_scan_limit) {
            let text = comment.text.to_lowercase();
            for WeightedTerm { term, weight } in &self.lexicon.comment_indicators {
                if text.contains(&term.to_lowercase()) {
                    score += weight * self.lexicon.comment_damping;
                    push_unique(&mut indicators, term.clone());
                }
            }
        }
        (score, indicators)
    }

    /// Stored weight first, then the lexicon bypass table, then popularity tiers.
    fn collection_score(&self, collection_id: &str, collection: Option<&Collection>) -> f64 {
        let weight = collection
            .and_then(|c| c.weight)
            .or_else(|| self.lexicon.collection_bypass.get(collection_id).copied());
        if let Some(weight) = weight {
            return weight * self.lexicon.bypass_multiplier;
        }
        let popularity = collection.and_then(|c| c.popularity).unwrap_or(0);
        self.lexicon.tiers.score(popularity)
    }

    fn length_bucket(&self, item: &Item) -> LengthBucket {
        match duration::parse_minutes(&item.duration) {
            Some(minutes) => LengthBucket::from_minutes(minutes),
            None => {
                warn!(
                    item_id = %item.id,
                    duration = %item.duration,
                    "unparsable duration, length sub-score set to 0"
                );
                LengthBucket::Unknown
            }
        }
    }

    /// Raw occurrence count per slang term; repeats are not deduplicated.
    fn slang_penalty(&self, title: &str, description: &str) -> (f64, Vec<String>) {
        let combined = format!("{} {}", title, description).to_lowercase();
        let mut penalty = 0.0;
        let mut matched = Vec::new();

        for term in &self.lexicon.slang {
            let needle = term.to_lowercase();
            if needle.is_empty() {
                continue;
            }
            let count = combined.matches(needle.as_str()).count();
            if count > 0 {
                penalty -= count as f64 * self.lexicon.slang_penalty;
                matched.push(term.clone());
            }
        }
        (penalty, matched)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexicon::WeightedTerm;
    use crate::models::CollectionState;

    fn item(title: &str, description: &str, duration: &str) -> Item {
        Item {
            id: "v1".into(),
            title: title.into(),
            description: description.into(),
            collection_id: "c1".into(),
            collection_name: "Channel".into(),
            category: "10".into(),
            published_at: "2025-11-01T00:00:00Z".into(),
            duration: duration.into(),
            thumbnail_url: None,
            tags: Vec::new(),
        }
    }

    fn collection(popularity: Option<i64>) -> Collection {
        Collection {
            id: "c1".into(),
            name: "Channel".into(),
            popularity,
            weight: None,
            state: CollectionState::Active,
            blacklisted: false,
            last_collected_on: None,
        }
    }

    fn comment(text: &str) -> Comment {
        Comment {
            text: text.into(),
            author: String::new(),
            like_count: 0,
            published_at: String::new(),
        }
    }

    #[test]
    fn test_three_keywords_small_collection_ideal_length() {
        let scorer = HeuristicScorer::default();
        let it = item("건강 무릎 당뇨 이야기", "", "PT3M");
        let s = scorer.score(&it, None, Some(&collection(Some(5_000))));
        assert_eq!(s.keyword, 7.5);
        assert_eq!(s.genre, 0.0);
        assert_eq!(s.comment, 0.0);
        assert_eq!(s.collection, 1.2);
        assert_eq!(s.length, 2.0);
        assert_eq!(s.total, 10.3);
        assert_eq!(s.evidence.keywords, vec!["건강", "무릎", "당뇨"]);
        assert_eq!(s.evidence.length_category, LengthBucket::Ideal);
    }

    #[test]
    fn test_description_counts_half() {
        let mut lex = Lexicon::empty();
        lex.keywords = vec![WeightedTerm::new("garden", 2.0)];
        let scorer = HeuristicScorer::new(lex);
        let s = scorer.score(&item("Garden tour", "a garden walk", "PT10M"), None, None);
        assert_eq!(s.keyword, 3.0);
        assert_eq!(s.evidence.keywords, vec!["garden"]);
    }

    #[test]
    fn test_entity_bonus_and_label() {
        let scorer = HeuristicScorer::default();
        let s = scorer.score(&item("임영웅 콘서트", "", "PT5M"), None, None);
        assert_eq!(s.keyword, 3.0);
        assert_eq!(s.evidence.keywords, vec!["트로트:임영웅"]);
    }

    #[test]
    fn test_genre_signals_are_additive() {
        let scorer = HeuristicScorer::default();
        let mut it = item("가요무대 트로트 특집", "", "PT20M");
        it.tags = vec!["국악".into()];
        let s = scorer.score(&it, None, None);
        assert_eq!(s.genre, 12.0);
        assert_eq!(s.evidence.genres, vec!["트로트", "교양/전통", "가요무대"]);
    }

    #[test]
    fn test_length_boundaries() {
        let scorer = HeuristicScorer::new(Lexicon::empty());
        let at = |d: &str| scorer.score(&item("x", "", d), None, None);
        assert_eq!(at("PT3M").length, 2.0);
        assert_eq!(at("PT59S").length, -2.0);
        assert_eq!(at("PT59S").evidence.length_category, LengthBucket::ShortForm);
        assert_eq!(at("PT1M").length, 0.0);
        assert_eq!(at("PT30M").length, 2.0);
        assert_eq!(at("PT30M1S").length, 1.0);
        assert_eq!(at("PT1H").length, 1.0);
        assert_eq!(at("PT1H1S").length, 0.5);
    }

    #[test]
    fn test_malformed_duration_is_unknown() {
        let scorer = HeuristicScorer::new(Lexicon::empty());
        let s = scorer.score(&item("x", "", "fifteen minutes"), None, None);
        assert_eq!(s.length, 0.0);
        assert_eq!(s.evidence.length_category, LengthBucket::Unknown);
    }

    #[test]
    fn test_slang_penalty_counts_repeats() {
        let scorer = HeuristicScorer::default();
        let s = scorer.score(&item("레전드 레전드", "진짜 레전드", "PT5M"), None, None);
        assert_eq!(s.penalty, -1.5);
        assert_eq!(s.evidence.slang, vec!["레전드"]);
    }

    #[test]
    fn test_comment_hits_repeat_across_comments() {
        let scorer = HeuristicScorer::default();
        let comments = vec![comment("어머니가 좋아하세요"), comment("어머니 생각나요")];
        let s = scorer.score(&item("x", "", "PT5M"), Some(&comments), None);
        assert_eq!(s.comment, 0.4);
        assert_eq!(s.evidence.comment_indicators, vec!["어머니"]);
    }

    #[test]
    fn test_comment_scan_stops_at_limit() {
        let scorer = HeuristicScorer::default();
        let mut comments: Vec<Comment> = (0..50).map(|_| comment("hello")).collect();
        comments.push(comment("손주"));
        let s = scorer.score(&item("x", "", "PT5M"), Some(&comments), None);
        assert_eq!(s.comment, 0.0);
        assert!(s.evidence.comment_indicators.is_empty());
    }

    #[test]
    fn test_collection_tiers_and_bypass() {
        let mut lex = Lexicon::empty();
        lex.collection_bypass.insert("c1".into(), 1.5);
        let bypass = HeuristicScorer::new(lex);
        let s = bypass.score(&item("x", "", "PT5M"), None, Some(&collection(Some(5_000_000))));
        assert_eq!(s.collection, 7.5);

        let plain = HeuristicScorer::new(Lexicon::empty());
        let it = item("x", "", "PT5M");
        assert_eq!(plain.score(&it, None, None).collection, 1.2);
        assert_eq!(plain.score(&it, None, Some(&collection(None))).collection, 1.2);
        assert_eq!(plain.score(&it, None, Some(&collection(Some(50_000)))).collection, 1.0);
        assert_eq!(plain.score(&it, None, Some(&collection(Some(200_000)))).collection, 0.8);
    }

    #[test]
    fn test_stored_weight_overrides_bypass_table() {
        let mut lex = Lexicon::empty();
        lex.collection_bypass.insert("c1".into(), 1.5);
        let scorer = HeuristicScorer::new(lex);
        let it = item("x", "", "PT5M");

        let weighted = Collection {
            weight: Some(0.4),
            ..collection(Some(5_000_000))
        };
        assert_eq!(scorer.score(&it, None, Some(&weighted)).collection, 2.0);

        let zero = Collection {
            weight: Some(0.0),
            ..collection(Some(5_000))
        };
        assert_eq!(scorer.score(&it, None, Some(&zero)).collection, 0.0);

        // No stored weight: the table still applies.
        assert_eq!(scorer.score(&it, None, Some(&collection(None))).collection, 7.5);
    }

    #[test]
    fn test_latin_keywords_case_insensitive() {
        let mut lex = Lexicon::empty();
        lex.keywords = vec![WeightedTerm::new("Silver", 3.0)];
        let s = HeuristicScorer::new(lex).score(&item("SILVER years", "", "PT5M"), None, None);
        assert_eq!(s.keyword, 3.0);
    }

    #[test]
    fn test_score_is_deterministic() {
        let scorer = HeuristicScorer::default();
        let mut it = item("트로트 건강 ㅋㅋ", "노후 준비 연금", "PT12M");
        it.tags = vec!["다큐".into()];
        let a = scorer.score(&it, None, Some(&collection(Some(20_000))));
        let b = scorer.score(&it, None, Some(&collection(Some(20_000))));
        assert_eq!(a, b);
        assert_eq!(
            serde_json::to_string(&a).unwrap(),
            serde_json::to_string(&b).unwrap()
        );
    }
}
