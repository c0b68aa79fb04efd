//! Typed view of the model's JSON evaluation.
//!
//! Parsing is best-effort: the model is asked for schema-constrained JSON,
//! but a report that fails to parse is still shown as raw text.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::schema::{MAX_SCORE, MIN_SCORE, SCORE_CATEGORIES};

static CODE_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"```(?:json)?\s*([\s\S]*?)```").expect("valid regex"));
static JSON_OBJECT: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{[\s\S]*\}").expect("valid regex"));

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FillerWord {
    pub token: String,
    #[serde(default)]
    pub count: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepeatedPhrase {
    pub phrase: String,
    #[serde(default)]
    pub count: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Disfluencies {
    #[serde(default)]
    pub filler_words: Vec<FillerWord>,
    #[serde(default)]
    pub repeated_phrases: Vec<RepeatedPhrase>,
}

impl Disfluencies {
    pub fn total_fillers(&self) -> u32 {
        self.filler_words.iter().map(|f| f.count).sum()
    }
}

/// Parsed evaluation report.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpeakingReport {
    #[serde(default)]
    pub video_id: Option<String>,
    /// Category -> sub-criterion -> score.
    #[serde(default)]
    pub scores: BTreeMap<String, BTreeMap<String, i64>>,
    #[serde(default)]
    pub disfluencies: Disfluencies,
    #[serde(default)]
    pub summary: Option<String>,
}

/// A score the schema should have prevented.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreIssue {
    pub category: String,
    pub criterion: String,
    pub problem: ScoreProblem,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreProblem {
    Missing,
    OutOfRange(i64),
}

impl SpeakingReport {
    /// Parse a report out of model text, tolerating Markdown fences and
    /// surrounding prose.
    pub fn from_text(text: &str) -> Option<Self> {
        let json = extract_json_object(text)?;
        serde_json::from_value(json).ok()
    }

    /// Mean of a category's sub-scores.
    pub fn category_average(&self, category: &str) -> Option<f64> {
        let scores = self.scores.get(category)?;
        if scores.is_empty() {
            return None;
        }
        Some(scores.values().sum::<i64>() as f64 / scores.len() as f64)
    }

    /// Sub-criteria that are missing or outside the 1-10 range.
    pub fn score_issues(&self) -> Vec<ScoreIssue> {
        let mut issues = Vec::new();
        for (category, criteria) in SCORE_CATEGORIES {
            let scores = self.scores.get(*category);
            for criterion in *criteria {
                let problem = match scores.and_then(|s| s.get(*criterion)) {
                    None => Some(ScoreProblem::Missing),
                    Some(&v) if !(MIN_SCORE..=MAX_SCORE).contains(&v) => {
                        Some(ScoreProblem::OutOfRange(v))
                    }
                    Some(_) => None,
                };
                if let Some(problem) = problem {
                    issues.push(ScoreIssue {
                        category: category.to_string(),
                        criterion: criterion.to_string(),
                        problem,
                    });
                }
            }
        }
        issues
    }
}

/// Find the first JSON object in `text`.
fn extract_json_object(text: &str) -> Option<Value> {
    let parse = |s: &str| serde_json::from_str::<Value>(s.trim()).ok().filter(Value::is_object);

    if let Some(v) = parse(text) {
        return Some(v);
    }
    for cap in CODE_BLOCK.captures_iter(text) {
        if let Some(v) = cap.get(1).and_then(|m| parse(m.as_str())) {
            return Some(v);
        }
    }
    JSON_OBJECT.find(text).and_then(|m| parse(m.as_str()))
}
