//! Response schema for the structured evaluation.
//!
//! The schema is generated from [`SCORE_CATEGORIES`] so the request and the
//! typed [`SpeakingReport`](super::report::SpeakingReport) agree on key names.

use serde_json::{json, Map, Value};

/// Lowest score the model may assign.
pub const MIN_SCORE: i64 = 1;
/// Highest score the model may assign.
pub const MAX_SCORE: i64 = 10;

/// Top-level keys the model must emit.
pub const REQUIRED_KEYS: [&str; 4] = ["video_id", "scores", "disfluencies", "summary"];

/// Score categories and their sub-criteria, in rubric order.
pub const SCORE_CATEGORIES: &[(&str, &[&str])] = &[
    (
        "voice_sound",
        &[
            "pitch_tone",
            "volume",
            "tempo_pace",
            "clarity_articulation",
            "pausing_hesitation",
            "prosody",
        ],
    ),
    (
        "word_choice",
        &[
            "formality",
            "complexity",
            "repetition",
            "directness",
            "emotional_tone",
        ],
    ),
    (
        "sentence_structure",
        &[
            "sentence_length",
            "narrative_style",
            "use_of_questions",
            "metaphors_analogies",
        ],
    ),
    (
        "conversational_style",
        &[
            "turn_taking",
            "responsiveness",
            "politeness",
            "assertiveness",
            "humor_playfulness",
        ],
    ),
    ("nonverbal", &["laughter", "gestures", "facial_expressions"]),
    (
        "overall_impression",
        &["warmth", "authority", "charisma", "overall_score"],
    ),
];

fn score_property() -> Value {
    json!({ "type": "integer", "minimum": MIN_SCORE, "maximum": MAX_SCORE })
}

fn counted_items(label: &str) -> Value {
    json!({
        "type": "array",
        "items": {
            "type": "object",
            "properties": {
                label: { "type": "string" },
                "count": { "type": "integer" }
            }
        }
    })
}

/// The `responseSchema` sent in `generationConfig`.
pub fn response_schema() -> Value {
    let mut categories = Map::new();
    for (category, criteria) in SCORE_CATEGORIES {
        let properties: Map<String, Value> = criteria
            .iter()
            .map(|c| (c.to_string(), score_property()))
            .collect();
        categories.insert(
            category.to_string(),
            json!({ "type": "object", "properties": properties }),
        );
    }
    let category_names: Vec<&str> = SCORE_CATEGORIES.iter().map(|(name, _)| *name).collect();

    json!({
        "type": "object",
        "required": REQUIRED_KEYS,
        "properties": {
            "video_id": { "type": "string" },
            "scores": {
                "type": "object",
                "required": category_names,
                "properties": categories
            },
            "disfluencies": {
                "type": "object",
                "properties": {
                    "filler_words": counted_items("token"),
                    "repeated_phrases": counted_items("phrase")
                }
            },
            "summary": { "type": "string" }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_top_level_required_keys() {
        let schema = response_schema();
        assert_eq!(
            schema["required"],
            json!(["video_id", "scores", "disfluencies", "summary"])
        );
        assert_eq!(schema["properties"]["summary"]["type"], "string");
    }

    #[test]
    fn test_every_sub_criterion_is_bounded_integer() {
        let schema = response_schema();
        let scores = &schema["properties"]["scores"];
        assert_eq!(
            scores["required"].as_array().map(Vec::len),
            Some(SCORE_CATEGORIES.len())
        );
        for (category, criteria) in SCORE_CATEGORIES {
            for criterion in *criteria {
                let prop = &scores["properties"][category]["properties"][criterion];
                assert_eq!(prop["type"], "integer", "{category}.{criterion}");
                assert_eq!(prop["minimum"], 1);
                assert_eq!(prop["maximum"], 10);
            }
        }
    }

    #[test]
    fn test_disfluency_item_shapes() {
        let schema = response_schema();
        let d = &schema["properties"]["disfluencies"]["properties"];
        assert_eq!(d["filler_words"]["items"]["properties"]["token"]["type"], "string");
        assert_eq!(d["repeated_phrases"]["items"]["properties"]["phrase"]["type"], "string");
        assert_eq!(d["repeated_phrases"]["items"]["properties"]["count"]["type"], "integer");
    }
}
