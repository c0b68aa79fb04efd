//! `generateContent` request body.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::rubric::{SYSTEM_INSTRUCTION, USER_PROMPT};
use super::schema::response_schema;
use crate::media::ActiveMedia;
use crate::utilities::errors::{EvalError, EvalResult};

/// MIME type requested for the model's output.
pub const RESPONSE_MIME_TYPE: &str = "application/json";

/// One content part. Serializes as `{"text": ...}` or `{"fileData": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Part {
    Text(String),
    FileData(FileData),
}

/// Reference to an uploaded file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    pub file_uri: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub response_mime_type: String,
    pub response_schema: Value,
}

/// The single evaluation request of a run.
///
/// Only constructible from [`ActiveMedia`], so a request can never point at
/// media that is still processing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationRequest {
    pub system_instruction: Content,
    pub contents: Vec<Content>,
    pub generation_config: GenerationConfig,
}

impl EvaluationRequest {
    pub fn new(media: &ActiveMedia) -> Self {
        Self {
            system_instruction: Content {
                role: None,
                parts: vec![Part::Text(SYSTEM_INSTRUCTION.to_string())],
            },
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![
                    Part::FileData(FileData {
                        mime_type: media.mime_type().map(str::to_string),
                        file_uri: media.uri().to_string(),
                    }),
                    Part::Text(USER_PROMPT.to_string()),
                ],
            }],
            generation_config: GenerationConfig {
                response_mime_type: RESPONSE_MIME_TYPE.to_string(),
                response_schema: response_schema(),
            },
        }
    }

    /// JSON body for the transport.
    pub fn to_json(&self) -> EvalResult<Value> {
        serde_json::to_value(self).map_err(|source| EvalError::RequestEncoding { source })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn media() -> ActiveMedia {
        ActiveMedia::new(
            "files/v1".to_string(),
            "https://example.test/files/v1".to_string(),
            Some("video/mp4".to_string()),
        )
    }

    #[test]
    fn test_wire_shape() {
        let body = EvaluationRequest::new(&media()).to_json().unwrap();

        assert_eq!(
            body["systemInstruction"]["parts"][0]["text"],
            SYSTEM_INSTRUCTION
        );
        let parts = &body["contents"][0]["parts"];
        assert_eq!(parts[0]["fileData"]["fileUri"], "https://example.test/files/v1");
        assert_eq!(parts[0]["fileData"]["mimeType"], "video/mp4");
        assert_eq!(parts[1]["text"], USER_PROMPT);
        assert_eq!(body["generationConfig"]["responseMimeType"], "application/json");
        assert_eq!(body["generationConfig"]["responseSchema"]["type"], "object");
        assert!(body["systemInstruction"].get("role").is_none());
    }

    #[test]
    fn test_missing_mime_type_is_omitted() {
        let media = ActiveMedia::new(
            "files/v1".into(),
            "https://example.test/files/v1".into(),
            None,
        );
        let body = EvaluationRequest::new(&media).to_json().unwrap();
        assert!(body["contents"][0]["parts"][0]["fileData"]
            .get("mimeType")
            .is_none());
    }
}
