//! Wire types for the Gemini `generateContent` call.
//!
//! The request carries the image as an inline part, the instruction text as
//! a second part, and a response schema that forces the model to answer with
//! an array of flat string objects.

use crate::columns::{ColumnSpec, SCORE_KEY, STUDENT_NAME_KEY};
use crate::pipeline::encode::EncodedImage;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
    pub generation_config: GenerationConfig,
}

#[derive(Debug, Clone, Serialize)]
pub struct Content {
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Part {
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
    Text {
        text: String,
    },
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    pub mime_type: String,
    pub data: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub response_mime_type: String,
    pub response_schema: Value,
    pub temperature: f32,
}

/// Assemble the request for one image.
pub fn build_request(
    image: &EncodedImage,
    columns: &ColumnSpec,
    instructions: String,
    temperature: f32,
) -> GenerateContentRequest {
    GenerateContentRequest {
        contents: vec![Content {
            parts: vec![
                Part::InlineData {
                    inline_data: InlineData {
                        mime_type: image.mime_type.clone(),
                        data: image.base64_data.clone(),
                    },
                },
                Part::Text { text: instructions },
            ],
        }],
        generation_config: GenerationConfig {
            response_mime_type: "application/json".to_string(),
            response_schema: response_schema(columns),
            temperature,
        },
    }
}

/// Response schema: an array of objects with one required string per column.
pub fn response_schema(columns: &ColumnSpec) -> Value {
    let mut properties = Map::new();
    properties.insert(
        STUDENT_NAME_KEY.to_string(),
        json!({
            "type": "STRING",
            "description": "Full name of the student, exactly as written including diacritics."
        }),
    );
    properties.insert(
        SCORE_KEY.to_string(),
        json!({
            "type": "STRING",
            "description": "Final score as a single value, e.g. 8.5 or 10."
        }),
    );
    for column in columns.custom_columns() {
        properties.insert(
            column.key.clone(),
            json!({ "type": "STRING", "description": column.label }),
        );
    }

    let keys: Vec<&str> = columns.keys().collect();
    json!({
        "type": "ARRAY",
        "items": {
            "type": "OBJECT",
            "properties": properties,
            "required": keys,
            "propertyOrdering": keys,
        }
    })
}

// ── Response ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    pub prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub content: Option<CandidateContent>,
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CandidateContent {
    #[serde(default)]
    pub parts: Vec<ResponsePart>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResponsePart {
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptFeedback {
    pub block_reason: Option<String>,
}

impl GenerateContentResponse {
    /// Concatenated text of the first candidate, if any non-blank text exists.
    pub fn text(&self) -> Option<String> {
        let parts = &self.candidates.first()?.content.as_ref()?.parts;
        let text: String = parts.iter().filter_map(|p| p.text.as_deref()).collect();
        if text.trim().is_empty() {
            None
        } else {
            Some(text)
        }
    }

    /// Why no text came back, for error messages.
    pub fn empty_reason(&self) -> String {
        if let Some(reason) = self
            .prompt_feedback
            .as_ref()
            .and_then(|f| f.block_reason.as_deref())
        {
            return format!("prompt blocked ({reason})");
        }
        match self.candidates.first() {
            None => "response has no candidates".to_string(),
            Some(c) => match c.finish_reason.as_deref() {
                Some(reason) => format!("candidate has no text (finish reason {reason})"),
                None => "candidate has no text".to_string(),
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
    status: Option<String>,
}

/// Pull a readable message out of a non-success response body.
pub fn error_message(body: &str) -> String {
    if let Ok(envelope) = serde_json::from_str::<ApiErrorEnvelope>(body) {
        return match envelope.error.status {
            Some(status) => format!("{status}: {}", envelope.error.message),
            None => envelope.error.message,
        };
    }
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return "<empty body>".to_string();
    }
    let mut msg: String = trimmed.chars().take(200).collect();
    if trimmed.chars().count() > 200 {
        msg.push('\u{2026}');
    }
    msg
}
