//! Request and response bodies for `models/{model}:generateContent`.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use vinxen_core::hazard::HazardReport;

use crate::GeminiError;

const SYSTEM_PROMPT: &str = "Identify the industrial accident shown in the photo. \
If no industrial accident can be found, return an empty object. \
Tag = -1: none, 0: entanglement, 1: caught-in, 2: slip or trip, 3: flying object, \
4: fall from height, 5: falling object, 6: collision, 7: explosion, 8: awkward motion, \
9: electric shock, 10: contact, 11: collapse.";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
    pub system_instruction: Content,
    pub generation_config: GenerationConfig,
    pub safety_settings: Vec<SafetySetting>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inline_data: Option<InlineData>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    pub mime_type: String,
    pub data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub temperature: f32,
    pub max_output_tokens: u32,
    pub media_resolution: &'static str,
    pub response_mime_type: &'static str,
    pub response_schema: Value,
}

#[derive(Debug, Serialize)]
pub struct SafetySetting {
    pub category: &'static str,
    pub threshold: &'static str,
}

impl GenerateContentRequest {
    /// Build the analysis request for one inline image.
    pub fn for_image(image_base64: &str, mime_type: &str) -> Self {
        Self {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part {
                    text: None,
                    inline_data: Some(InlineData {
                        mime_type: mime_type.to_string(),
                        data: image_base64.to_string(),
                    }),
                }],
            }],
            system_instruction: Content {
                role: None,
                parts: vec![Part {
                    text: Some(SYSTEM_PROMPT.to_string()),
                    inline_data: None,
                }],
            },
            generation_config: GenerationConfig {
                temperature: 0.1,
                max_output_tokens: 4096,
                media_resolution: "MEDIA_RESOLUTION_MEDIUM",
                response_mime_type: "application/json",
                response_schema: accident_schema(),
            },
            safety_settings: vec![
                SafetySetting {
                    category: "HARM_CATEGORY_HATE_SPEECH",
                    threshold: "BLOCK_ONLY_HIGH",
                },
                SafetySetting {
                    category: "HARM_CATEGORY_SEXUALLY_EXPLICIT",
                    threshold: "BLOCK_MEDIUM_AND_ABOVE",
                },
            ],
        }
    }
}

fn accident_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "Accident": {
                "type": "OBJECT",
                "required": ["Tag", "Message", "Solution"],
                "properties": {
                    "Tag": {
                        "type": "INTEGER",
                        "description": "Accident category from -1 (none) to 11 (collapse); pick the closest match"
                    },
                    "Message": {
                        "type": "STRING",
                        "description": "Description of the situation in which the accident occurred"
                    },
                    "Solution": {
                        "type": "STRING",
                        "description": "How to resolve or prevent the accident"
                    }
                }
            }
        }
    })
}

#[derive(Debug, Deserialize)]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<Content>,
}

impl GenerateContentResponse {
    /// Concatenated text of the first candidate, if any.
    pub fn text(&self) -> Option<String> {
        let content = self.candidates.first()?.content.as_ref()?;
        let text: String = content
            .parts
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect();
        if text.trim().is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

#[derive(Debug, Deserialize)]
struct AccidentEnvelope {
    #[serde(rename = "Accident")]
    accident: Option<Accident>,
}

#[derive(Debug, Deserialize)]
struct Accident {
    #[serde(rename = "Tag")]
    tag: i32,
    #[serde(rename = "Message")]
    message: String,
    #[serde(rename = "Solution")]
    solution: String,
}

/// Turn the model's JSON text into a report.
///
/// An empty object (or one without `Accident`) means no hazard was found.
pub fn parse_report(text: &str) -> Result<HazardReport, GeminiError> {
    let trimmed = strip_code_fence(text.trim());
    let envelope: AccidentEnvelope =
        serde_json::from_str(trimmed).map_err(|e| GeminiError::Parse(e.to_string()))?;

    Ok(match envelope.accident {
        Some(a) => HazardReport {
            tag: a.tag,
            message: a.message,
            solution: a.solution,
        },
        None => HazardReport::none(),
    })
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}
