//! Review prompt, response schema and verdict parsing.
//!
//! The endpoint is asked for strict JSON: a ternary `ai_requirement`, a
//! short reason and the keywords it relied on. Parsing is lenient anyway,
//! since not every compatible backend honors `json_schema` strictly.

use serde::Deserialize;
use serde_json::{json, Value};

use adsignal_core::Label;

/// Verdict reasons are capped at this many characters.
pub const MAX_REASON_CHARS: usize = 150;

/// Instructions sent as the system message with every review request.
pub const SYSTEM_PROMPT: &str = "\
You review full job descriptions and identify whether the job mentions \
AI-related skills associated with the role. These must relate to the \
candidate's profile, responsibilities, or tools used in the role; they can \
be requirements, nice-to-have, or helpful for the job.

Ignore mentions of AI that only describe the company, its products or its \
research areas, unless they are clearly associated with the role, its \
requirements or the candidate profile.

Assign ONE of the following values to the field \"ai_requirement\":

- \"True\"  - clear AI/ML skills or responsibilities are required or desired \
for the role. Assign \"True\" ONLY if the text contains at least one \
explicit AI/ML reference connected to the candidate's skills, tools or \
responsibilities: artificial intelligence, AI, machine learning, ML, deep \
learning, neural networks, data science as a main skill, natural language \
processing, NLP, sentiment analysis, computer vision, image recognition, \
speech recognition, anomaly detection, predictive maintenance, generative \
AI, LLMs, ChatGPT, recommendation systems, TensorFlow, PyTorch, \
scikit-learn, Keras, AI governance, AI product management. If no explicit \
AI/ML term appears in the text, NEVER assign \"True\".

- \"Maybe\" - no explicit AI/ML requirement, but the role requires at least \
one skill that is often AI-based yet can also be done without it, and that \
skill is clearly part of the candidate's profile or responsibilities: data \
mining, robotics, robot control, general signal processing, predictive \
analytics, RPA without explicit AI/ML.

- \"False\" - neither of the above. Do NOT treat the following as AI: big \
data, data analysis, business intelligence, reporting, statistics, \
econometrics, SQL, data warehouses, ETL, cloud computing without AI/ML \
services, IoT, digitalization, Industry 4.0, general automation or \
scripting, or generic buzzwords like \"innovative technologies\". If only \
these appear, assign \"False\".

Return JSON with fields:
- ai_requirement: one of \"True\", \"Maybe\", \"False\"
- reason: a very short justification (at most 150 characters)
- keywords: the relevant AI or AI-adjacent keywords exactly as written in \
the text (use [] if none)";

/// Strict response schema for the `json_schema` response format.
pub fn response_schema() -> Value {
    json!({
        "name": "ai_requirement_simple",
        "schema": {
            "type": "object",
            "properties": {
                "ai_requirement": {
                    "type": "string",
                    "enum": ["True", "Maybe", "False"]
                },
                "reason": { "type": "string" },
                "keywords": {
                    "type": "array",
                    "items": { "type": "string" }
                }
            },
            "required": ["ai_requirement", "reason", "keywords"],
            "additionalProperties": false
        },
        "strict": true
    })
}

/// A parsed verdict payload, before it is attached to an ad.
#[derive(Debug, Clone, PartialEq)]
pub struct VerdictPayload {
    pub label: Label,
    pub reason: String,
    pub keywords: Vec<String>,
}

#[derive(Deserialize)]
struct RawVerdict {
    #[serde(default)]
    ai_requirement: Option<Value>,
    #[serde(default)]
    reason: Option<String>,
    #[serde(default)]
    keywords: Vec<String>,
}

/// Parse the model's message content. Lenient on the label field: accepts
/// the schema strings, casing variants and legacy booleans. Structurally
/// invalid JSON is an error and counts as a failed attempt.
pub fn parse_verdict(content: &str) -> Result<VerdictPayload, serde_json::Error> {
    let raw: RawVerdict = serde_json::from_str(content)?;

    let label = match raw.ai_requirement {
        Some(Value::String(s)) => Label::parse_lenient(&s),
        Some(Value::Bool(true)) => Label::True,
        Some(Value::Bool(false)) => Label::False,
        _ => Label::Missing,
    };

    let mut reason = raw.reason.unwrap_or_default();
    if reason.chars().count() > MAX_REASON_CHARS {
        reason = reason.chars().take(MAX_REASON_CHARS).collect();
    }

    Ok(VerdictPayload {
        label,
        reason,
        keywords: raw.keywords,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_is_strict_ternary() {
        let schema = response_schema();
        assert_eq!(schema["strict"], true);
        let variants = schema["schema"]["properties"]["ai_requirement"]["enum"]
            .as_array()
            .unwrap();
        assert_eq!(variants.len(), 3);
        assert_eq!(schema["schema"]["additionalProperties"], false);
    }

    #[test]
    fn test_parse_schema_conformant_verdict() {
        let payload = parse_verdict(
            r#"{"ai_requirement":"True","reason":"requires ML","keywords":["machine learning"]}"#,
        )
        .unwrap();
        assert_eq!(payload.label, Label::True);
        assert_eq!(payload.reason, "requires ML");
        assert_eq!(payload.keywords, vec!["machine learning"]);
    }

    #[test]
    fn test_parse_accepts_casing_and_boolean_variants() {
        let payload =
            parse_verdict(r#"{"ai_requirement":"maybe","reason":"","keywords":[]}"#).unwrap();
        assert_eq!(payload.label, Label::Maybe);

        let payload =
            parse_verdict(r#"{"ai_requirement":true,"reason":"","keywords":[]}"#).unwrap();
        assert_eq!(payload.label, Label::True);

        let payload =
            parse_verdict(r#"{"ai_requirement":false,"reason":"","keywords":[]}"#).unwrap();
        assert_eq!(payload.label, Label::False);
    }

    #[test]
    fn test_parse_missing_fields() {
        let payload = parse_verdict("{}").unwrap();
        assert_eq!(payload.label, Label::Missing);
        assert!(payload.reason.is_empty());
        assert!(payload.keywords.is_empty());

        // unknown label strings fall back to False, like upstream artifacts
        let payload =
            parse_verdict(r#"{"ai_requirement":"unsure","reason":"","keywords":[]}"#).unwrap();
        assert_eq!(payload.label, Label::False);
    }

    #[test]
    fn test_reason_truncated() {
        let long = "x".repeat(400);
        let content = format!(r#"{{"ai_requirement":"True","reason":"{long}","keywords":[]}}"#);
        let payload = parse_verdict(&content).unwrap();
        assert_eq!(payload.reason.chars().count(), MAX_REASON_CHARS);
    }

    #[test]
    fn test_invalid_json_is_error() {
        assert!(parse_verdict("not json").is_err());
        assert!(parse_verdict("").is_err());
    }
}
