use serde::{Deserialize, Serialize};

/// Whether a tip praises the resume or asks for a change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TipKind {
    Good,
    Improve,
}

/// One review tip. `explanation` is only produced for the detailed
/// categories; the ATS summary emits short tips without one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tip {
    #[serde(rename = "type")]
    pub kind: TipKind,
    pub tip: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

/// Score plus ordered tips for one review category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryScore {
    pub score: f64,
    #[serde(default)]
    pub tips: Vec<Tip>,
}

/// The fixed five-category review the generator is instructed to emit.
/// All five categories are required; a reply missing any of them fails the
/// schema parse and is preserved as raw text instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructuredFeedback {
    pub overall_score: f64,
    #[serde(rename = "ATS")]
    pub ats: CategoryScore,
    pub tone_and_style: CategoryScore,
    pub content: CategoryScore,
    pub structure: CategoryScore,
    pub skills: CategoryScore,
}

/// Outcome of feedback generation. Exactly one shape is ever present.
///
/// Untagged on the wire: records written before this crate existed carry no
/// discriminant, just either the structured document or `{"raw": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Feedback {
    /// Generator output that parsed against the structured schema.
    Structured(StructuredFeedback),
    /// Generator output preserved verbatim because the schema parse failed.
    Raw { raw: String },
}

impl Feedback {
    /// Strict schema parse with verbatim fallback. The reply is parsed
    /// exactly as received; no fence stripping or repair happens first, so a
    /// reply wrapped in markdown fences lands in `Raw` unchanged.
    pub fn from_generated(text: &str) -> Self {
        match serde_json::from_str::<StructuredFeedback>(text) {
            Ok(structured) => Feedback::Structured(structured),
            Err(_) => Feedback::Raw {
                raw: text.to_string(),
            },
        }
    }

    pub fn is_structured(&self) -> bool {
        matches!(self, Feedback::Structured(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn structured_json() -> String {
        serde_json::json!({
            "overallScore": 82,
            "ATS": { "score": 75, "tips": [{ "type": "improve", "tip": "Add keywords" }] },
            "toneAndStyle": { "score": 80, "tips": [] },
            "content": { "score": 78, "tips": [{ "type": "good", "tip": "Clear impact", "explanation": "Numbers everywhere" }] },
            "structure": { "score": 74, "tips": [] },
            "skills": { "score": 85, "tips": [] }
        })
        .to_string()
    }

    #[test]
    fn test_parses_structured_reply() {
        let feedback = Feedback::from_generated(&structured_json());
        match feedback {
            Feedback::Structured(doc) => {
                assert_eq!(doc.overall_score, 82.0);
                assert_eq!(doc.ats.score, 75.0);
                assert_eq!(doc.ats.tips[0].kind, TipKind::Improve);
                assert_eq!(doc.content.tips[0].explanation.as_deref(), Some("Numbers everywhere"));
            }
            Feedback::Raw { .. } => panic!("expected structured feedback"),
        }
    }

    #[test]
    fn test_non_json_reply_falls_back_verbatim() {
        let text = "Sorry, I cannot produce JSON today.";
        match Feedback::from_generated(text) {
            Feedback::Raw { raw } => assert_eq!(raw, text),
            Feedback::Structured(_) => panic!("expected raw fallback"),
        }
    }

    #[test]
    fn test_fenced_json_is_not_unwrapped() {
        let fenced = format!("```json\n{}\n```", structured_json());
        match Feedback::from_generated(&fenced) {
            Feedback::Raw { raw } => assert_eq!(raw, fenced),
            Feedback::Structured(_) => panic!("fenced replies must not be repaired"),
        }
    }

    #[test]
    fn test_missing_category_falls_back() {
        // Everything but "skills" is present.
        let partial = serde_json::json!({
            "overallScore": 50,
            "ATS": { "score": 50, "tips": [] },
            "toneAndStyle": { "score": 50, "tips": [] },
            "content": { "score": 50, "tips": [] },
            "structure": { "score": 50, "tips": [] }
        })
        .to_string();
        assert!(!Feedback::from_generated(&partial).is_structured());
    }

    #[test]
    fn test_round_trips_through_storage() {
        let feedback = Feedback::from_generated(&structured_json());
        let stored = serde_json::to_string(&feedback).unwrap();
        let reloaded: Feedback = serde_json::from_str(&stored).unwrap();
        assert_eq!(reloaded, feedback);
    }

    #[test]
    fn test_stored_raw_shape_decodes_as_raw() {
        let reloaded: Feedback = serde_json::from_str(r#"{"raw":"plain text"}"#).unwrap();
        assert_eq!(
            reloaded,
            Feedback::Raw {
                raw: "plain text".to_string()
            }
        );
    }

    #[test]
    fn test_wire_layout_is_camel_case() {
        let feedback = Feedback::from_generated(&structured_json());
        let stored = serde_json::to_string(&feedback).unwrap();
        assert!(stored.contains("\"overallScore\""));
        assert!(stored.contains("\"ATS\""));
        assert!(stored.contains("\"toneAndStyle\""));
        assert!(stored.contains("\"type\":\"improve\""));
        assert!(!stored.contains("overall_score"));
    }
}
