use serde::{Deserialize, Serialize};

/// What an external classifier reported for one image.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassifierOutput {
    pub prediction: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
}

#[derive(Deserialize)]
struct StructuredLine {
    prediction: serde_json::Value,
    #[serde(default)]
    confidence: Option<f64>,
}

/// Parses classifier stdout. Only the last non-empty line counts, so anything
/// the process logs before its answer is ignored.
///
/// The line may be a JSON object `{"prediction": .., "confidence": ..}` or
/// plain text, which is taken verbatim. Returns `None` for empty output.
pub fn parse_classifier_output(stdout: &str) -> Option<ClassifierOutput> {
    let line = stdout.lines().map(str::trim).filter(|l| !l.is_empty()).last()?;

    if line.starts_with('{') {
        if let Ok(structured) = serde_json::from_str::<StructuredLine>(line) {
            let prediction = match structured.prediction {
                serde_json::Value::String(s) => s.trim().to_string(),
                serde_json::Value::Number(n) => n.to_string(),
                _ => line.to_string(),
            };
            let confidence = structured
                .confidence
                .filter(|c| c.is_finite() && (0.0..=1.0).contains(c))
                .map(|c| c as f32);
            return Some(ClassifierOutput { prediction, confidence });
        }
    }

    Some(ClassifierOutput {
        prediction: line.to_string(),
        confidence: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_last_line() {
        let out = parse_classifier_output("Loading model...\n1/1 [====] 0s\n33\n").unwrap();
        assert_eq!(out.prediction, "33");
        assert_eq!(out.confidence, None);
    }

    #[test]
    fn test_structured_line() {
        let out = parse_classifier_output("{\"prediction\": 23, \"confidence\": 0.91}\n").unwrap();
        assert_eq!(out.prediction, "23");
        assert!((out.confidence.unwrap() - 0.91).abs() < 1e-6);

        let out = parse_classifier_output("{\"prediction\": \"12\"}").unwrap();
        assert_eq!(out.prediction, "12");
        assert_eq!(out.confidence, None);
    }

    #[test]
    fn test_out_of_range_confidence_is_dropped() {
        let out = parse_classifier_output("{\"prediction\": 5, \"confidence\": 7.5}").unwrap();
        assert_eq!(out.confidence, None);
    }

    #[test]
    fn test_malformed_json_is_verbatim() {
        let out = parse_classifier_output("{not json").unwrap();
        assert_eq!(out.prediction, "{not json");
    }

    #[test]
    fn test_empty_output() {
        assert_eq!(parse_classifier_output(""), None);
        assert_eq!(parse_classifier_output("\n  \n"), None);
    }
}
