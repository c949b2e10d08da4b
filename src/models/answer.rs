use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Final semantic shape of an assistant answer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnswerMode {
    /// Plain narrative text, token-streamed
    #[default]
    Rag,
    /// Tabular aggregation with its source rows
    Aggregation,
    /// Chart specification
    Chart,
}

impl AnswerMode {
    /// Parse a wire mode string. Unknown or missing modes are plain text.
    pub fn parse(value: Option<&str>) -> Self {
        match value.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
            Some("aggregation") => AnswerMode::Aggregation,
            Some("chart") => AnswerMode::Chart,
            _ => AnswerMode::Rag,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AnswerMode::Rag => "rag",
            AnswerMode::Aggregation => "aggregation",
            AnswerMode::Chart => "chart",
        }
    }

    /// True for modes whose answer replaces the placeholder wholesale.
    pub fn is_structured(&self) -> bool {
        !matches!(self, AnswerMode::Rag)
    }
}

impl std::fmt::Display for AnswerMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Numbers that may arrive as strings, nulls or anything else. Unusable
/// values become 0.
fn deserialize_lenient_numbers<'de, D>(deserializer: D) -> Result<Vec<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let values = Option::<Vec<Value>>::deserialize(deserializer)?.unwrap_or_default();
    Ok(values
        .iter()
        .map(|v| match v {
            Value::Number(n) => n.as_f64().unwrap_or(0.0),
            Value::String(s) => s.trim().parse().unwrap_or(0.0),
            _ => 0.0,
        })
        .collect())
}

/// Labels that may arrive as numbers or strings.
fn deserialize_labels<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let values = Option::<Vec<Value>>::deserialize(deserializer)?.unwrap_or_default();
    Ok(values
        .into_iter()
        .map(|v| match v {
            Value::String(s) => s,
            Value::Null => String::new(),
            other => other.to_string(),
        })
        .collect())
}

/// One series of a chart.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChartDataset {
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default, deserialize_with = "deserialize_lenient_numbers")]
    pub data: Vec<f64>,
}

/// Chart specification as produced by the analytics backend.
///
/// Two layouts occur: a flat `{type, labels, data, label}` and the
/// `{labels, datasets: [{label, data}]}` layout. Both are accepted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChartSpec {
    #[serde(rename = "type", default)]
    pub chart_type: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default, deserialize_with = "deserialize_labels")]
    pub labels: Vec<String>,
    #[serde(default, deserialize_with = "deserialize_lenient_numbers")]
    pub data: Vec<f64>,
    #[serde(default)]
    pub datasets: Vec<ChartDataset>,
}

impl ChartSpec {
    /// Pair each label with its value from the first dataset, or the flat
    /// `data` when there are no datasets. Missing values are 0.
    pub fn points(&self) -> Vec<(String, f64)> {
        let values = self
            .datasets
            .first()
            .map(|d| d.data.as_slice())
            .unwrap_or(self.data.as_slice());

        self.labels
            .iter()
            .enumerate()
            .map(|(idx, label)| (label.clone(), values.get(idx).copied().unwrap_or(0.0)))
            .collect()
    }

    /// Display name of the primary series.
    pub fn series_label(&self) -> &str {
        self.datasets
            .first()
            .and_then(|d| d.label.as_deref())
            .or(self.label.as_deref())
            .unwrap_or("Chart")
    }

    /// Decode a chart from loosely-shaped JSON.
    pub fn from_value(value: &Value) -> Option<Self> {
        if !value.is_object() {
            return None;
        }
        serde_json::from_value(value.clone()).ok()
    }
}

/// Structured part of an assistant answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum StructuredPayload {
    /// Source rows backing an aggregation
    Rows(Vec<Value>),
    /// Chart specification
    Chart(ChartSpec),
}

impl StructuredPayload {
    pub fn as_chart(&self) -> Option<&ChartSpec> {
        match self {
            StructuredPayload::Chart(chart) => Some(chart),
            StructuredPayload::Rows(_) => None,
        }
    }

    pub fn as_rows(&self) -> Option<&[Value]> {
        match self {
            StructuredPayload::Rows(rows) => Some(rows),
            StructuredPayload::Chart(_) => None,
        }
    }
}

/// The final shape of an answer, applied to the placeholder on completion.
#[derive(Debug, Clone, PartialEq)]
pub struct FinalAnswer {
    pub mode: AnswerMode,
    /// Answer text. Empty for a bare stream end.
    pub answer: String,
    pub payload: Option<StructuredPayload>,
}

impl FinalAnswer {
    /// Completion of a token stream: the accumulated text is final.
    pub fn bare() -> Self {
        Self {
            mode: AnswerMode::Rag,
            answer: String::new(),
            payload: None,
        }
    }

    /// Normalize a complete (non-streamed) answer body
    /// `{mode, answer, chart?, sources?}`.
    ///
    /// `answer` may be a string, an object carrying `result` or `answer`, or
    /// anything else (stringified; null becomes empty). Non-array `sources`
    /// are treated as empty.
    pub fn from_body(body: &Value) -> Self {
        let mode = AnswerMode::parse(body.get("mode").and_then(Value::as_str));
        let answer = normalize_answer(body.get("answer"));

        let payload = match mode {
            AnswerMode::Chart => Some(StructuredPayload::Chart(
                body.get("chart")
                    .and_then(ChartSpec::from_value)
                    .unwrap_or_default(),
            )),
            AnswerMode::Aggregation => Some(StructuredPayload::Rows(
                body.get("sources")
                    .and_then(Value::as_array)
                    .cloned()
                    .unwrap_or_default(),
            )),
            AnswerMode::Rag => None,
        };

        Self {
            mode,
            answer,
            payload,
        }
    }
}

fn normalize_answer(answer: Option<&Value>) -> String {
    match answer {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Object(map)) => map
            .get("result")
            .or_else(|| map.get("answer"))
            .map(|inner| match inner {
                Value::String(s) => s.clone(),
                Value::Null => String::new(),
                other => other.to_string(),
            })
            .unwrap_or_else(|| Value::Object(map.clone()).to_string()),
        Some(other) => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_mode_parse_defaults_to_rag() {
        assert_eq!(AnswerMode::parse(Some("chart")), AnswerMode::Chart);
        assert_eq!(AnswerMode::parse(Some("Aggregation")), AnswerMode::Aggregation);
        assert_eq!(AnswerMode::parse(Some("rag")), AnswerMode::Rag);
        assert_eq!(AnswerMode::parse(Some("sql")), AnswerMode::Rag);
        assert_eq!(AnswerMode::parse(None), AnswerMode::Rag);
    }

    #[test]
    fn test_chart_points_from_datasets() {
        let chart: ChartSpec = serde_json::from_value(json!({
            "labels": ["Electronics", "Books", "Toys"],
            "datasets": [{"label": "Revenue", "data": [1200.5, "300", null]}]
        }))
        .unwrap();

        assert_eq!(
            chart.points(),
            vec![
                ("Electronics".to_string(), 1200.5),
                ("Books".to_string(), 300.0),
                ("Toys".to_string(), 0.0),
            ]
        );
        assert_eq!(chart.series_label(), "Revenue");
    }

    #[test]
    fn test_chart_points_from_flat_layout() {
        let chart: ChartSpec = serde_json::from_value(json!({
            "type": "bar",
            "labels": [2023, 2024],
            "data": [5]
        }))
        .unwrap();

        assert_eq!(chart.chart_type.as_deref(), Some("bar"));
        assert_eq!(
            chart.points(),
            vec![("2023".to_string(), 5.0), ("2024".to_string(), 0.0)]
        );
        assert_eq!(chart.series_label(), "Chart");
    }

    #[test]
    fn test_from_body_chart() {
        let answer = FinalAnswer::from_body(&json!({
            "mode": "chart",
            "chart": {"labels": ["a"], "datasets": [{"label": "n", "data": [1]}]}
        }));
        assert_eq!(answer.mode, AnswerMode::Chart);
        assert_eq!(answer.answer, "");
        let chart = answer.payload.as_ref().and_then(|p| p.as_chart()).unwrap();
        assert_eq!(chart.points(), vec![("a".to_string(), 1.0)]);
    }

    #[test]
    fn test_from_body_aggregation_answer_shapes() {
        let nested = FinalAnswer::from_body(&json!({
            "mode": "aggregation",
            "answer": {"result": "Total revenue is 42"},
            "sources": [{"region": "EU"}]
        }));
        assert_eq!(nested.mode, AnswerMode::Aggregation);
        assert_eq!(nested.answer, "Total revenue is 42");
        assert_eq!(nested.payload.as_ref().unwrap().as_rows().unwrap().len(), 1);

        let inner_answer = FinalAnswer::from_body(&json!({
            "mode": "aggregation",
            "answer": {"answer": "7 orders"},
            "sources": "not a list"
        }));
        assert_eq!(inner_answer.answer, "7 orders");
        assert_eq!(
            inner_answer.payload,
            Some(StructuredPayload::Rows(Vec::new()))
        );

        let opaque = FinalAnswer::from_body(&json!({
            "mode": "aggregation",
            "answer": {"count": 3}
        }));
        assert_eq!(opaque.answer, r#"{"count":3}"#);
    }

    #[test]
    fn test_from_body_defaults() {
        let answer = FinalAnswer::from_body(&json!({"answer": null}));
        assert_eq!(answer.mode, AnswerMode::Rag);
        assert_eq!(answer.answer, "");
        assert_eq!(answer.payload, None);

        let numeric = FinalAnswer::from_body(&json!({"answer": 12}));
        assert_eq!(numeric.answer, "12");
    }
}
