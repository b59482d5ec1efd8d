//! Report data model
//!
//! Field names follow the extraction schema on the wire (`linkedin_snapshot`,
//! `pr_insights`, ...) so a parsed report serializes back to the same JSON.

use crate::error::{AppError, AppResult};
use serde::{Deserialize, Serialize};

/// Top-level keys are required by the response schema; anything nested may
/// be missing and falls back to its default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub summary: String,
    pub sentiment: Sentiment,
    #[serde(default)]
    pub themes: Vec<String>,
    #[serde(default)]
    pub articles: Vec<Article>,
    #[serde(default)]
    pub social_discussions: Vec<SocialDiscussion>,
    #[serde(rename = "linkedin_snapshot")]
    pub corporate_snapshot: CorporateSnapshot,
    #[serde(default)]
    pub stock_info: Option<StockInfo>,
    #[serde(default)]
    pub competitors: Vec<Competitor>,
    #[serde(rename = "pr_insights")]
    pub insights: PrInsights,
}

impl Report {
    /// Parse the extraction call's JSON text into a report
    pub fn parse(text: &str) -> AppResult<Report> {
        serde_json::from_str(strip_code_fence(text)).map_err(|e| AppError::JsonParse(e.to_string()))
    }
}

/// Models occasionally wrap JSON output in a ```json fence despite the mime type
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SentimentScore {
    pub value: f64,
    pub summary: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Sentiment {
    pub positive: SentimentScore,
    pub negative: SentimentScore,
    pub neutral: SentimentScore,
}

impl Sentiment {
    pub fn total(&self) -> f64 {
        self.positive.value + self.negative.value + self.neutral.value
    }

    /// The model is asked for values summing to 100; this is never enforced
    pub fn is_balanced(&self) -> bool {
        (self.total() - 100.0).abs() < 0.5
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Article {
    pub title: String,
    pub source: String,
    pub url: String,
    pub summary: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SocialDiscussion {
    pub platform: String,
    pub title: String,
    pub url: String,
    pub summary: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HiringTrend {
    Increasing,
    Decreasing,
    #[default]
    Stable,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Executive {
    pub name: String,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CorporateSnapshot {
    pub employee_count: String,
    pub hiring_trend: HiringTrend,
    pub key_executives: Vec<Executive>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PricePoint {
    pub date: String,
    pub price: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StockInfo {
    pub name: String,
    pub ticker: String,
    pub price: String,
    pub change_percent: f64,
    pub summary: String,
    pub historical_data: Vec<PricePoint>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Competitor {
    pub name: String,
    pub summary: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Swot {
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    pub opportunities: Vec<String>,
    pub threats: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaContact {
    pub name: String,
    pub outlet: String,
    pub beat: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaContacts {
    pub internal: Vec<MediaContact>,
    pub external: Vec<MediaContact>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PrInsights {
    pub swot_analysis: Swot,
    pub key_media_contacts: MediaContacts,
    pub suggested_story_angles: Vec<String>,
}

#[cfg(test)]
pub(crate) mod fixtures {
    /// Extraction output as the model returns it for a listed company
    pub const SAMPLE_REPORT_JSON: &str = r#"{
        "summary": "Samsung remains a dominant consumer electronics brand.",
        "sentiment": {
            "positive": { "value": 55, "summary": "Strong Galaxy launch coverage." },
            "negative": { "value": 20, "summary": "Labour dispute headlines." },
            "neutral": { "value": 25, "summary": "Earnings previews." }
        },
        "themes": ["Foldables", "AI features", "Chip supply"],
        "articles": [
            { "title": "Galaxy Z Fold launch", "source": "The Verge", "url": "https://example.com/a1", "summary": "Launch recap." },
            { "title": "Chip profits rebound", "source": "Reuters", "url": "https://example.com/a2", "summary": "Memory prices up." }
        ],
        "social_discussions": [
            { "platform": "Reddit", "title": "Fold durability", "url": "https://reddit.com/r/x", "summary": "Hinge debate." },
            { "platform": "YouTube", "title": "Unboxing", "url": "https://youtube.com/watch?v=1", "summary": "First look." }
        ],
        "linkedin_snapshot": {
            "employee_count": "260,000+",
            "hiring_trend": "stable",
            "key_executives": [ { "name": "Jong-Hee Han", "title": "CEO" } ]
        },
        "stock_info": {
            "name": "Samsung Electronics",
            "ticker": "005930.KS",
            "price": "₩71,000",
            "change_percent": -1.2,
            "summary": "Shares dipped on guidance.",
            "historical_data": [
                { "date": "2024-01-31", "price": 74000 },
                { "date": "2024-02-29", "price": 72500.5 }
            ]
        },
        "competitors": [
            { "name": "Apple", "summary": "Premium rival." },
            { "name": "Xiaomi", "summary": "Value rival." }
        ],
        "pr_insights": {
            "swot_analysis": {
                "strengths": ["Vertical integration"],
                "weaknesses": ["Software perception"],
                "opportunities": ["On-device AI"],
                "threats": ["Trade policy"]
            },
            "key_media_contacts": {
                "internal": [ { "name": "Samsung Newsroom", "outlet": "Samsung", "beat": "Corporate", "url": "https://news.samsung.com" } ],
                "external": [ { "name": "Jane Reporter", "outlet": "Bloomberg", "beat": "Consumer tech", "url": "https://x.com/jane" } ]
            },
            "suggested_story_angles": ["AI on every device"]
        }
    }"#;
}

#[cfg(test)]
mod tests {
    use super::fixtures::SAMPLE_REPORT_JSON;
    use super::*;

    #[test]
    fn test_parse_full_report() {
        let report = Report::parse(SAMPLE_REPORT_JSON).unwrap();
        assert_eq!(report.themes.len(), 3);
        assert_eq!(report.corporate_snapshot.hiring_trend, HiringTrend::Stable);
        assert_eq!(report.insights.key_media_contacts.external[0].outlet, "Bloomberg");
        let stock = report.stock_info.as_ref().unwrap();
        assert_eq!(stock.ticker, "005930.KS");
        assert_eq!(stock.historical_data[1].price, 72500.5);
        assert!(report.sentiment.is_balanced());
    }

    #[test]
    fn test_round_trip_keeps_wire_keys() {
        let report = Report::parse(SAMPLE_REPORT_JSON).unwrap();
        let json = serde_json::to_value(&report).unwrap();
        assert!(json.get("linkedin_snapshot").is_some());
        assert!(json.get("pr_insights").is_some());
        assert!(json.get("corporate_snapshot").is_none());

        let reparsed = Report::parse(&json.to_string()).unwrap();
        assert_eq!(reparsed, report);
    }

    #[test]
    fn test_null_stock_info() {
        let mut value: serde_json::Value = serde_json::from_str(SAMPLE_REPORT_JSON).unwrap();
        value["stock_info"] = serde_json::Value::Null;
        let report = Report::parse(&value.to_string()).unwrap();
        assert!(report.stock_info.is_none());
    }

    #[test]
    fn test_fenced_json_accepted() {
        let fenced = format!("```json\n{}\n```", SAMPLE_REPORT_JSON);
        assert!(Report::parse(&fenced).is_ok());
    }

    #[test]
    fn test_invalid_json_is_parse_error() {
        let err = Report::parse("Here is your report: {").unwrap_err();
        assert!(matches!(err, AppError::JsonParse(_)));
    }

    #[test]
    fn test_missing_nested_fields_default() {
        let mut value: serde_json::Value = serde_json::from_str(SAMPLE_REPORT_JSON).unwrap();
        value["stock_info"].as_object_mut().unwrap().remove("summary");
        value["stock_info"].as_object_mut().unwrap().remove("change_percent");
        value["sentiment"]["neutral"].as_object_mut().unwrap().remove("summary");
        value["linkedin_snapshot"].as_object_mut().unwrap().remove("hiring_trend");
        value["pr_insights"].as_object_mut().unwrap().remove("swot_analysis");
        value["pr_insights"].as_object_mut().unwrap().remove("key_media_contacts");
        value["articles"][0].as_object_mut().unwrap().remove("source");

        let report = Report::parse(&value.to_string()).unwrap();
        let stock = report.stock_info.as_ref().unwrap();
        assert_eq!(stock.ticker, "005930.KS");
        assert_eq!(stock.summary, "");
        assert_eq!(stock.change_percent, 0.0);
        assert_eq!(report.sentiment.neutral.value, 25.0);
        assert_eq!(report.sentiment.neutral.summary, "");
        assert_eq!(report.corporate_snapshot.hiring_trend, HiringTrend::Stable);
        assert_eq!(report.corporate_snapshot.employee_count, "260,000+");
        assert_eq!(report.insights.swot_analysis, Swot::default());
        assert!(report.insights.key_media_contacts.internal.is_empty());
        assert_eq!(report.insights.suggested_story_angles, vec!["AI on every device".to_string()]);
        assert_eq!(report.articles[0].source, "");
    }

    #[test]
    fn test_unknown_hiring_trend_rejected() {
        let bad = SAMPLE_REPORT_JSON.replace("\"stable\"", "\"booming\"");
        assert!(matches!(Report::parse(&bad), Err(AppError::JsonParse(_))));
    }

    #[test]
    fn test_unbalanced_sentiment_still_parses() {
        let skewed = SAMPLE_REPORT_JSON.replace("\"value\": 25", "\"value\": 40");
        let report = Report::parse(&skewed).unwrap();
        assert_eq!(report.sentiment.total(), 115.0);
        assert!(!report.sentiment.is_balanced());
    }
}
