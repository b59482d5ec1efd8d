// Prompt templates and the extraction schema for the two report calls.
// Research output is free text; extraction output must match the schema.

use chrono::{Months, NaiveDate};
use serde_json::{json, Value};

/// Date one year before `today`, as YYYY-MM-DD. Feb 29 clamps to Feb 28.
pub fn lookback_date(today: NaiveDate) -> String {
    today
        .checked_sub_months(Months::new(12))
        .unwrap_or(today)
        .format("%Y-%m-%d")
        .to_string()
}

fn refinement_clause(refinement: Option<&str>) -> String {
    match refinement.map(str::trim).filter(|r| !r.is_empty()) {
        Some(topic) => format!(" The user has requested a deep dive on this specific topic: \"{}\".", topic),
        None => String::new(),
    }
}

/// Call #1: web-search-backed gathering of raw material
pub fn research_prompt(brand: &str, refinement: Option<&str>, today: NaiveDate) -> String {
    format!(
        r#"Perform targeted web searches for a brand intelligence report on "{brand}", focusing on information since {since}.{refinement}
You MUST find information for every category below:
1.  **News & Articles:** Find at least 20 recent, relevant news articles.
2.  **Social Buzz:** Find at least 20 high-engagement or controversial posts about the brand from Reddit, YouTube, Instagram, and LinkedIn.
3.  **Corporate Data:** Find the official employee count, hiring trend, and a list of C-suite executives.
4.  **Competitor Landscape:** Identify the top 3 main competitors and find a brief summary of their market position relative to "{brand}".
5.  **Media Contacts:** Identify 4-5 top-tier journalists or influencers who actively cover this brand AND find the official corporate press contact or newsroom link. For all contacts, you MUST find a relevant URL (e.g., social media profile, newsroom page).
6.  **Market Data:** Find the official stock name, stock ticker, and a summary of its performance. Also, find 12 months of historical closing price data.
Return a comprehensive block of text containing all the raw information, including titles, URLs, snippets, and names you have found for each category."#,
        brand = brand,
        since = lookback_date(today),
        refinement = refinement_clause(refinement),
    )
}

/// Call #2: turn the research text into schema-conformant JSON
pub fn extraction_prompt(brand: &str, research: &str) -> String {
    format!(
        r#"You are a PR intelligence analyst. Based *only* on the following text which contains search results, analyze the brand "{brand}".
Search Results: """{research}"""
Your final output must be a single, valid JSON object that follows the structure below EXACTLY. Ensure all fields are populated from the search results. Sentiment values must sum to 100."#,
        brand = brand,
        research = research,
    )
}

fn string_array() -> Value {
    json!({ "type": "ARRAY", "items": { "type": "STRING" } })
}

fn object_array(fields: &[&str]) -> Value {
    let properties: serde_json::Map<String, Value> = fields
        .iter()
        .map(|f| (f.to_string(), json!({ "type": "STRING" })))
        .collect();
    json!({ "type": "ARRAY", "items": { "type": "OBJECT", "properties": properties } })
}

fn sentiment_score() -> Value {
    json!({
        "type": "OBJECT",
        "properties": { "value": { "type": "NUMBER" }, "summary": { "type": "STRING" } }
    })
}

/// responseSchema for the extraction call, in Gemini's OpenAPI subset
pub fn extraction_schema() -> Value {
    let contact = ["name", "outlet", "beat", "url"];

    json!({
        "type": "OBJECT",
        "properties": {
            "summary": { "type": "STRING" },
            "sentiment": {
                "type": "OBJECT",
                "properties": {
                    "positive": sentiment_score(),
                    "negative": sentiment_score(),
                    "neutral": sentiment_score()
                }
            },
            "themes": string_array(),
            "articles": object_array(&["title", "source", "url", "summary"]),
            "social_discussions": object_array(&["platform", "title", "url", "summary"]),
            "linkedin_snapshot": {
                "type": "OBJECT",
                "properties": {
                    "employee_count": { "type": "STRING" },
                    "hiring_trend": { "type": "STRING", "enum": ["increasing", "decreasing", "stable"] },
                    "key_executives": object_array(&["name", "title"])
                }
            },
            "stock_info": {
                "type": "OBJECT",
                "nullable": true,
                "properties": {
                    "name": { "type": "STRING" },
                    "ticker": { "type": "STRING" },
                    "price": { "type": "STRING" },
                    "change_percent": { "type": "NUMBER" },
                    "summary": { "type": "STRING" },
                    "historical_data": {
                        "type": "ARRAY",
                        "items": {
                            "type": "OBJECT",
                            "properties": { "date": { "type": "STRING" }, "price": { "type": "NUMBER" } }
                        }
                    }
                }
            },
            "competitors": object_array(&["name", "summary"]),
            "pr_insights": {
                "type": "OBJECT",
                "properties": {
                    "swot_analysis": {
                        "type": "OBJECT",
                        "properties": {
                            "strengths": string_array(),
                            "weaknesses": string_array(),
                            "opportunities": string_array(),
                            "threats": string_array()
                        }
                    },
                    "key_media_contacts": {
                        "type": "OBJECT",
                        "properties": {
                            "external": object_array(&contact),
                            "internal": object_array(&contact)
                        }
                    },
                    "suggested_story_angles": string_array()
                }
            }
        },
        "required": [
            "summary", "sentiment", "themes", "articles", "social_discussions",
            "linkedin_snapshot", "stock_info", "competitors", "pr_insights"
        ]
    })
}
