//! Dashboard view-model
//!
//! `render` is a pure function of the orchestrator state. The desktop shell
//! serializes the result to the webview; nothing here mutates state.

use crate::orchestrator::{Phase, ReportState};
use crate::report::{
    Article, Competitor, CorporateSnapshot, HiringTrend, MediaContact, Report, SocialDiscussion, StockInfo, Swot,
};
use chrono::NaiveDate;
use serde::Serialize;

pub const NO_MARKET_DATA: &str = "Market data not available. This may be a private company.";

const POSITIVE_COLOR: &str = "rgb(34, 197, 94)";
const NEGATIVE_COLOR: &str = "rgb(239, 68, 68)";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Up,
    Down,
    Flat,
}

impl Trend {
    pub fn from_change(change_percent: f64) -> Self {
        if change_percent > 0.0 {
            Trend::Up
        } else if change_percent < 0.0 {
            Trend::Down
        } else {
            Trend::Flat
        }
    }

    pub fn from_hiring(trend: HiringTrend) -> Self {
        match trend {
            HiringTrend::Increasing => Trend::Up,
            HiringTrend::Decreasing => Trend::Down,
            HiringTrend::Stable => Trend::Flat,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlatformIcon {
    Reddit,
    Youtube,
    Instagram,
    Linkedin,
    Twitter,
    Other,
}

impl PlatformIcon {
    pub fn from_platform(platform: &str) -> Self {
        match platform.trim().to_lowercase().as_str() {
            "reddit" => PlatformIcon::Reddit,
            "youtube" => PlatformIcon::Youtube,
            "instagram" => PlatformIcon::Instagram,
            "linkedin" => PlatformIcon::Linkedin,
            "twitter" => PlatformIcon::Twitter,
            _ => PlatformIcon::Other,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SentimentSegment {
    pub label: &'static str,
    pub percent: f64,
    pub summary: String,
}

/// A list slice with a "Load More" affordance
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: usize,
    pub has_more: bool,
}

impl<T: Clone> Page<T> {
    fn slice(all: &[T], visible: usize) -> Self {
        Self {
            items: all.iter().take(visible).cloned().collect(),
            total: all.len(),
            has_more: all.len() > visible,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SocialItem {
    pub icon: PlatformIcon,
    #[serde(flatten)]
    pub post: SocialDiscussion,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompetitorItem {
    pub action_label: String,
    #[serde(flatten)]
    pub competitor: Competitor,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorporateView {
    pub hiring_icon: Trend,
    #[serde(flatten)]
    pub snapshot: CorporateSnapshot,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSeries {
    pub labels: Vec<String>,
    pub prices: Vec<f64>,
    pub color: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MarketView {
    Listed {
        heading: String,
        price: String,
        change_label: String,
        trend: Trend,
        chart: Option<ChartSeries>,
        summary: String,
    },
    Unavailable {
        message: &'static str,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InsightsView {
    pub swot: Swot,
    pub internal_contacts: Vec<MediaContact>,
    pub external_contacts: Vec<MediaContact>,
    pub story_angles: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportView {
    pub title: String,
    pub summary: String,
    pub insights: InsightsView,
    pub sentiment: Vec<SentimentSegment>,
    pub themes: Vec<String>,
    pub articles: Page<Article>,
    pub social: Page<SocialItem>,
    pub competitors: Vec<CompetitorItem>,
    pub corporate: CorporateView,
    pub market: MarketView,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmptyView {
    pub heading: &'static str,
    pub hint: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardView {
    pub phase: Phase,
    pub loading: bool,
    pub brand: String,
    pub error: Option<String>,
    pub report: Option<ReportView>,
    /// Shown when there is neither a report nor a request in flight
    pub empty: Option<EmptyView>,
}

/// "Jan 24" style axis label; unparseable dates pass through untouched
fn chart_label(date: &str) -> String {
    let parsed = NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(date, "%Y-%m"))
        .or_else(|_| NaiveDate::parse_from_str(&format!("{}-01", date), "%Y-%m-%d"));
    match parsed {
        Ok(d) => d.format("%b %y").to_string(),
        Err(_) => date.to_string(),
    }
}

fn market_view(stock: Option<&StockInfo>) -> MarketView {
    let Some(stock) = stock else {
        return MarketView::Unavailable { message: NO_MARKET_DATA };
    };

    let chart = (!stock.historical_data.is_empty()).then(|| ChartSeries {
        labels: stock.historical_data.iter().map(|p| chart_label(&p.date)).collect(),
        prices: stock.historical_data.iter().map(|p| p.price).collect(),
        color: if stock.change_percent >= 0.0 { POSITIVE_COLOR } else { NEGATIVE_COLOR },
    });

    MarketView::Listed {
        heading: format!("{} ({})", stock.name, stock.ticker),
        price: stock.price.clone(),
        change_label: format!("{}% Today", stock.change_percent),
        trend: Trend::from_change(stock.change_percent),
        chart,
        summary: stock.summary.clone(),
    }
}

fn report_view(brand: &str, report: &Report, state: &ReportState) -> ReportView {
    let sentiment = &report.sentiment;
    ReportView {
        title: format!("AI Summary for {}", brand),
        summary: report.summary.clone(),
        insights: InsightsView {
            swot: report.insights.swot_analysis.clone(),
            internal_contacts: report.insights.key_media_contacts.internal.clone(),
            external_contacts: report.insights.key_media_contacts.external.clone(),
            story_angles: report.insights.suggested_story_angles.clone(),
        },
        sentiment: vec![
            SentimentSegment { label: "Positive", percent: sentiment.positive.value, summary: sentiment.positive.summary.clone() },
            SentimentSegment { label: "Negative", percent: sentiment.negative.value, summary: sentiment.negative.summary.clone() },
            SentimentSegment { label: "Neutral", percent: sentiment.neutral.value, summary: sentiment.neutral.summary.clone() },
        ],
        themes: report.themes.clone(),
        articles: Page::slice(&report.articles, state.pagination.visible_articles),
        social: {
            let items: Vec<SocialItem> = report
                .social_discussions
                .iter()
                .map(|post| SocialItem { icon: PlatformIcon::from_platform(&post.platform), post: post.clone() })
                .collect();
            Page::slice(&items, state.pagination.visible_social)
        },
        competitors: report
            .competitors
            .iter()
            .map(|c| CompetitorItem { action_label: format!("Analyze {}", c.name), competitor: c.clone() })
            .collect(),
        corporate: CorporateView {
            hiring_icon: Trend::from_hiring(report.corporate_snapshot.hiring_trend),
            snapshot: report.corporate_snapshot.clone(),
        },
        market: market_view(report.stock_info.as_ref()),
    }
}

pub fn render(state: &ReportState, key_saved: bool) -> DashboardView {
    let loading = state.phase.is_loading();
    let report = state.report.as_ref().map(|r| report_view(&state.brand, r, state));

    let empty = (report.is_none() && !loading).then(|| EmptyView {
        heading: "Analysis will appear here",
        hint: if key_saved {
            "Enter a brand name to start."
        } else {
            "Please save your API key to enable analysis."
        },
    });

    DashboardView {
        phase: state.phase,
        loading,
        brand: state.brand.clone(),
        error: state.error.clone(),
        report,
        empty,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestrator::{reduce, Event};
    use crate::report::fixtures::SAMPLE_REPORT_JSON;

    fn ready(report: Report) -> ReportState {
        let state = reduce(ReportState::default(), Event::Started { brand: "Samsung".into(), refinement: None });
        let state = reduce(state, Event::ResearchCompleted);
        reduce(state, Event::Completed(report))
    }

    fn sample() -> Report {
        Report::parse(SAMPLE_REPORT_JSON).unwrap()
    }

    #[test]
    fn test_empty_state_hints() {
        let idle = ReportState::default();
        assert_eq!(render(&idle, true).empty.unwrap().hint, "Enter a brand name to start.");
        assert_eq!(render(&idle, false).empty.unwrap().hint, "Please save your API key to enable analysis.");
    }

    #[test]
    fn test_loading_hides_empty_state() {
        let state = reduce(ReportState::default(), Event::Started { brand: "Samsung".into(), refinement: None });
        let view = render(&state, true);
        assert!(view.loading);
        assert!(view.empty.is_none());
        assert!(view.report.is_none());
    }

    #[test]
    fn test_failed_state_shows_error_only() {
        let state = reduce(ReportState::default(), Event::Started { brand: "Samsung".into(), refinement: None });
        let state = reduce(state, Event::Failed("Analysis failed. Please try again. Error: boom".into()));
        let view = render(&state, true);
        assert!(!view.loading);
        assert!(view.report.is_none());
        assert!(view.error.unwrap().contains("boom"));
    }

    #[test]
    fn test_report_sections() {
        let view = render(&ready(sample()), true);
        let report = view.report.unwrap();

        assert_eq!(report.title, "AI Summary for Samsung");
        assert_eq!(report.sentiment.iter().map(|s| s.percent).sum::<f64>(), 100.0);
        assert_eq!(report.sentiment[1].label, "Negative");
        assert_eq!(report.social.items[0].icon, PlatformIcon::Reddit);
        assert_eq!(report.social.items[1].icon, PlatformIcon::Youtube);
        assert_eq!(report.competitors[0].action_label, "Analyze Apple");
        assert_eq!(report.corporate.hiring_icon, Trend::Flat);
        assert_eq!(report.insights.internal_contacts[0].name, "Samsung Newsroom");
        assert!(!report.articles.has_more);
    }

    #[test]
    fn test_market_view_listed() {
        let view = render(&ready(sample()), true);
        match view.report.unwrap().market {
            MarketView::Listed { heading, change_label, trend, chart, .. } => {
                assert_eq!(heading, "Samsung Electronics (005930.KS)");
                assert_eq!(change_label, "-1.2% Today");
                assert_eq!(trend, Trend::Down);
                let chart = chart.unwrap();
                assert_eq!(chart.labels, vec!["Jan 24", "Feb 24"]);
                assert_eq!(chart.color, NEGATIVE_COLOR);
            }
            other => panic!("expected listed market view, got {:?}", other),
        }
    }

    #[test]
    fn test_market_view_private_company() {
        let mut report = sample();
        report.stock_info = None;
        let view = render(&ready(report), true);
        assert_eq!(
            view.report.unwrap().market,
            MarketView::Unavailable { message: NO_MARKET_DATA }
        );
    }

    #[test]
    fn test_article_page_and_load_more() {
        let mut report = sample();
        let article = report.articles[0].clone();
        report.articles = vec![article; 10];

        let state = ready(report);
        let page = render(&state, true).report.unwrap().articles;
        assert_eq!(page.items.len(), 7);
        assert_eq!(page.total, 10);
        assert!(page.has_more);

        let state = reduce(state, Event::LoadMoreArticles);
        let page = render(&state, true).report.unwrap().articles;
        assert_eq!(page.items.len(), 10);
        assert!(!page.has_more);
    }

    #[test]
    fn test_platform_icons() {
        assert_eq!(PlatformIcon::from_platform("LinkedIn"), PlatformIcon::Linkedin);
        assert_eq!(PlatformIcon::from_platform(" Twitter "), PlatformIcon::Twitter);
        assert_eq!(PlatformIcon::from_platform("Mastodon"), PlatformIcon::Other);
    }

    #[test]
    fn test_chart_labels() {
        assert_eq!(chart_label("2024-03-15"), "Mar 24");
        assert_eq!(chart_label("2023-11"), "Nov 23");
        assert_eq!(chart_label("last week"), "last week");
    }

    #[test]
    fn test_trend_from_change() {
        assert_eq!(Trend::from_change(0.4), Trend::Up);
        assert_eq!(Trend::from_change(0.0), Trend::Flat);
        assert_eq!(Trend::from_hiring(HiringTrend::Increasing), Trend::Up);
    }

    #[test]
    fn test_serialized_dashboard_shape() {
        let json = serde_json::to_value(render(&ready(sample()), true)).unwrap();
        let report = &json["report"];

        assert_eq!(report["themes"].as_array().unwrap().len(), 3);
        assert_eq!(report["corporate"]["employee_count"], "260,000+");
        assert_eq!(report["corporate"]["hiring_trend"], "stable");
        assert_eq!(report["corporate"]["hiring_icon"], "flat");
        assert_eq!(report["corporate"]["key_executives"][0]["title"], "CEO");
        assert_eq!(report["market"]["kind"], "listed");
        assert_eq!(report["market"]["trend"], "down");
        assert_eq!(report["market"]["chart"]["color"], "rgb(239, 68, 68)");
        assert!(report["insights"]["swot"]["strengths"].is_array());
        assert_eq!(report["insights"]["internal_contacts"][0]["name"], "Samsung Newsroom");
        assert_eq!(report["insights"]["external_contacts"][0]["outlet"], "Bloomberg");
        assert_eq!(report["insights"]["story_angles"][0], "AI on every device");
        assert_eq!(report["competitors"][0]["action_label"], "Analyze Apple");
        assert_eq!(report["social"]["items"][0]["icon"], "reddit");
    }
}
