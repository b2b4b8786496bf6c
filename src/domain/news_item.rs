use crate::domain::{AnalysisResult, OrganizationTask};

/// Written in place of content or analysis that could not be obtained.
pub const NOT_AVAILABLE: &str = "N/A";

/// Search metadata read from one result entry, before any article fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    pub link: String,
    pub domain: String,
    pub title: String,
    pub description: String,
    pub date: String,
}

/// One news mention for an organization.
///
/// `full_content` and `analysis` stay `None` when fetching or analysis
/// failed; the item is still reported.
#[derive(Debug, Clone, PartialEq)]
pub struct NewsItem {
    pub link: String,
    pub domain: String,
    pub title: String,
    pub description: String,
    pub date: String,
    pub full_content: Option<String>,
    pub analysis: Option<AnalysisResult>,
    pub organization: String,
    pub homepage_url: String,
    pub contact_url: String,
}

impl NewsItem {
    pub fn from_hit(hit: SearchHit, organization: &OrganizationTask) -> Self {
        NewsItem {
            link: hit.link,
            domain: hit.domain,
            title: hit.title,
            description: hit.description,
            date: hit.date,
            full_content: None,
            analysis: None,
            organization: organization.name.clone(),
            homepage_url: organization.homepage_url.clone(),
            contact_url: organization.contact_url.clone(),
        }
    }

    /// Title and article body as sent for analysis.
    pub fn analysis_input(&self) -> Option<String> {
        self.full_content
            .as_ref()
            .map(|content| format!("{} {}", self.title, content))
    }

    pub fn content_or_sentinel(&self) -> &str {
        self.full_content.as_deref().unwrap_or(NOT_AVAILABLE)
    }

    pub fn analysis_or_sentinel(&self) -> String {
        self.analysis
            .as_ref()
            .map(|a| a.to_string())
            .unwrap_or_else(|| NOT_AVAILABLE.to_string())
    }
}
