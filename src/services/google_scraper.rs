use url::Url;

use crate::{
    configuration::SearchSettings,
    domain::SearchHit,
    error::{BrowserError, PipelineError},
    services::{BrowserSession, PageNode},
};

/// News search results page for `query`.
pub fn build_search_url(search: &SearchSettings, query: &str) -> Result<Url, url::ParseError> {
    Url::parse_with_params(
        &search.base_url,
        &[("q", query), ("tbm", search.vertical.as_str())],
    )
}

/// Reads up to `max_items` hits from the results page the session is on.
///
/// Entries without the expected link and field nodes are skipped and do not
/// count towards `max_items`. Candidates past the cap are never read.
pub async fn extract_search_hits<S: BrowserSession>(
    session: &S,
    search: &SearchSettings,
    max_items: usize,
) -> Result<Vec<SearchHit>, BrowserError> {
    let candidates = session.find_all(&search.candidate_selector).await?;
    log::debug!("Found {} result candidates", candidates.len());

    let mut hits = Vec::with_capacity(max_items.min(candidates.len()));
    let mut skipped = 0;

    for candidate in candidates {
        if hits.len() >= max_items {
            break;
        }

        match read_hit(&candidate, search).await {
            Ok(hit) => hits.push(hit),
            Err(e) => {
                skipped += 1;
                log::debug!("Skipping search result: {}", e);
            }
        }
    }

    if skipped > 0 {
        log::info!("Skipped {} malformed search results", skipped);
    }
    Ok(hits)
}

async fn read_hit<N: PageNode>(
    candidate: &N,
    search: &SearchSettings,
) -> Result<SearchHit, PipelineError> {
    let mut link = None;
    for anchor in candidate.find_all(&search.link_selector).await? {
        if let Some(href) = anchor.attr("href").await? {
            link = Some(href);
            break;
        }
    }
    let link = link.ok_or_else(|| {
        PipelineError::ExtractionShapeMismatch("result has no link".to_string())
    })?;

    let fields = candidate.find_all(&search.field_selector).await?;
    let expected = search.required_fields();
    if fields.len() < expected {
        return Err(PipelineError::ExtractionShapeMismatch(format!(
            "{} field nodes, expected at least {}",
            fields.len(),
            expected
        )));
    }

    Ok(SearchHit {
        link,
        domain: fields[search.domain_field].text().await?,
        title: fields[search.title_field].text().await?,
        description: fields[search.description_field].text().await?,
        date: fields[search.date_field].text().await?,
    })
}
