use std::time::Duration;

use crate::{
    error::{BrowserError, PipelineError},
    services::{BrowserSession, SessionLease},
};

/// Loads `link` in an auxiliary tab and returns the visible body text.
///
/// The tab is closed and the original tab made current again whether or not
/// the article could be read. When the tab cannot be opened or closed the
/// lease is discarded, so the session never returns to the pool with a stray
/// tab.
pub async fn fetch_article<S: BrowserSession>(
    lease: &SessionLease<S>,
    link: &str,
    settle: Duration,
) -> Result<String, PipelineError> {
    let failure = |source: BrowserError| PipelineError::FetchFailure {
        link: link.to_string(),
        source,
    };

    let tab = match lease.open_tab().await {
        Ok(tab) => tab,
        Err(e) => {
            lease.discard();
            return Err(failure(e));
        }
    };
    let content = read_article(&**lease, link, settle).await;

    if let Err(e) = lease.close_tab(tab).await {
        log::warn!(
            "Failed to close article tab for {}, retiring its session: {}",
            link,
            e
        );
        lease.discard();
    }

    content.map_err(failure)
}

async fn read_article<S: BrowserSession>(
    session: &S,
    link: &str,
    settle: Duration,
) -> Result<String, BrowserError> {
    session.navigate(link).await?;
    // Let scripts render the article body
    tokio::time::sleep(settle).await;
    session.visible_text().await
}
