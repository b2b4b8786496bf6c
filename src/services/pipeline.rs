use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use tokio::{sync::Semaphore, task::JoinSet};

use crate::{
    configuration::{SearchSettings, Settings},
    domain::{AnalysisResult, NewsItem, OrganizationTask, SearchHit},
    error::PipelineError,
    services::{
        aggregator, build_search_url, extract_search_hits, fetch_article, Analyser, ApiKeyPool,
        BrowserBackend, BrowserSession, ChatEndpoint, DroidFactory, OpenaiClient,
        ProgressTracker, SessionPool,
    },
};

/// Whole-run cancellation. Tasks check it before they start browsing.
#[derive(Debug, Clone, Default)]
pub struct RunControl {
    cancelled: Arc<AtomicBool>,
}

impl RunControl {
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub max_items: usize,
    pub settle: Duration,
    pub search: SearchSettings,
    pub analysis_concurrency: Option<usize>,
}

impl PipelineOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        PipelineOptions {
            max_items: settings.pipeline.max_items_per_organization,
            settle: settings.browser.settle(),
            search: settings.search.clone(),
            analysis_concurrency: settings.pipeline.analysis_concurrency,
        }
    }
}

/// Runs one task per organization: search, extract, then fetch and analyze
/// every item in order while holding a single session lease.
pub struct Pipeline<B: BrowserBackend, E: ChatEndpoint> {
    sessions: Arc<SessionPool<B>>,
    analyser: Arc<Analyser<E>>,
    options: Arc<PipelineOptions>,
    analysis_gate: Option<Arc<Semaphore>>,
    control: RunControl,
}

impl<B: BrowserBackend, E: ChatEndpoint> Clone for Pipeline<B, E> {
    fn clone(&self) -> Self {
        Pipeline {
            sessions: self.sessions.clone(),
            analyser: self.analyser.clone(),
            options: self.options.clone(),
            analysis_gate: self.analysis_gate.clone(),
            control: self.control.clone(),
        }
    }
}

impl<B: BrowserBackend, E: ChatEndpoint> Pipeline<B, E> {
    pub fn new(sessions: SessionPool<B>, analyser: Analyser<E>, options: PipelineOptions) -> Self {
        let analysis_gate = options
            .analysis_concurrency
            .map(|permits| Arc::new(Semaphore::new(permits)));

        Pipeline {
            sessions: Arc::new(sessions),
            analyser: Arc::new(analyser),
            options: Arc::new(options),
            analysis_gate,
            control: RunControl::default(),
        }
    }

    pub fn with_control(mut self, control: RunControl) -> Self {
        self.control = control;
        self
    }

    /// Processes every organization and returns the flattened items in task
    /// completion order.
    pub async fn run(
        &self,
        organizations: Vec<OrganizationTask>,
        progress: &ProgressTracker,
    ) -> Vec<NewsItem> {
        log::info!(
            "Starting news run for {} organizations with {} browser sessions",
            organizations.len(),
            self.sessions.capacity()
        );

        let mut tasks = JoinSet::new();
        for organization in organizations {
            if self.control.is_cancelled() {
                log::warn!("Run cancelled, not starting {}", organization.name);
                progress.complete_one();
                continue;
            }

            let pipeline = self.clone();
            tasks.spawn(async move { pipeline.process_organization(organization).await });
        }

        let mut per_organization = Vec::with_capacity(tasks.len());
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(items) => per_organization.push(items),
                Err(e) => log::error!("Organization task failed to complete: {}", e),
            }
            progress.complete_one();
        }

        let items = aggregator::flatten(per_organization);
        log::info!("News run finished with {} items", items.len());
        items
    }

    /// Never fails: a lost session yields an empty list, a lost article or
    /// analysis yields a sentineled item.
    pub async fn process_organization(&self, organization: OrganizationTask) -> Vec<NewsItem> {
        if self.control.is_cancelled() {
            return Vec::new();
        }
        log::info!("Waiting for a browser session for {}", organization.name);

        let lease = match self.sessions.acquire().await {
            Ok(lease) => lease,
            Err(e) => {
                log::error!("Skipping {}: {}", organization.name, e);
                return Vec::new();
            }
        };

        if self.control.is_cancelled() {
            return Vec::new();
        }
        log::info!("Searching news for {}", organization.name);

        let hits = match self.search(&*lease, &organization.name).await {
            Ok(hits) => hits,
            Err(e) => {
                log::error!("Search failed for {}: {}", organization.name, e);
                if matches!(e, PipelineError::Browser(_)) {
                    lease.discard();
                }
                return Vec::new();
            }
        };
        log::info!("Found {} news items for {}", hits.len(), organization.name);

        let mut items = Vec::with_capacity(hits.len());
        for hit in hits {
            let mut item = NewsItem::from_hit(hit, &organization);

            match fetch_article(&lease, &item.link, self.options.settle).await {
                Ok(content) => item.full_content = Some(content),
                Err(e) => log::warn!("{}", e),
            }

            if let Some(input) = item.analysis_input() {
                item.analysis = self.analyze(&input).await;
            }

            items.push(item);
        }

        self.sessions.release(lease);
        items
    }

    async fn search(
        &self,
        session: &B::Session,
        organization: &str,
    ) -> Result<Vec<SearchHit>, PipelineError> {
        let url = build_search_url(&self.options.search, organization)?;
        session.navigate(url.as_str()).await?;

        let hits =
            extract_search_hits(session, &self.options.search, self.options.max_items).await?;
        Ok(hits)
    }

    async fn analyze(&self, input: &str) -> Option<AnalysisResult> {
        let _permit = match &self.analysis_gate {
            Some(gate) => gate.acquire().await.ok(),
            None => None,
        };

        match self.analyser.analyze(input).await {
            Ok(result) => Some(result),
            Err(e) => {
                log::warn!("Analysis failed: {}", e);
                None
            }
        }
    }

    pub async fn shutdown(&self) {
        self.sessions.shutdown().await;
    }
}

/// Builds both pools and the pipeline around the given collaborators, runs
/// it and shuts the session pool down.
///
/// Fails only when a pool cannot be built.
pub async fn run_with<B, E>(
    backend: B,
    endpoint: E,
    settings: &Settings,
    organizations: Vec<OrganizationTask>,
    progress: &ProgressTracker,
    control: RunControl,
) -> Result<Vec<NewsItem>, PipelineError>
where
    B: BrowserBackend,
    E: ChatEndpoint,
{
    let keys = ApiKeyPool::new(settings.analysis.api_keys.iter().cloned())?;
    let sessions = SessionPool::new(backend, settings.browser.pool_size)?;
    let analyser = Analyser::new(endpoint, keys, settings.analysis.max_input_words);

    let pipeline = Pipeline::new(sessions, analyser, PipelineOptions::from_settings(settings))
        .with_control(control);

    let items = pipeline.run(organizations, progress).await;
    pipeline.shutdown().await;
    Ok(items)
}

/// Runs the pipeline against Chrome and the configured chat endpoint.
pub async fn execute_run(
    settings: &Settings,
    organizations: Vec<OrganizationTask>,
    progress: &ProgressTracker,
    control: RunControl,
) -> Result<Vec<NewsItem>, PipelineError> {
    run_with(
        DroidFactory::new(&settings.browser),
        OpenaiClient::new(&settings.analysis),
        settings,
        organizations,
        progress,
        control,
    )
    .await
}
