#![allow(dead_code)]

use std::{
    collections::{HashMap, HashSet},
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use async_trait::async_trait;
use herald::{
    configuration::{
        AnalysisSettings, ApplicationSettings, BrowserSettings, PipelineSettings, SearchSettings,
        Settings,
    },
    error::{BrowserError, PipelineError},
    services::{build_search_url, BrowserBackend, BrowserSession, ChatEndpoint, PageNode},
};

pub const WELL_FORMED_REPLY: &str = "['Positive','Funding','Yes']";

pub fn test_settings(pool_size: usize, max_items: usize, api_keys: &[&str]) -> Settings {
    Settings {
        application: ApplicationSettings {
            port: 0,
            host: "127.0.0.1".to_string(),
        },
        browser: BrowserSettings {
            webdriver_url: "http://localhost:9515".to_string(),
            headless: true,
            pool_size,
            settle_millis: 0,
        },
        search: SearchSettings::default(),
        pipeline: PipelineSettings {
            max_items_per_organization: max_items,
            analysis_concurrency: None,
            output_path: "news_data.csv".to_string(),
        },
        analysis: AnalysisSettings {
            api_base: "http://localhost:1/v1".to_string(),
            model: "test-model".to_string(),
            max_output_tokens: 8192,
            temperature: 1.0,
            top_p: 0.95,
            max_input_words: 50_000,
            api_keys: api_keys.iter().map(|k| k.to_string()).collect(),
        },
    }
}

pub fn article_link(organization: &str, n: usize) -> String {
    format!("https://news.test/{}/{}", organization.to_lowercase(), n)
}

pub fn article_title(organization: &str, n: usize) -> String {
    format!("{} story {}", organization, n)
}

/// An element of a fake page. Children are looked up by the exact selector.
#[derive(Debug, Clone, Default)]
pub struct FakeNode {
    text: String,
    attrs: HashMap<String, String>,
    children: HashMap<String, Vec<FakeNode>>,
}

impl FakeNode {
    fn text(text: &str) -> Self {
        FakeNode {
            text: text.to_string(),
            ..Default::default()
        }
    }

    fn anchor(href: &str) -> Self {
        FakeNode {
            attrs: HashMap::from([("href".to_string(), href.to_string())]),
            ..Default::default()
        }
    }

    /// A news result laid out like a live results page.
    pub fn search_result(organization: &str, n: usize) -> Self {
        let search = SearchSettings::default();
        let fields = vec![
            FakeNode::text(""),
            FakeNode::text("News Test"),
            FakeNode::text(&article_title(organization, n)),
            FakeNode::text(&format!("What happened at {}", organization)),
            FakeNode::text(&format!("{} days ago", n)),
        ];

        FakeNode {
            children: HashMap::from([
                (
                    search.link_selector,
                    vec![FakeNode::anchor(&article_link(organization, n))],
                ),
                (search.field_selector, fields),
            ]),
            ..Default::default()
        }
    }

    /// A result block without the title and date fields, like an ad.
    pub fn truncated_result(organization: &str) -> Self {
        let search = SearchSettings::default();

        FakeNode {
            children: HashMap::from([
                (
                    search.link_selector,
                    vec![FakeNode::anchor(&format!(
                        "https://ads.test/{}",
                        organization.to_lowercase()
                    ))],
                ),
                (
                    search.field_selector,
                    vec![FakeNode::text(""), FakeNode::text("Sponsored")],
                ),
            ]),
            ..Default::default()
        }
    }
}

#[async_trait]
impl PageNode for FakeNode {
    async fn find_all(&self, selector: &str) -> Result<Vec<FakeNode>, BrowserError> {
        Ok(self.children.get(selector).cloned().unwrap_or_default())
    }

    async fn attr(&self, name: &str) -> Result<Option<String>, BrowserError> {
        Ok(self.attrs.get(name).cloned())
    }

    async fn text(&self) -> Result<String, BrowserError> {
        Ok(self.text.clone())
    }
}

#[derive(Default)]
struct Pages {
    search_results: HashMap<String, Vec<FakeNode>>,
    articles: HashMap<String, String>,
    broken_links: HashSet<String>,
}

#[derive(Default)]
struct Stats {
    refuse_sessions: AtomicUsize,
    sessions_opened: AtomicUsize,
    sessions_quit: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    overlapping_use: AtomicUsize,
    next_id: AtomicUsize,
    failing_tab_close: AtomicBool,
    stray_tabs_at_search: Mutex<Vec<usize>>,
}

/// Browser backend serving canned search and article pages.
#[derive(Clone, Default)]
pub struct FakeWeb {
    pages: Arc<Mutex<Pages>>,
    stats: Arc<Stats>,
    delay: Duration,
}

impl FakeWeb {
    pub fn new() -> Self {
        Self::default()
    }

    /// Each browser operation takes `delay`, so concurrent leases overlap.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_results(self, organization: &str, results: Vec<FakeNode>) -> Self {
        let url = build_search_url(&SearchSettings::default(), organization)
            .expect("valid search url")
            .to_string();
        self.pages.lock().unwrap().search_results.insert(url, results);
        self
    }

    /// `count` well formed results for `organization`, each with an article.
    pub fn with_organization(self, organization: &str, count: usize) -> Self {
        let results = (1..=count)
            .map(|n| FakeNode::search_result(organization, n))
            .collect();
        let web = self.with_results(organization, results);
        for n in 1..=count {
            web.add_article(
                &article_link(organization, n),
                &format!("Body of {} article {}", organization, n),
            );
        }
        web
    }

    pub fn add_article(&self, link: &str, body: &str) {
        self.pages
            .lock()
            .unwrap()
            .articles
            .insert(link.to_string(), body.to_string());
    }

    pub fn break_link(&self, link: &str) {
        self.pages
            .lock()
            .unwrap()
            .broken_links
            .insert(link.to_string());
    }

    /// The next `count` session opens fail.
    pub fn refuse_sessions(&self, count: usize) {
        self.stats.refuse_sessions.store(count, Ordering::SeqCst);
    }

    /// Closing an auxiliary tab fails and leaves the tab open.
    pub fn fail_tab_close(&self) {
        self.stats.failing_tab_close.store(true, Ordering::SeqCst);
    }

    /// Auxiliary tabs already open each time a results page was read.
    pub fn stray_tabs_at_search(&self) -> Vec<usize> {
        self.stats.stray_tabs_at_search.lock().unwrap().clone()
    }

    pub fn sessions_opened(&self) -> usize {
        self.stats.sessions_opened.load(Ordering::SeqCst)
    }

    pub fn sessions_quit(&self) -> usize {
        self.stats.sessions_quit.load(Ordering::SeqCst)
    }

    /// Most browser operations seen running at the same time.
    pub fn max_in_flight(&self) -> usize {
        self.stats.max_in_flight.load(Ordering::SeqCst)
    }

    /// Times a session was used by two callers at once.
    pub fn overlapping_use(&self) -> usize {
        self.stats.overlapping_use.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BrowserBackend for FakeWeb {
    type Session = FakeSession;

    async fn open_session(&self) -> Result<FakeSession, BrowserError> {
        let refused = self
            .stats
            .refuse_sessions
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if refused {
            return Err(BrowserError::Backend("chromedriver not reachable".to_string()));
        }

        self.stats.sessions_opened.fetch_add(1, Ordering::SeqCst);
        Ok(FakeSession {
            id: self.stats.next_id.fetch_add(1, Ordering::SeqCst),
            web: self.clone(),
            tabs: Mutex::new(vec!["about:blank".to_string()]),
            busy: AtomicBool::new(false),
        })
    }
}

pub struct FakeSession {
    id: usize,
    web: FakeWeb,
    tabs: Mutex<Vec<String>>,
    busy: AtomicBool,
}

struct Operation<'a> {
    session: &'a FakeSession,
    owns_busy: bool,
}

impl Drop for Operation<'_> {
    fn drop(&mut self) {
        self.session.web.stats.in_flight.fetch_sub(1, Ordering::SeqCst);
        if self.owns_busy {
            self.session.busy.store(false, Ordering::SeqCst);
        }
    }
}

impl FakeSession {
    async fn begin(&self) -> Operation<'_> {
        let stats = &self.web.stats;
        let owns_busy = !self.busy.swap(true, Ordering::SeqCst);
        if !owns_busy {
            stats.overlapping_use.fetch_add(1, Ordering::SeqCst);
        }

        let now = stats.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        stats.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let operation = Operation {
            session: self,
            owns_busy,
        };
        if !self.web.delay.is_zero() {
            tokio::time::sleep(self.web.delay).await;
        }
        operation
    }

    fn current_url(&self) -> String {
        self.tabs.lock().unwrap().last().cloned().unwrap_or_default()
    }
}

#[async_trait]
impl BrowserSession for FakeSession {
    type Node = FakeNode;
    type Tab = usize;

    async fn navigate(&self, url: &str) -> Result<(), BrowserError> {
        let _op = self.begin().await;
        if self.web.pages.lock().unwrap().broken_links.contains(url) {
            return Err(BrowserError::Backend(format!("timeout loading {}", url)));
        }

        if let Some(current) = self.tabs.lock().unwrap().last_mut() {
            *current = url.to_string();
        }
        Ok(())
    }

    async fn find_all(&self, selector: &str) -> Result<Vec<FakeNode>, BrowserError> {
        let _op = self.begin().await;
        if selector != SearchSettings::default().candidate_selector {
            return Ok(vec![]);
        }

        let stray = self.tabs.lock().unwrap().len() - 1;
        self.web.stats.stray_tabs_at_search.lock().unwrap().push(stray);

        let url = self.current_url();
        Ok(self
            .web
            .pages
            .lock()
            .unwrap()
            .search_results
            .get(&url)
            .cloned()
            .unwrap_or_default())
    }

    async fn visible_text(&self) -> Result<String, BrowserError> {
        let _op = self.begin().await;
        let url = self.current_url();
        self.web
            .pages
            .lock()
            .unwrap()
            .articles
            .get(&url)
            .cloned()
            .ok_or_else(|| BrowserError::Backend(format!("no body on {}", url)))
    }

    async fn open_tab(&self) -> Result<usize, BrowserError> {
        let _op = self.begin().await;
        let mut tabs = self.tabs.lock().unwrap();
        tabs.push("about:blank".to_string());
        Ok(tabs.len() - 1)
    }

    async fn close_tab(&self, tab: usize) -> Result<(), BrowserError> {
        let _op = self.begin().await;
        if self.web.stats.failing_tab_close.load(Ordering::SeqCst) {
            return Err(BrowserError::Backend("no such window".to_string()));
        }
        let mut tabs = self.tabs.lock().unwrap();
        if tab == 0 || tab != tabs.len() - 1 {
            return Err(BrowserError::Backend(format!(
                "session {} has no auxiliary tab {}",
                self.id, tab
            )));
        }
        tabs.pop();
        Ok(())
    }

    async fn quit(self) -> Result<(), BrowserError> {
        self.web.stats.sessions_quit.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Default)]
struct EndpointState {
    reply: Option<String>,
    delay: Duration,
    keys: Mutex<Vec<String>>,
    prompts: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

/// Chat endpoint returning one canned reply, or unreachable when it has none.
#[derive(Clone, Default)]
pub struct ScriptedEndpoint {
    state: Arc<EndpointState>,
}

impl ScriptedEndpoint {
    pub fn replying(reply: &str) -> Self {
        Self::build(Some(reply.to_string()), Duration::ZERO)
    }

    pub fn unreachable() -> Self {
        Self::build(None, Duration::ZERO)
    }

    pub fn slow(reply: &str, delay: Duration) -> Self {
        Self::build(Some(reply.to_string()), delay)
    }

    fn build(reply: Option<String>, delay: Duration) -> Self {
        ScriptedEndpoint {
            state: Arc::new(EndpointState {
                reply,
                delay,
                ..Default::default()
            }),
        }
    }

    pub fn keys_used(&self) -> Vec<String> {
        self.state.keys.lock().unwrap().clone()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.state.prompts.lock().unwrap().clone()
    }

    pub fn max_in_flight(&self) -> usize {
        self.state.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChatEndpoint for ScriptedEndpoint {
    async fn complete(&self, prompt: &str, api_key: &str) -> Result<String, PipelineError> {
        let state = &self.state;
        state.keys.lock().unwrap().push(api_key.to_string());
        state.prompts.lock().unwrap().push(prompt.to_string());

        let now = state.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        state.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if !state.delay.is_zero() {
            tokio::time::sleep(state.delay).await;
        }
        state.in_flight.fetch_sub(1, Ordering::SeqCst);

        state
            .reply
            .clone()
            .ok_or_else(|| PipelineError::AnalysisUnavailable("connection refused".to_string()))
    }
}
