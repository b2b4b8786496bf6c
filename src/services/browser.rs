use async_trait::async_trait;

use crate::error::BrowserError;

/// An element on a loaded page.
#[async_trait]
pub trait PageNode: Send + Sync + Sized {
    async fn find_all(&self, selector: &str) -> Result<Vec<Self>, BrowserError>;
    async fn attr(&self, name: &str) -> Result<Option<String>, BrowserError>;
    async fn text(&self) -> Result<String, BrowserError>;
}

/// One automated browser. Callers get exclusive use through a pool lease.
#[async_trait]
pub trait BrowserSession: Send + Sync + Sized + 'static {
    type Node: PageNode;
    type Tab: Send;

    async fn navigate(&self, url: &str) -> Result<(), BrowserError>;
    async fn find_all(&self, selector: &str) -> Result<Vec<Self::Node>, BrowserError>;
    /// Visible text of the current page body.
    async fn visible_text(&self) -> Result<String, BrowserError>;
    /// Opens an auxiliary tab and makes it current.
    async fn open_tab(&self) -> Result<Self::Tab, BrowserError>;
    /// Closes the auxiliary tab and switches back to the tab that opened it.
    async fn close_tab(&self, tab: Self::Tab) -> Result<(), BrowserError>;
    async fn quit(self) -> Result<(), BrowserError>;
}

#[async_trait]
pub trait BrowserBackend: Send + Sync + 'static {
    type Session: BrowserSession;

    async fn open_session(&self) -> Result<Self::Session, BrowserError>;
}
