use async_trait::async_trait;
use thirtyfour::{
    By, ChromiumLikeCapabilities, DesiredCapabilities, WebDriver, WebElement, WindowHandle,
};

use crate::{
    configuration::BrowserSettings,
    error::BrowserError,
    services::{BrowserBackend, BrowserSession, PageNode},
};

/// Launches Chrome sessions through a WebDriver server.
pub struct DroidFactory {
    webdriver_url: String,
    headless: bool,
}

impl DroidFactory {
    pub fn new(settings: &BrowserSettings) -> Self {
        DroidFactory {
            webdriver_url: settings.webdriver_url.clone(),
            headless: settings.headless,
        }
    }
}

pub struct Droid {
    pub driver: WebDriver,
}

pub struct DroidTab {
    origin: WindowHandle,
}

#[async_trait]
impl BrowserBackend for DroidFactory {
    type Session = Droid;

    async fn open_session(&self) -> Result<Droid, BrowserError> {
        let mut caps = DesiredCapabilities::chrome();
        if self.headless {
            caps.set_headless()?;
            caps.set_no_sandbox()?;
            caps.set_disable_dev_shm_usage()?;
        }

        let driver = WebDriver::new(self.webdriver_url.as_str(), caps).await?;
        driver.maximize_window().await?;
        log::info!("Opened browser session on {}", self.webdriver_url);

        Ok(Droid { driver })
    }
}

#[async_trait]
impl BrowserSession for Droid {
    type Node = WebElement;
    type Tab = DroidTab;

    async fn navigate(&self, url: &str) -> Result<(), BrowserError> {
        self.driver.goto(url).await?;
        Ok(())
    }

    async fn find_all(&self, selector: &str) -> Result<Vec<WebElement>, BrowserError> {
        Ok(self.driver.find_all(By::Css(selector.to_string())).await?)
    }

    async fn visible_text(&self) -> Result<String, BrowserError> {
        let body = self.driver.find(By::Tag("body")).await?;
        Ok(body.text().await?)
    }

    async fn open_tab(&self) -> Result<DroidTab, BrowserError> {
        let origin = self.driver.window().await?;
        let handle = self.driver.new_tab().await?;
        if let Err(e) = self.driver.switch_to_window(handle).await {
            // The new tab stays open; the caller retires the whole session
            if let Err(back) = self.driver.switch_to_window(origin).await {
                log::warn!("Failed to return to the original tab: {}", back);
            }
            return Err(e.into());
        }

        Ok(DroidTab { origin })
    }

    async fn close_tab(&self, tab: DroidTab) -> Result<(), BrowserError> {
        let closed = self.driver.close_window().await;
        // Switch back even if closing failed
        self.driver.switch_to_window(tab.origin).await?;
        closed?;
        Ok(())
    }

    async fn quit(self) -> Result<(), BrowserError> {
        self.driver.quit().await?;
        Ok(())
    }
}

#[async_trait]
impl PageNode for WebElement {
    async fn find_all(&self, selector: &str) -> Result<Vec<WebElement>, BrowserError> {
        Ok(WebElement::find_all(self, By::Css(selector.to_string())).await?)
    }

    async fn attr(&self, name: &str) -> Result<Option<String>, BrowserError> {
        Ok(WebElement::attr(self, name).await?)
    }

    async fn text(&self) -> Result<String, BrowserError> {
        Ok(WebElement::text(self).await?)
    }
}
