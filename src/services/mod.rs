pub mod aggregator;
pub mod analyser;
pub mod article_fetcher;
pub mod browser;
pub mod droid;
pub mod exporter;
pub mod google_scraper;
pub mod key_pool;
pub mod openai_client;
pub mod pipeline;
pub mod progress;
pub mod session_pool;

pub use analyser::*;
pub use article_fetcher::*;
pub use browser::*;
pub use droid::*;
pub use google_scraper::*;
pub use key_pool::*;
pub use openai_client::*;
pub use pipeline::*;
pub use progress::*;
pub use session_pool::*;
