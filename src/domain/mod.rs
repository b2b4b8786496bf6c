pub mod analysis;
pub mod news_item;
pub mod organization;
pub mod text;

pub use analysis::*;
pub use news_item::*;
pub use organization::*;
pub use text::*;
