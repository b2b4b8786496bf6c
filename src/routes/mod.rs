pub mod default_route;
pub mod news_route;
