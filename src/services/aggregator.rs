use crate::domain::NewsItem;

/// Concatenates per-organization results in the order they were collected.
pub fn flatten(per_organization: Vec<Vec<NewsItem>>) -> Vec<NewsItem> {
    per_organization.into_iter().flatten().collect()
}
