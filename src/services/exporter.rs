use std::{fs::File, io::Write, path::Path};

use anyhow::Context;

use crate::domain::NewsItem;

pub const COLUMNS: [&str; 10] = [
    "Link",
    "Domain",
    "Title",
    "Description",
    "Date",
    "Full Content",
    "Analysis",
    "Company",
    "Website",
    "Person Contact Url",
];

pub fn write_csv<W: Write>(items: &[NewsItem], writer: W) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(COLUMNS)?;

    for item in items {
        let analysis = item.analysis_or_sentinel();
        wtr.write_record([
            item.link.as_str(),
            item.domain.as_str(),
            item.title.as_str(),
            item.description.as_str(),
            item.date.as_str(),
            item.content_or_sentinel(),
            analysis.as_str(),
            item.organization.as_str(),
            item.homepage_url.as_str(),
            item.contact_url.as_str(),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}

pub fn to_csv_bytes(items: &[NewsItem]) -> anyhow::Result<Vec<u8>> {
    let mut buffer = Vec::new();
    write_csv(items, &mut buffer)?;
    Ok(buffer)
}

pub fn save_csv(items: &[NewsItem], path: impl AsRef<Path>) -> anyhow::Result<()> {
    let path = path.as_ref();
    let file = File::create(path)
        .with_context(|| format!("Failed to create output file {}", path.display()))?;
    write_csv(items, file)?;
    log::info!("Saved {} news items to {}", items.len(), path.display());
    Ok(())
}
