use std::io::Read;

use anyhow::Context;
use serde::Deserialize;

/// One row of the input batch. Never mutated once a run starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrganizationTask {
    pub name: String,
    pub homepage_url: String,
    pub contact_url: String,
}

#[derive(Deserialize)]
struct OrganizationRow {
    #[serde(rename = "Company")]
    company: Option<String>,
    #[serde(rename = "Website")]
    website: Option<String>,
    #[serde(rename = "Person LinkedIn Url", alias = "Person Contact Url")]
    contact_url: Option<String>,
}

impl OrganizationTask {
    pub fn new(
        name: impl Into<String>,
        homepage_url: impl Into<String>,
        contact_url: impl Into<String>,
    ) -> Self {
        OrganizationTask {
            name: name.into(),
            homepage_url: homepage_url.into(),
            contact_url: contact_url.into(),
        }
    }

    /// Reads the organization batch, dropping rows with a blank required column.
    pub fn from_csv<R: Read>(reader: R) -> anyhow::Result<Vec<OrganizationTask>> {
        let mut csv_reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
        let mut tasks = vec![];

        for (index, row) in csv_reader.deserialize::<OrganizationRow>().enumerate() {
            let row = row.with_context(|| format!("Malformed organization row {}", index + 1))?;

            match (non_blank(row.company), non_blank(row.website), non_blank(row.contact_url)) {
                (Some(name), Some(homepage_url), Some(contact_url)) => tasks.push(OrganizationTask {
                    name,
                    homepage_url,
                    contact_url,
                }),
                _ => log::warn!("Dropping organization row {} with missing fields", index + 1),
            }
        }

        Ok(tasks)
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
