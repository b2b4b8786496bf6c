use std::fmt;

use crate::error::PipelineError;

const MAX_FIELD_WORDS: usize = 2;

pub const ANALYSIS_TEMPLATE: &str = r#"You are an expert in analyzing company news from the news provided.
    Please perform analysis on the provided news and return the following analysis:
    1) Sentiment of News
    2) Intent of News for example : "product launch" , "leadership change" , "collaboration", "new tenders" etc.
    3) Readiness or willingness of the company to involve in sales conversation. Answer in yes or no.

    ### News to perform analysis on:
    {text}

    ---

    ### Please provide the extracted information in highly structured format like: ['Sentiment','Intent','Ready']. Just provide answers in one to two words for each in provided format only. Don't include further explanation or introductory part in chat.
    "#;

pub fn render_prompt(text: &str) -> String {
    ANALYSIS_TEMPLATE.replace("{text}", text)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SalesReadiness {
    Yes,
    No,
}

impl fmt::Display for SalesReadiness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SalesReadiness::Yes => write!(f, "Yes"),
            SalesReadiness::No => write!(f, "No"),
        }
    }
}

/// Sentiment, intent and sales readiness of one article, in that order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisResult {
    pub sentiment: String,
    pub intent: String,
    pub sales_ready: SalesReadiness,
}

impl fmt::Display for AnalysisResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "['{}','{}','{}']",
            self.sentiment, self.intent, self.sales_ready
        )
    }
}

impl AnalysisResult {
    /// Parses the model's `['Sentiment','Intent','Yes']` reply.
    ///
    /// Code fences and surrounding whitespace are tolerated, as are double
    /// quotes. Anything that is not exactly three short fields is rejected.
    pub fn parse_reply(reply: &str) -> Result<AnalysisResult, PipelineError> {
        let malformed = |reason: &'static str| PipelineError::AnalysisParseError {
            reason,
            reply: reply.to_string(),
        };

        let body = strip_code_fence(reply.trim());
        let inner = body
            .strip_prefix('[')
            .and_then(|rest| rest.strip_suffix(']'))
            .ok_or_else(|| malformed("not a bracketed list"))?;

        let fields: Vec<String> = inner
            .split(',')
            .map(|field| {
                field
                    .trim()
                    .trim_matches(|c| c == '\'' || c == '"')
                    .trim()
                    .to_string()
            })
            .collect();

        let [sentiment, intent, ready] = <[String; 3]>::try_from(fields)
            .map_err(|_| malformed("expected exactly three fields"))?;

        for field in [&sentiment, &intent, &ready] {
            let words = field.split_whitespace().count();
            if words == 0 {
                return Err(malformed("empty field"));
            }
            if words > MAX_FIELD_WORDS {
                return Err(malformed("field longer than two words"));
            }
        }

        let sales_ready = match ready.to_lowercase().as_str() {
            "yes" => SalesReadiness::Yes,
            "no" => SalesReadiness::No,
            _ => return Err(malformed("sales readiness is not yes or no")),
        };

        Ok(AnalysisResult {
            sentiment,
            intent,
            sales_ready,
        })
    }
}

fn strip_code_fence(reply: &str) -> &str {
    match reply.strip_prefix("```") {
        Some(rest) => {
            let rest = rest.strip_suffix("```").unwrap_or(rest);
            // Drop an info string such as ```python
            match rest.split_once('\n') {
                Some((info, body)) if !info.contains('[') => body.trim(),
                _ => rest.trim(),
            }
        }
        None => reply,
    }
}
