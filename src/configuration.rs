use std::time::Duration;

use config::ConfigError;
use serde::Deserialize;
use serde_aux::field_attributes::deserialize_number_from_string;

#[derive(Deserialize, Clone, Debug)]
pub struct Settings {
    pub application: ApplicationSettings,
    pub browser: BrowserSettings,
    #[serde(default)]
    pub search: SearchSettings,
    pub pipeline: PipelineSettings,
    pub analysis: AnalysisSettings,
}

#[derive(Deserialize, Clone, Debug)]
pub struct ApplicationSettings {
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub port: u16,
    pub host: String,
}

#[derive(Deserialize, Clone, Debug)]
pub struct BrowserSettings {
    pub webdriver_url: String,
    pub headless: bool,
    /// Most sessions open at once, which is also the most organizations
    /// processed at once.
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub pool_size: usize,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub settle_millis: u64,
}

impl BrowserSettings {
    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_millis)
    }
}

/// Where to search and how a result page is laid out.
#[derive(Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct SearchSettings {
    pub base_url: String,
    pub vertical: String,
    pub candidate_selector: String,
    pub link_selector: String,
    pub field_selector: String,
    pub domain_field: usize,
    pub title_field: usize,
    pub description_field: usize,
    pub date_field: usize,
}

impl Default for SearchSettings {
    fn default() -> Self {
        SearchSettings {
            base_url: "https://www.google.com/search".to_string(),
            vertical: "nws".to_string(),
            candidate_selector: "div#rso > div > div > div > div".to_string(),
            link_selector: "a".to_string(),
            field_selector: "a>div>div>div".to_string(),
            domain_field: 1,
            title_field: 2,
            description_field: 3,
            date_field: 4,
        }
    }
}

impl SearchSettings {
    /// Field nodes a result needs before it can be read.
    pub fn required_fields(&self) -> usize {
        [
            self.domain_field,
            self.title_field,
            self.description_field,
            self.date_field,
        ]
        .into_iter()
        .max()
        .unwrap_or(0)
            + 1
    }
}

#[derive(Deserialize, Clone, Debug)]
pub struct PipelineSettings {
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub max_items_per_organization: usize,
    #[serde(default)]
    pub analysis_concurrency: Option<usize>,
    pub output_path: String,
}

#[derive(Deserialize, Clone, Debug)]
pub struct AnalysisSettings {
    pub api_base: String,
    pub model: String,
    pub max_output_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
    pub max_input_words: usize,
    #[serde(default)]
    pub api_keys: Vec<String>,
}

impl Settings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.browser.pool_size == 0 {
            return Err(ConfigError::Message(
                "browser.pool_size must be at least 1".to_string(),
            ));
        }
        if self.pipeline.max_items_per_organization == 0 {
            return Err(ConfigError::Message(
                "pipeline.max_items_per_organization must be at least 1".to_string(),
            ));
        }
        if self.pipeline.analysis_concurrency == Some(0) {
            return Err(ConfigError::Message(
                "pipeline.analysis_concurrency must be at least 1 when set".to_string(),
            ));
        }
        Ok(())
    }
}

pub fn get_configuration() -> Result<Settings, ConfigError> {
    let base_path =
        std::env::current_dir().map_err(|e| ConfigError::Message(e.to_string()))?;
    let configuration_directory = base_path.join("configuration");

    let environment: Environment = std::env::var("APP_ENVIRONMENT")
        .unwrap_or_else(|_| "local".into())
        .try_into()
        .map_err(ConfigError::Message)?;
    let environment_filename = format!("{}.yaml", environment.as_str());

    let settings = config::Config::builder()
        .add_source(config::File::from(configuration_directory.join("base.yaml")))
        .add_source(config::File::from(
            configuration_directory.join(environment_filename),
        ))
        // APP_BROWSER__POOL_SIZE=3 sets browser.pool_size
        .add_source(
            config::Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("analysis.api_keys")
                .try_parsing(true),
        )
        .build()?;

    let settings = settings.try_deserialize::<Settings>()?;
    settings.validate()?;
    Ok(settings)
}

pub enum Environment {
    Local,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Local => "local",
            Environment::Production => "production",
        }
    }
}

impl TryFrom<String> for Environment {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.to_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "production" => Ok(Self::Production),
            other => Err(format!(
                "{} is not a supported environment. Use either `local` or `production`.",
                other
            )),
        }
    }
}
