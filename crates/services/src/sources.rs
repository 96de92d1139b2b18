//! Read-only curriculum and configuration sources.

use std::path::PathBuf;

use async_trait::async_trait;
use log::debug;
use reqwest::{Client, RequestBuilder};
use tutor_core::Clock;
use tutor_core::model::{Configuration, ConfigurationDraft, Curriculum};

use crate::error::DataLoadError;

#[async_trait]
pub trait CurriculumSource: Send + Sync {
    /// # Errors
    ///
    /// Returns `DataLoadError` when the curriculum cannot be fetched or parsed.
    async fn load_curriculum(&self) -> Result<Curriculum, DataLoadError>;
}

#[async_trait]
pub trait ConfigSource: Send + Sync {
    /// # Errors
    ///
    /// Returns `DataLoadError` when the configuration cannot be fetched,
    /// parsed or validated.
    async fn load_config(&self) -> Result<Configuration, DataLoadError>;
}

/// An already-loaded curriculum.
#[async_trait]
impl CurriculumSource for Curriculum {
    async fn load_curriculum(&self) -> Result<Curriculum, DataLoadError> {
        Ok(self.clone())
    }
}

/// An already-validated configuration.
#[async_trait]
impl ConfigSource for Configuration {
    async fn load_config(&self) -> Result<Configuration, DataLoadError> {
        Ok(*self)
    }
}

fn parse_curriculum(body: &str) -> Result<Curriculum, DataLoadError> {
    Ok(serde_json::from_str(body)?)
}

fn parse_config(body: &str) -> Result<Configuration, DataLoadError> {
    let draft: ConfigurationDraft = serde_json::from_str(body)?;
    Ok(draft.validate()?)
}

/// JSON data file on the local filesystem.
#[derive(Debug, Clone)]
pub struct JsonFileSource {
    path: PathBuf,
}

impl JsonFileSource {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl CurriculumSource for JsonFileSource {
    async fn load_curriculum(&self) -> Result<Curriculum, DataLoadError> {
        debug!("reading curriculum from {}", self.path.display());
        let body = tokio::fs::read_to_string(&self.path).await?;
        parse_curriculum(&body)
    }
}

#[async_trait]
impl ConfigSource for JsonFileSource {
    async fn load_config(&self) -> Result<Configuration, DataLoadError> {
        debug!("reading configuration from {}", self.path.display());
        let body = tokio::fs::read_to_string(&self.path).await?;
        parse_config(&body)
    }
}

/// JSON document served over HTTP.
///
/// Each request carries a `v=<millis>` query parameter so caches never serve
/// a stale copy.
#[derive(Clone)]
pub struct HttpSource {
    client: Client,
    url: String,
    clock: Clock,
    cache_bust: bool,
}

impl HttpSource {
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            url: url.into(),
            clock: Clock::system(),
            cache_bust: true,
        }
    }

    #[must_use]
    pub fn with_cache_bust(mut self, cache_bust: bool) -> Self {
        self.cache_bust = cache_bust;
        self
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    fn request(&self) -> RequestBuilder {
        let request = self.client.get(&self.url);
        if self.cache_bust {
            request.query(&[("v", self.clock.now().timestamp_millis())])
        } else {
            request
        }
    }

    async fn fetch(&self) -> Result<String, DataLoadError> {
        let response = self.request().send().await?;
        if !response.status().is_success() {
            return Err(DataLoadError::HttpStatus(response.status()));
        }
        Ok(response.text().await?)
    }
}

#[async_trait]
impl CurriculumSource for HttpSource {
    async fn load_curriculum(&self) -> Result<Curriculum, DataLoadError> {
        debug!("fetching curriculum from {}", self.url);
        parse_curriculum(&self.fetch().await?)
    }
}

#[async_trait]
impl ConfigSource for HttpSource {
    async fn load_config(&self) -> Result<Configuration, DataLoadError> {
        debug!("fetching configuration from {}", self.url);
        parse_config(&self.fetch().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_file(name: &str, body: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("tutor-sources-{}-{name}", std::process::id()));
        std::fs::write(&path, body).unwrap();
        path
    }

    #[tokio::test]
    async fn file_source_reads_curriculum() {
        let path = temp_file(
            "phrases.json",
            r#"[{"section": "Saludos", "items": [["Hola", "Ahoj", "ah-hoy"]]}]"#,
        );
        let curriculum = JsonFileSource::new(&path).load_curriculum().await.unwrap();
        assert_eq!(curriculum.len(), 1);
        std::fs::remove_file(path).ok();
    }

    #[tokio::test]
    async fn file_source_reports_missing_and_invalid_data() {
        let missing = JsonFileSource::new("/definitely/not/here.json");
        assert!(matches!(
            missing.load_curriculum().await,
            Err(DataLoadError::Io(_))
        ));

        let path = temp_file("config.json", r#"{"examPassingPercentage": 150}"#);
        assert!(matches!(
            JsonFileSource::new(&path).load_config().await,
            Err(DataLoadError::Config(_))
        ));
        std::fs::remove_file(path).ok();
    }

    #[tokio::test]
    async fn file_source_reads_partial_config() {
        let path = temp_file("partial.json", r#"{"pronunciationGoodThreshold": 60}"#);
        let config = JsonFileSource::new(&path).load_config().await.unwrap();
        assert_eq!(config.pronunciation_good_threshold(), 60);
        assert_eq!(config.exam_passing_percentage(), 90);
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn http_requests_carry_cache_bust_parameter() {
        let source = HttpSource::new("http://localhost/phrases.json")
            .with_clock(tutor_core::time::fixed_clock());
        let request = source.request().build().unwrap();
        assert_eq!(request.url().path(), "/phrases.json");
        assert_eq!(request.url().query(), Some("v=1700000000000"));

        let request = source.with_cache_bust(false).request().build().unwrap();
        assert_eq!(request.url().query(), None);
    }

    #[tokio::test]
    async fn in_memory_values_are_sources() {
        let config = Configuration::default();
        assert_eq!(config.load_config().await.unwrap(), config);
    }
}
