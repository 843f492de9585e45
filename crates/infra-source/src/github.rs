// GitHub profile source
// Listing: GitHub contents API. Content: raw.githubusercontent.com downloads.

use async_trait::async_trait;
use dsc_runner_core::domain::{is_profile_file, ProfileSummary};
use dsc_runner_core::port::{ProfileSource, SourceError};
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

pub const DEFAULT_OWNER: &str = "atc-net";
pub const DEFAULT_REPO: &str = "atc-dsc-configurations";
pub const DEFAULT_GIT_REF: &str = "main";
pub const GITHUB_API_URL: &str = "https://api.github.com";
pub const GITHUB_RAW_URL: &str = "https://raw.githubusercontent.com";

/// Folder in the repository that holds the profiles
const CONFIGURATIONS_PATH: &str = "configurations";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const USER_AGENT: &str = concat!("dsc-runner/", env!("CARGO_PKG_VERSION"));

/// Which repository to read, and where the GitHub endpoints live
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitHubSourceConfig {
    pub owner: String,
    pub repo: String,
    pub git_ref: String,
    pub api_base_url: String,
    pub raw_base_url: String,
}

impl Default for GitHubSourceConfig {
    fn default() -> Self {
        Self {
            owner: DEFAULT_OWNER.to_string(),
            repo: DEFAULT_REPO.to_string(),
            git_ref: DEFAULT_GIT_REF.to_string(),
            api_base_url: GITHUB_API_URL.to_string(),
            raw_base_url: GITHUB_RAW_URL.to_string(),
        }
    }
}

/// One entry of the contents API response; everything but the name is ignored
#[derive(Debug, Deserialize)]
struct ContentEntry {
    #[serde(default)]
    name: String,
}

pub struct GitHubProfileSource {
    client: reqwest::Client,
    config: GitHubSourceConfig,
}

impl GitHubProfileSource {
    pub fn new(config: GitHubSourceConfig) -> Result<Self, SourceError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| SourceError::Network(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &GitHubSourceConfig {
        &self.config
    }

    fn listing_url(&self) -> String {
        format!(
            "{}/repos/{}/{}/contents/{}?ref={}",
            self.config.api_base_url.trim_end_matches('/'),
            self.config.owner,
            self.config.repo,
            CONFIGURATIONS_PATH,
            self.config.git_ref
        )
    }

    /// Raw download URL; every path segment is percent-encoded
    fn content_url(&self, file_name: &str) -> Result<Url, SourceError> {
        let base = &self.config.raw_base_url;
        let mut url = Url::parse(base)
            .map_err(|e| SourceError::Network(format!("Invalid raw base URL {}: {}", base, e)))?;

        url.path_segments_mut()
            .map_err(|_| SourceError::Network(format!("Raw base URL cannot hold a path: {}", base)))?
            .pop_if_empty()
            .extend([
                self.config.owner.as_str(),
                self.config.repo.as_str(),
                self.config.git_ref.as_str(),
                CONFIGURATIONS_PATH,
                file_name,
            ]);

        Ok(url)
    }

    /// GET `url`; 404 becomes NotFound(`subject`), other failures Network
    async fn fetch(&self, url: &str, subject: &str) -> Result<reqwest::Response, SourceError> {
        debug!(url, "GitHub request");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| SourceError::Network(format!("{}: {}", url, e)))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(SourceError::NotFound(subject.to_string()));
        }
        if !status.is_success() {
            warn!(url, status = %status, "GitHub request failed");
            return Err(SourceError::Network(format!("{} returned {}", url, status)));
        }

        Ok(response)
    }
}

/// Keep `.dsc.yaml` entries in listing order
fn summarize(entries: Vec<ContentEntry>) -> Vec<ProfileSummary> {
    entries
        .into_iter()
        .filter(|entry| is_profile_file(&entry.name))
        .map(|entry| ProfileSummary::from_file_name(entry.name))
        .collect()
}

#[async_trait]
impl ProfileSource for GitHubProfileSource {
    async fn list_profiles(&self) -> Result<Vec<ProfileSummary>, SourceError> {
        let url = self.listing_url();
        let entries: Vec<ContentEntry> = self
            .fetch(&url, CONFIGURATIONS_PATH)
            .await?
            .json()
            .await
            .map_err(|e| SourceError::Network(format!("Invalid listing from {}: {}", url, e)))?;

        let profiles = summarize(entries);
        debug!(count = profiles.len(), "Listed profiles from GitHub");
        Ok(profiles)
    }

    async fn get_profile_content(&self, file_name: &str) -> Result<String, SourceError> {
        let url = self.content_url(file_name)?;
        self.fetch(url.as_str(), file_name)
            .await?
            .text()
            .await
            .map_err(|e| SourceError::Network(format!("{}: {}", url, e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn source_for(server: &MockServer) -> GitHubProfileSource {
        GitHubProfileSource::new(GitHubSourceConfig {
            api_base_url: server.uri(),
            raw_base_url: server.uri(),
            ..GitHubSourceConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn test_default_urls() {
        let source = GitHubProfileSource::new(GitHubSourceConfig::default()).unwrap();

        assert_eq!(
            source.listing_url(),
            "https://api.github.com/repos/atc-net/atc-dsc-configurations/contents/configurations?ref=main"
        );
        assert_eq!(
            source.content_url("git-configuration.dsc.yaml").unwrap().as_str(),
            "https://raw.githubusercontent.com/atc-net/atc-dsc-configurations/main/configurations/git-configuration.dsc.yaml"
        );
    }

    #[test]
    fn test_content_url_escapes_file_name() {
        let source = GitHubProfileSource::new(GitHubSourceConfig::default()).unwrap();

        let url = source.content_url("my profile#v2?.dsc.yaml").unwrap();

        assert_eq!(
            url.as_str(),
            "https://raw.githubusercontent.com/atc-net/atc-dsc-configurations/main/configurations/my%20profile%23v2%3F.dsc.yaml"
        );
        assert!(url.query().is_none());
        assert!(url.fragment().is_none());
    }

    #[test]
    fn test_summarize_filters_and_keeps_order() {
        let entries = ["zed-configuration.dsc.yaml", "README.md", "Azure.DSC.YAML", "x.yaml"]
            .into_iter()
            .map(|name| ContentEntry {
                name: name.to_string(),
            })
            .collect();

        let profiles = summarize(entries);

        let names: Vec<_> = profiles.iter().map(|p| p.file_name.as_str()).collect();
        assert_eq!(names, ["zed-configuration.dsc.yaml", "Azure.DSC.YAML"]);
        assert_eq!(profiles[0].name, "zed configuration");
        assert!(profiles.iter().all(|p| p.description.is_none()));
    }

    #[tokio::test]
    async fn test_list_profiles() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/atc-net/atc-dsc-configurations/contents/configurations"))
            .and(query_param("ref", "main"))
            .and(header("user-agent", USER_AGENT))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                { "name": "git-configuration.dsc.yaml", "type": "file" },
                { "name": "README.md", "type": "file" },
                { "name": "dotnet-configuration.dsc.yaml", "type": "file" }
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let profiles = source_for(&server).list_profiles().await.unwrap();

        assert_eq!(profiles.len(), 2);
        assert_eq!(profiles[0].file_name, "git-configuration.dsc.yaml");
        assert_eq!(profiles[1].name, "dotnet configuration");
    }

    #[tokio::test]
    async fn test_get_profile_content() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(
                "/atc-net/atc-dsc-configurations/main/configurations/git-configuration.dsc.yaml",
            ))
            .respond_with(ResponseTemplate::new(200).set_body_string("resources: []\n"))
            .mount(&server)
            .await;

        let content = source_for(&server)
            .get_profile_content("git-configuration.dsc.yaml")
            .await
            .unwrap();

        assert_eq!(content, "resources: []\n");
    }

    #[tokio::test]
    async fn test_file_name_with_space_is_requested_escaped() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(
                "/atc-net/atc-dsc-configurations/main/configurations/dev%20tools.dsc.yaml",
            ))
            .respond_with(ResponseTemplate::new(200).set_body_string("tools: []\n"))
            .expect(1)
            .mount(&server)
            .await;

        let content = source_for(&server)
            .get_profile_content("dev tools.dsc.yaml")
            .await
            .unwrap();

        assert_eq!(content, "tools: []\n");
    }

    #[tokio::test]
    async fn test_missing_profile_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let err = source_for(&server)
            .get_profile_content("missing.dsc.yaml")
            .await
            .unwrap_err();

        assert!(matches!(err, SourceError::NotFound(name) if name == "missing.dsc.yaml"));
    }

    #[tokio::test]
    async fn test_server_error_is_network_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let source = source_for(&server);

        assert!(matches!(
            source.list_profiles().await.unwrap_err(),
            SourceError::Network(_)
        ));
        assert!(matches!(
            source.get_profile_content("a.dsc.yaml").await.unwrap_err(),
            SourceError::Network(_)
        ));
    }

    #[tokio::test]
    async fn test_malformed_listing_is_network_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{\"message\":\"rate limited\"}"))
            .mount(&server)
            .await;

        let err = source_for(&server).list_profiles().await.unwrap_err();
        assert!(matches!(err, SourceError::Network(_)));
    }
}
