use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, TimeZone, Utc};
use reqwest::header::{ACCEPT, USER_AGENT};
use reqwest::{Response, StatusCode};
use serde::{Deserialize, Serialize};

use crate::config::GithubConfig;
use crate::error::CollaboratorError;
use crate::scheduler::RepositoryRef;
use crate::services::{CommitFetcher, CommitSummary};

/// GitHub API maximum page size.
const PER_PAGE: usize = 100;

/// Minimal GitHub REST client for commit history and rate limit status.
#[derive(Debug, Clone)]
pub struct GithubClient {
    client: reqwest::Client,
    api_url: String,
    token: Option<String>,
    max_pages: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimit {
    pub limit: u64,
    pub remaining: u64,
    pub reset_at: DateTime<Utc>,
}

#[derive(Deserialize)]
struct ApiCommit {
    sha: String,
    #[serde(default)]
    html_url: String,
    commit: ApiCommitDetail,
    #[serde(default)]
    stats: Option<ApiStats>,
}

#[derive(Deserialize)]
struct ApiCommitDetail {
    #[serde(default)]
    message: String,
    author: Option<ApiSignature>,
    committer: Option<ApiSignature>,
}

#[derive(Deserialize)]
struct ApiSignature {
    #[serde(default)]
    name: String,
    #[serde(default)]
    email: String,
    date: DateTime<Utc>,
}

#[derive(Deserialize)]
struct ApiStats {
    #[serde(default)]
    additions: u64,
    #[serde(default)]
    deletions: u64,
}

#[derive(Deserialize)]
struct ApiRateLimit {
    rate: ApiRate,
}

#[derive(Deserialize)]
struct ApiRate {
    limit: u64,
    remaining: u64,
    reset: i64,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    message: String,
}

impl GithubClient {
    pub fn new(config: &GithubConfig) -> Result<Self, CollaboratorError> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            client,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            token: config.token.clone().filter(|t| !t.is_empty()),
            max_pages: config.max_pages.max(1),
        })
    }

    fn get(&self, url: &str) -> reqwest::RequestBuilder {
        let request = self
            .client
            .get(url)
            .header(ACCEPT, "application/vnd.github+json")
            .header(USER_AGENT, concat!("repo-monitor/", env!("CARGO_PKG_VERSION")));
        match self.token {
            Some(ref token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Current core API quota for the configured token.
    pub async fn rate_limit(&self) -> Result<RateLimit, CollaboratorError> {
        let url = format!("{}/rate_limit", self.api_url);
        let response = self.get(&url).send().await?;
        let response = Self::check_status(response, "rate_limit").await?;
        let body: ApiRateLimit = response
            .json()
            .await
            .map_err(|e| CollaboratorError::Decode(e.to_string()))?;

        let reset_at = Utc
            .timestamp_opt(body.rate.reset, 0)
            .single()
            .unwrap_or_else(Utc::now);
        Ok(RateLimit {
            limit: body.rate.limit,
            remaining: body.rate.remaining,
            reset_at,
        })
    }

    async fn check_status(response: Response, target: &str) -> Result<Response, CollaboratorError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ApiErrorBody>(&body)
            .map(|b| b.message)
            .unwrap_or(body);

        match status {
            StatusCode::NOT_FOUND => Err(CollaboratorError::NotFound(target.to_string())),
            StatusCode::FORBIDDEN | StatusCode::TOO_MANY_REQUESTS
                if message.to_lowercase().contains("rate limit") =>
            {
                Err(CollaboratorError::RateLimited)
            }
            _ => Err(CollaboratorError::Api {
                status: status.as_u16(),
                message: if message.is_empty() {
                    format!("HTTP {}", status.as_u16())
                } else {
                    message
                },
            }),
        }
    }

    fn parse_commit(value: serde_json::Value) -> Result<CommitSummary, serde_json::Error> {
        let api: ApiCommit = serde_json::from_value(value)?;
        let stats = api.stats.unwrap_or(ApiStats {
            additions: 0,
            deletions: 0,
        });
        let author = api.commit.author.or(api.commit.committer);
        let (author_name, author_email, authored_at) = match author {
            Some(sig) => (sig.name, sig.email, sig.date),
            None => (String::new(), String::new(), Utc::now()),
        };

        Ok(CommitSummary {
            sha: api.sha,
            message: api.commit.message,
            author_name,
            author_email,
            authored_at,
            html_url: api.html_url,
            additions: stats.additions,
            deletions: stats.deletions,
        })
    }
}

#[async_trait]
impl CommitFetcher for GithubClient {
    async fn fetch_commits(
        &self,
        repository: &RepositoryRef,
        since: DateTime<Utc>,
    ) -> Result<Vec<CommitSummary>, CollaboratorError> {
        let url = format!(
            "{}/repos/{}/{}/commits",
            self.api_url,
            repository.owner(),
            repository.name()
        );
        let since_param = since.to_rfc3339_opts(SecondsFormat::Secs, true);
        let target = repository.to_string();

        tracing::info!(repository = %repository, since = %since_param, "Fetching commits");

        let mut commits = Vec::new();
        for page in 1..=self.max_pages {
            let response = self
                .get(&url)
                .query(&[
                    ("since", since_param.clone()),
                    ("per_page", PER_PAGE.to_string()),
                    ("page", page.to_string()),
                ])
                .send()
                .await?;
            let response = Self::check_status(response, &target).await?;
            let items: Vec<serde_json::Value> = response
                .json()
                .await
                .map_err(|e| CollaboratorError::Decode(e.to_string()))?;

            let page_len = items.len();
            for item in items {
                let sha = item
                    .get("sha")
                    .and_then(|s| s.as_str())
                    .unwrap_or("unknown")
                    .to_string();
                match Self::parse_commit(item) {
                    Ok(commit) => commits.push(commit),
                    Err(e) => {
                        tracing::warn!(
                            repository = %repository,
                            sha = %sha,
                            error = %e,
                            "Skipping unparseable commit"
                        );
                    }
                }
            }

            if page_len < PER_PAGE {
                break;
            }
        }

        tracing::info!(repository = %repository, count = commits.len(), "Fetched commits");
        Ok(commits)
    }
}
