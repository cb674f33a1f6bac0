//! GitHub driver, backed by the GitHub REST API (v3).
//!
//! Works against `github.com` and GitHub Enterprise hosts listed in
//! `github-domains` or holding a `github-oauth` token.

use crate::cache::DriverCache;
use crate::driver::{RepositoryData, VcsDriver};
use crate::registry::DriverKind;
use crate::remote::RemoteFilesystem;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, SecondsFormat, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tracing::{debug, trace};
use tug_config::Config;
use tug_core::{BoxFuture, ComposerManifest, ComposerSupport, Dist, Error, Result, Source, json};

static GITHUB_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:(?:https?|git)://([^/]+)/|git@([^:]+):)([^/]+)/(.+?)(?:\.git|/)?$")
        .expect("invalid github url regex")
});

/// Branches never mirrored.
const BRANCH_BLACKLIST: &[&str] = &["gh-pages"];

#[derive(Debug, Deserialize)]
struct ApiRepository {
    owner: Option<ApiOwner>,
    name: Option<String>,
    default_branch: Option<String>,
    master_branch: Option<String>,
    #[serde(default)]
    private: bool,
    #[serde(default)]
    has_issues: bool,
}

#[derive(Debug, Deserialize)]
struct ApiOwner {
    login: String,
}

#[derive(Debug, Deserialize)]
struct ApiContent {
    content: Option<String>,
    encoding: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiCommit {
    commit: ApiCommitDetail,
}

#[derive(Debug, Deserialize)]
struct ApiCommitDetail {
    committer: ApiSignature,
}

#[derive(Debug, Deserialize)]
struct ApiSignature {
    date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiTag {
    name: String,
    commit: ApiObject,
}

#[derive(Debug, Deserialize)]
struct ApiRef {
    #[serde(rename = "ref")]
    reference: String,
    object: ApiObject,
}

#[derive(Debug, Deserialize)]
struct ApiObject {
    sha: String,
}

/// Split a GitHub URL into host, owner and repository.
///
/// Hosts are lowercased and `www.github.com` collapses to `github.com`.
#[must_use]
pub fn parse_url(url: &str) -> Option<(String, String, String)> {
    let caps = GITHUB_URL.captures(url.trim())?;
    let mut host = caps.get(1).or_else(|| caps.get(2))?.as_str().to_ascii_lowercase();
    if host == "www.github.com" {
        host = "github.com".to_string();
    }

    Some((host, caps[3].to_string(), caps[4].to_string()))
}

/// GitHub repository driver.
#[derive(Debug)]
pub struct GithubDriver {
    url: String,
    origin: String,
    owner: String,
    repository: String,
    api_url: String,
    rfs: Arc<dyn RemoteFilesystem>,
    cache: DriverCache,
}

impl GithubDriver {
    /// Whether `url` points at a GitHub host known to `config`.
    #[must_use]
    pub fn supports(config: &Config, url: &str) -> bool {
        parse_url(url).is_some_and(|(host, _, _)| config.is_github_domain(&host))
    }

    /// Create a driver for `url`.
    ///
    /// # Errors
    /// Returns [`Error::InvalidUrl`] if `url` is not a GitHub repository URL.
    pub fn new(url: &str, config: &Config, rfs: Arc<dyn RemoteFilesystem>) -> Result<Self> {
        let (origin, owner, repository) = parse_url(url).ok_or_else(|| Error::InvalidUrl {
            driver: "GitHub".to_string(),
            url: url.to_string(),
        })?;

        let api_url = config.github_api_url.clone().unwrap_or_else(|| {
            if origin == "github.com" {
                "https://api.github.com".to_string()
            } else {
                format!("https://{origin}/api/v3")
            }
        });

        Ok(Self {
            url: format!("https://{origin}/{owner}/{repository}.git"),
            origin,
            owner,
            repository,
            api_url,
            rfs,
            cache: DriverCache::default(),
        })
    }

    /// API base URL.
    #[must_use]
    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    /// SSH clone URL.
    #[must_use]
    pub fn ssh_url(&self) -> String {
        format!("git@{}:{}/{}.git", self.origin, self.owner, self.repository)
    }

    fn repository_api(&self) -> String {
        format!("{}/repos/{}/{}", self.api_url, self.owner, self.repository)
    }

    fn web_url(&self) -> String {
        format!("https://{}/{}/{}", self.origin, self.owner, self.repository)
    }

    async fn fetch_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let response = self.rfs.get(&self.origin, url).await?;
        json::decode(url, &response.body)
    }

    /// Collect every page of a listing by following `rel="next"`.
    ///
    /// A page is fetched at most once, so a cycle of `next` links ends the walk.
    async fn paginate<T: DeserializeOwned + Send>(&self, first: String) -> Result<Vec<T>> {
        let mut items = Vec::new();
        let mut seen = HashSet::new();
        let mut url = first;

        loop {
            let response = self.rfs.get(&self.origin, &url).await?;
            let page: Vec<T> = json::decode(&url, &response.body)?;
            trace!(url = %url, count = page.len(), "fetched page");
            items.extend(page);

            seen.insert(url);
            match response.next_page() {
                Some(next) if !seen.contains(&next) => url = next,
                _ => break,
            }
        }

        Ok(items)
    }

    async fn load_repo_data(&mut self) -> Result<RepositoryData> {
        if let Some(data) = &self.cache.repo_data {
            return Ok(data.clone());
        }

        let url = self.repository_api();
        let repository: ApiRepository = self.fetch_json(&url).await?;

        if let Some(owner) = repository.owner {
            self.owner = owner.login;
        }
        if let Some(name) = repository.name {
            self.repository = name;
        }

        let default_branch = repository
            .default_branch
            .or(repository.master_branch)
            .filter(|branch| !branch.is_empty())
            .unwrap_or_else(|| "master".to_string());

        let data = RepositoryData {
            owner: self.owner.clone(),
            name: self.repository.clone(),
            default_branch: default_branch.clone(),
            private: repository.private,
            has_issues: repository.has_issues,
        };
        debug!(url = %self.url, root = %default_branch, private = data.private, "loaded repository data");

        self.cache.root_identifier = Some(default_branch);
        self.cache.repo_data = Some(data.clone());
        Ok(data)
    }

    async fn load_composer_information(
        &mut self,
        identifier: &str,
    ) -> Result<Option<ComposerManifest>> {
        let Some(content) = self.file_content("composer.json", identifier).await? else {
            return Ok(None);
        };

        let source = format!("{}#composer.json@{identifier}", self.url);
        let mut manifest: ComposerManifest = json::decode(&source, &content)?;

        if manifest.time.is_none()
            && let Some(date) = self.change_date(identifier).await?
        {
            manifest.time = Some(date.to_rfc3339_opts(SecondsFormat::Secs, true));
        }

        let data = self.load_repo_data().await?;
        let support = manifest.support.get_or_insert_with(ComposerSupport::default);
        if support.source.is_none() {
            support.source = Some(format!("{}/tree/{identifier}", self.web_url()));
        }
        if support.issues.is_none() && data.has_issues {
            support.issues = Some(format!("{}/issues", self.web_url()));
        }

        Ok(Some(manifest))
    }
}

fn encode_ref(identifier: &str) -> String {
    url::form_urlencoded::byte_serialize(identifier.as_bytes()).collect()
}

impl VcsDriver for GithubDriver {
    fn kind(&self) -> DriverKind {
        DriverKind::Github
    }

    fn url(&self) -> &str {
        &self.url
    }

    fn repo_data(&mut self) -> BoxFuture<'_, Result<RepositoryData>> {
        Box::pin(self.load_repo_data())
    }

    fn root_identifier(&mut self) -> BoxFuture<'_, Result<String>> {
        Box::pin(async move {
            if let Some(root) = &self.cache.root_identifier {
                return Ok(root.clone());
            }
            Ok(self.load_repo_data().await?.default_branch)
        })
    }

    fn source(&self, identifier: &str) -> Source {
        let private = self.cache.repo_data.as_ref().is_some_and(|data| data.private);
        Source {
            kind: "git".to_string(),
            url: if private {
                self.ssh_url()
            } else {
                self.url.clone()
            },
            reference: identifier.to_string(),
        }
    }

    fn dist(&self, identifier: &str) -> Dist {
        Dist {
            kind: "zip".to_string(),
            url: format!("{}/zipball/{identifier}", self.repository_api()),
            reference: identifier.to_string(),
            shasum: String::new(),
        }
    }

    fn composer_information<'a>(
        &'a mut self,
        identifier: &'a str,
    ) -> BoxFuture<'a, Result<Option<Arc<ComposerManifest>>>> {
        Box::pin(async move {
            if let Some(cached) = self.cache.info.get(identifier) {
                return Ok(cached.clone());
            }

            let manifest = self.load_composer_information(identifier).await?.map(Arc::new);
            self.cache
                .info
                .insert(identifier.to_string(), manifest.clone());
            Ok(manifest)
        })
    }

    fn file_content<'a>(
        &'a self,
        file: &'a str,
        identifier: &'a str,
    ) -> BoxFuture<'a, Result<Option<String>>> {
        Box::pin(async move {
            let url = format!(
                "{}/contents/{file}?ref={}",
                self.repository_api(),
                encode_ref(identifier)
            );
            let response = match self.rfs.get(&self.origin, &url).await {
                Ok(response) => response,
                Err(e) if e.is_not_found() => return Ok(None),
                Err(e) => return Err(e),
            };

            let not_found = || Error::ContentNotFound {
                file: file.to_string(),
                reference: identifier.to_string(),
            };

            let resource: ApiContent = json::decode(&url, &response.body)?;
            let content = match (resource.content, resource.encoding.as_deref()) {
                (Some(content), Some("base64")) if !content.is_empty() => content,
                _ => return Err(not_found()),
            };

            let compact: String = content.chars().filter(|c| !c.is_whitespace()).collect();
            let bytes = STANDARD.decode(compact).map_err(|_| not_found())?;
            String::from_utf8(bytes).map(Some).map_err(|_| not_found())
        })
    }

    fn change_date<'a>(
        &'a self,
        identifier: &'a str,
    ) -> BoxFuture<'a, Result<Option<DateTime<Utc>>>> {
        Box::pin(async move {
            let url = format!("{}/commits/{}", self.repository_api(), encode_ref(identifier));
            let commit: ApiCommit = self.fetch_json(&url).await?;

            Ok(commit
                .commit
                .committer
                .date
                .and_then(|date| DateTime::parse_from_rfc3339(&date).ok())
                .map(|date| date.with_timezone(&Utc)))
        })
    }

    fn tags(&mut self) -> BoxFuture<'_, Result<BTreeMap<String, String>>> {
        Box::pin(async move {
            if let Some(tags) = &self.cache.tags {
                return Ok(tags.clone());
            }

            let first = format!("{}/tags?per_page=100", self.repository_api());
            let tags: BTreeMap<String, String> = self
                .paginate::<ApiTag>(first)
                .await?
                .into_iter()
                .map(|tag| (tag.name, tag.commit.sha))
                .collect();

            debug!(url = %self.url, count = tags.len(), "loaded tags");
            self.cache.tags = Some(tags.clone());
            Ok(tags)
        })
    }

    fn branches(&mut self) -> BoxFuture<'_, Result<BTreeMap<String, String>>> {
        Box::pin(async move {
            if let Some(branches) = &self.cache.branches {
                return Ok(branches.clone());
            }

            let first = format!("{}/git/refs/heads?per_page=100", self.repository_api());
            let branches: BTreeMap<String, String> = self
                .paginate::<ApiRef>(first)
                .await?
                .into_iter()
                .filter_map(|head| {
                    let name = head
                        .reference
                        .strip_prefix("refs/heads/")
                        .unwrap_or(&head.reference)
                        .to_string();
                    (!BRANCH_BLACKLIST.contains(&name.as_str())).then_some((name, head.object.sha))
                })
                .collect();

            debug!(url = %self.url, count = branches.len(), "loaded branches");
            self.cache.branches = Some(branches.clone());
            Ok(branches)
        })
    }

    fn invalidate(&mut self) {
        trace!(url = %self.url, "invalidating driver cache");
        self.cache.invalidate();
    }
}
