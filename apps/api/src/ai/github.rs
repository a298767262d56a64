use reqwest::{header, Client, StatusCode};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::errors::AppError;
use crate::llm_client::prompts::{truncate_chars, MAX_CONTEXT_CHARS};

const API_BASE: &str = "https://api.github.com/repos";
const USER_AGENT: &str = "portfolio-api";
const FALLBACK_BRANCH: &str = "main";

/// Root files whose contents are inlined into the context.
pub const MANIFEST_FILES: &[&str] = &[
    "package.json",
    "requirements.txt",
    "pyproject.toml",
    "Cargo.toml",
];

#[derive(Debug, Error)]
pub enum GithubError {
    #[error("Invalid GitHub repository URL: {0}")]
    InvalidUrl(String),

    #[error("Repository {0} not found or not accessible")]
    NotFound(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl From<GithubError> for AppError {
    fn from(e: GithubError) -> Self {
        match e {
            GithubError::InvalidUrl(_) => AppError::Validation(e.to_string()),
            GithubError::NotFound(_) => AppError::NotFound(e.to_string()),
            GithubError::Http(_) => AppError::Upstream(format!("GitHub request failed: {e}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoRef {
    pub owner: String,
    pub repo: String,
}

impl RepoRef {
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }

    pub fn html_url(&self) -> String {
        format!("https://github.com/{}/{}", self.owner, self.repo)
    }

    /// Base for relative README links on `branch`.
    pub fn raw_base(&self, branch: &str) -> String {
        format!("https://raw.githubusercontent.com/{}/{}/{branch}/", self.owner, self.repo)
    }
}

/// Prompt context plus the branch it was read from.
#[derive(Debug, Clone)]
pub struct RepoContext {
    pub branch: String,
    pub text: String,
}

fn valid_segment(segment: &str) -> bool {
    !segment.is_empty()
        && segment != "."
        && segment != ".."
        && segment
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

/// Accepts `https://github.com/owner/repo[.git][/tree/...]`, the same without
/// scheme, or a bare `owner/repo`.
pub fn parse_repo_url(raw: &str) -> Result<RepoRef, GithubError> {
    let invalid = || GithubError::InvalidUrl(raw.to_string());
    let trimmed = raw.trim();
    let (rest, had_scheme) = match trimmed
        .strip_prefix("https://")
        .or_else(|| trimmed.strip_prefix("http://"))
    {
        Some(rest) => (rest, true),
        None => (trimmed, false),
    };

    let on_github = ["github.com/", "www.github.com/"].iter().find_map(|host| {
        rest.get(..host.len())
            .filter(|prefix| prefix.eq_ignore_ascii_case(host))
            .map(|_| &rest[host.len()..])
    });
    let (path, bare) = match on_github {
        Some(path) => (path, false),
        None if had_scheme => return Err(invalid()),
        None => (rest, true),
    };

    let path = path.split(['?', '#']).next().unwrap_or_default();
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    if segments.len() < 2 || (bare && segments.len() != 2) {
        return Err(invalid());
    }
    let owner = segments[0];
    let repo = segments[1].strip_suffix(".git").unwrap_or(segments[1]);

    if !valid_segment(owner) || !valid_segment(repo) {
        return Err(invalid());
    }
    Ok(RepoRef {
        owner: owner.to_string(),
        repo: repo.to_string(),
    })
}

#[derive(Debug, Deserialize)]
struct RepoInfo {
    default_branch: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContentItem {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub download_url: Option<String>,
}

/// Assembles the prompt context and truncates it.
pub fn build_context(repo: &RepoRef, branch: &str, files: &[String], readme: &str) -> String {
    let context = format!(
        "Repository: {}\nBranch: {branch}\n\n=== FILE STRUCTURE ===\n{}\n\n=== README ===\n{readme}",
        repo.full_name(),
        files.join("\n")
    );
    truncate_chars(&context, MAX_CONTEXT_CHARS).to_string()
}

#[derive(Clone)]
pub struct GithubClient {
    http: Client,
    token: Option<String>,
}

impl GithubClient {
    pub fn new(http: Client, token: Option<String>) -> Self {
        Self { http, token }
    }

    fn get(&self, url: &str, accept: &'static str) -> reqwest::RequestBuilder {
        let request = self
            .http
            .get(url)
            .header(header::USER_AGENT, USER_AGENT)
            .header(header::ACCEPT, accept)
            .header("X-GitHub-Api-Version", "2022-11-28");
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn default_branch(&self, repo: &RepoRef) -> Result<String, GithubError> {
        let url = format!("{API_BASE}/{}", repo.full_name());
        let response = self.get(&url, "application/vnd.github+json").send().await?;
        match response.status() {
            StatusCode::NOT_FOUND => Err(GithubError::NotFound(repo.full_name())),
            status if status.is_success() => {
                let info: RepoInfo = response.json().await?;
                Ok(info.default_branch.unwrap_or_else(|| FALLBACK_BRANCH.to_string()))
            }
            status => {
                warn!("GitHub repo lookup for {} returned {status}, assuming '{FALLBACK_BRANCH}'", repo.full_name());
                Ok(FALLBACK_BRANCH.to_string())
            }
        }
    }

    async fn readme(&self, repo: &RepoRef) -> Result<String, GithubError> {
        let url = format!("{API_BASE}/{}/readme", repo.full_name());
        let response = self.get(&url, "application/vnd.github.raw").send().await?;
        if !response.status().is_success() {
            warn!("README not found for {}", repo.full_name());
            return Ok(String::new());
        }
        Ok(response.text().await?)
    }

    async fn root_listing(&self, repo: &RepoRef) -> Result<Vec<ContentItem>, GithubError> {
        let url = format!("{API_BASE}/{}/contents", repo.full_name());
        let response = self.get(&url, "application/vnd.github+json").send().await?;
        if !response.status().is_success() {
            warn!("Could not list contents of {} ({})", repo.full_name(), response.status());
            return Ok(Vec::new());
        }
        Ok(response.json().await?)
    }

    async fn file_text(&self, download_url: &str) -> Option<String> {
        match self.get(download_url, "text/plain").send().await {
            Ok(r) if r.status().is_success() => r.text().await.ok(),
            Ok(r) => {
                debug!("Skipping {download_url}: {}", r.status());
                None
            }
            Err(e) => {
                debug!("Skipping {download_url}: {e}");
                None
            }
        }
    }

    /// Default branch, root file listing with manifest contents inlined, and
    /// the raw README, truncated for prompting.
    pub async fn gather_context(&self, repo: &RepoRef) -> Result<RepoContext, GithubError> {
        let branch = self.default_branch(repo).await?;
        let readme = self.readme(repo).await?;
        let items = self.root_listing(repo).await?;

        let mut files = Vec::with_capacity(items.len());
        for item in &items {
            files.push(format!("{}: {}", item.kind, item.name));
            if !MANIFEST_FILES.contains(&item.name.as_str()) {
                continue;
            }
            if let Some(url) = &item.download_url {
                if let Some(text) = self.file_text(url).await {
                    files.push(format!(
                        "--- Content of {0} ---\n{text}\n--- End of {0} ---",
                        item.name
                    ));
                }
            }
        }

        info!(
            "Gathered GitHub context for {} ({} root entries, README {} bytes)",
            repo.full_name(),
            items.len(),
            readme.len()
        );
        let text = build_context(repo, &branch, &files, &readme);
        Ok(RepoContext { branch, text })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repo(owner: &str, name: &str) -> RepoRef {
        RepoRef {
            owner: owner.to_string(),
            repo: name.to_string(),
        }
    }

    #[test]
    fn test_parse_full_urls() {
        assert_eq!(parse_repo_url("https://github.com/rust-lang/cargo").unwrap(), repo("rust-lang", "cargo"));
        assert_eq!(parse_repo_url("https://github.com/rust-lang/cargo/").unwrap(), repo("rust-lang", "cargo"));
        assert_eq!(parse_repo_url("https://github.com/a/b.git").unwrap(), repo("a", "b"));
        assert_eq!(
            parse_repo_url("https://www.github.com/a/b/tree/main/src?x=1").unwrap(),
            repo("a", "b")
        );
        assert_eq!(parse_repo_url("github.com/a/b").unwrap(), repo("a", "b"));
    }

    #[test]
    fn test_parse_bare_owner_repo() {
        assert_eq!(parse_repo_url("owner/my.repo").unwrap(), repo("owner", "my.repo"));
    }

    #[test]
    fn test_parse_rejects_other_hosts_and_garbage() {
        assert!(parse_repo_url("https://gitlab.com/a/b").is_err());
        assert!(parse_repo_url("https://github.com/only-owner").is_err());
        assert!(parse_repo_url("not a url").is_err());
        assert!(parse_repo_url("https://github.com/a/..").is_err());
        assert!(parse_repo_url("").is_err());
    }

    #[test]
    fn test_build_context_layout_and_truncation() {
        let r = repo("a", "b");
        let files = vec!["file: Cargo.toml".to_string(), "dir: src".to_string()];
        let context = build_context(&r, "main", &files, "# Hello");
        assert!(context.starts_with("Repository: a/b\nBranch: main\n"));
        assert!(context.contains("=== FILE STRUCTURE ===\nfile: Cargo.toml\ndir: src"));
        assert!(context.ends_with("=== README ===\n# Hello"));

        let long = "x".repeat(MAX_CONTEXT_CHARS * 2);
        assert_eq!(build_context(&r, "main", &[], &long).chars().count(), MAX_CONTEXT_CHARS);
    }

    #[test]
    fn test_invalid_url_maps_to_400() {
        let err: AppError = GithubError::InvalidUrl("x".into()).into();
        assert!(matches!(err, AppError::Validation(_)));
    }
}
