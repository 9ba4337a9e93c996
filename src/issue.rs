use std::{fmt, str::FromStr};

use async_trait::async_trait;
use thiserror::Error;
use tracing::{info, warn};

use crate::Result;

/// Status GitHub answers a successful issue creation with.
pub const CREATED: u16 = 201;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Repository {
    pub owner: String,
    pub name: String,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid repository '{0}', expected owner/repo")]
pub struct InvalidRepository(pub String);

impl Repository {
    pub fn new(
        owner: impl Into<String>,
        name: impl Into<String>,
    ) -> Result<Self, InvalidRepository> {
        let owner = owner.into();
        let name = name.into();
        let valid = |part: &str| {
            !part.is_empty() && !part.contains('/') && !part.chars().any(char::is_whitespace)
        };
        if !valid(&owner) || !valid(&name) {
            return Err(InvalidRepository(format!("{owner}/{name}")));
        }

        Ok(Self { owner, name })
    }

    pub fn url(&self) -> String {
        format!("https://github.com/{}/{}", self.owner, self.name)
    }

    /// Markdown link with embeds suppressed.
    pub fn link(&self) -> String {
        format!("[{self}](<{}>)", self.url())
    }
}

impl FromStr for Repository {
    type Err = InvalidRepository;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (owner, name) = s
            .split_once('/')
            .ok_or_else(|| InvalidRepository(s.to_string()))?;

        Self::new(owner, name).map_err(|_| InvalidRepository(s.to_string()))
    }
}

impl fmt::Display for Repository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueDraft {
    pub title: String,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedIssue {
    pub number: u64,
    pub html_url: String,
}

/// Raw outcome of a create call: the HTTP status and, for a `201`, the issue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateResponse {
    pub status: u16,
    pub issue: Option<CreatedIssue>,
}

impl CreateResponse {
    pub fn created(issue: CreatedIssue) -> Self {
        Self {
            status: CREATED,
            issue: Some(issue),
        }
    }

    pub fn status(status: u16) -> Self {
        Self {
            status,
            issue: None,
        }
    }
}

/// The code host issues are filed in.
#[async_trait]
pub trait IssueTracker: Send + Sync {
    async fn open_issue_titles(&self, repo: &Repository) -> Result<Vec<String>>;
    async fn create_issue(&self, repo: &Repository, draft: &IssueDraft) -> Result<CreateResponse>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    Duplicate,
    Status(u16),
}

/// Outcome of filing a draft that did reach the code host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filed {
    Created(CreatedIssue),
    Rejected(Rejection),
}

/// Files `draft` in `repo`, refusing exact open-title duplicates when
/// `duplicate_check` is set.
pub async fn file_issue(
    tracker: &dyn IssueTracker,
    repo: &Repository,
    draft: &IssueDraft,
    duplicate_check: bool,
) -> Result<Filed> {
    if duplicate_check {
        let titles = tracker.open_issue_titles(repo).await?;
        if titles.iter().any(|title| *title == draft.title) {
            info!("issue '{}' already open in {repo}", draft.title);
            return Ok(Filed::Rejected(Rejection::Duplicate));
        }
    }

    let response = tracker.create_issue(repo, draft).await?;
    match (response.status, response.issue) {
        (CREATED, Some(issue)) => {
            info!("created issue #{} in {repo}", issue.number);
            Ok(Filed::Created(issue))
        }
        (CREATED, None) => Err(anyhow::anyhow!("{repo} answered 201 without an issue")),
        (status, _) => {
            warn!("creating issue in {repo} failed with status {status}");
            Ok(Filed::Rejected(Rejection::Status(status)))
        }
    }
}

#[cfg(test)]
pub mod tests {
    use std::sync::Mutex;

    use super::*;

    /// Tracker double recording every call it receives.
    #[derive(Default)]
    pub struct FakeTracker {
        pub open_titles: Vec<String>,
        pub create_status: Option<u16>,
        pub fail_listing: bool,
        pub listed: Mutex<Vec<Repository>>,
        pub created: Mutex<Vec<(String, String, IssueDraft)>>,
    }

    impl FakeTracker {
        pub fn with_titles(titles: &[&str]) -> Self {
            Self {
                open_titles: titles.iter().map(|t| t.to_string()).collect(),
                ..Default::default()
            }
        }

        pub fn calls(&self) -> usize {
            self.listed.lock().unwrap().len() + self.created.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl IssueTracker for FakeTracker {
        async fn open_issue_titles(&self, repo: &Repository) -> Result<Vec<String>> {
            self.listed.lock().unwrap().push(repo.clone());
            if self.fail_listing {
                anyhow::bail!("connection reset");
            }
            Ok(self.open_titles.clone())
        }

        async fn create_issue(&self, repo: &Repository, draft: &IssueDraft) -> Result<CreateResponse> {
            let mut created = self.created.lock().unwrap();
            created.push((repo.owner.clone(), repo.name.clone(), draft.clone()));
            match self.create_status {
                Some(status) => Ok(CreateResponse::status(status)),
                None => {
                    let number = created.len() as u64 + 41;
                    Ok(CreateResponse::created(CreatedIssue {
                        number,
                        html_url: format!("{}/issues/{number}", repo.url()),
                    }))
                }
            }
        }
    }

    fn draft(title: &str) -> IssueDraft {
        IssueDraft {
            title: title.to_string(),
            body: "steps to reproduce".to_string(),
        }
    }

    #[test]
    fn compound_identifier_splits_on_slash() {
        let repo: Repository = "acme/widgets".parse().unwrap();
        assert_eq!(repo, Repository::new("acme", "widgets").unwrap());
        assert_eq!(repo.to_string(), "acme/widgets");
        assert_eq!(repo.link(), "[acme/widgets](<https://github.com/acme/widgets>)");
    }

    #[test]
    fn malformed_identifiers_are_rejected() {
        for bad in [
            "widgets",
            "/widgets",
            "acme/",
            "acme/widgets/extra",
            " / ",
            "acme/ widgets",
            "acme /widgets",
        ] {
            assert!(bad.parse::<Repository>().is_err(), "{bad}");
        }
        assert!(Repository::new("acme/corp", "widgets").is_err());
        assert!(Repository::new("acme", " widgets").is_err());
        assert!(Repository::new("acme", "wid gets").is_err());
    }

    #[tokio::test]
    async fn duplicate_title_short_circuits() {
        let tracker = FakeTracker::with_titles(&["Crash on start", "Typo"]);
        let repo = Repository::new("acme", "widgets").unwrap();

        let filed = file_issue(&tracker, &repo, &draft("Typo"), true).await.unwrap();

        assert_eq!(filed, Filed::Rejected(Rejection::Duplicate));
        assert!(tracker.created.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn title_comparison_is_case_sensitive() {
        let tracker = FakeTracker::with_titles(&["Typo"]);
        let repo = Repository::new("acme", "widgets").unwrap();

        let filed = file_issue(&tracker, &repo, &draft("typo"), true).await.unwrap();

        assert!(matches!(filed, Filed::Created(_)));
        assert_eq!(tracker.created.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn disabled_check_skips_listing() {
        let tracker = FakeTracker::with_titles(&["Typo"]);
        let repo = Repository::new("acme", "widgets").unwrap();

        let filed = file_issue(&tracker, &repo, &draft("Typo"), false).await.unwrap();

        assert!(matches!(filed, Filed::Created(_)));
        assert!(tracker.listed.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn non_created_status_is_a_rejection() {
        let tracker = FakeTracker {
            create_status: Some(422),
            ..Default::default()
        };
        let repo = Repository::new("acme", "widgets").unwrap();

        let filed = file_issue(&tracker, &repo, &draft("New"), true).await.unwrap();

        assert_eq!(filed, Filed::Rejected(Rejection::Status(422)));
        assert_eq!(tracker.calls(), 2);
    }

    #[tokio::test]
    async fn listing_failure_propagates() {
        let tracker = FakeTracker {
            fail_listing: true,
            ..Default::default()
        };
        let repo = Repository::new("acme", "widgets").unwrap();

        assert!(file_issue(&tracker, &repo, &draft("New"), true).await.is_err());
        assert!(tracker.created.lock().unwrap().is_empty());
    }
}
