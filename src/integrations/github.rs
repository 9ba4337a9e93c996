use async_trait::async_trait;
use octocrab::{params, Octocrab, OctocrabBuilder};
use serde_derive::Deserialize;

use crate::{
    issue::{CreateResponse, CreatedIssue, IssueDraft, IssueTracker, Repository, CREATED},
    Result,
};

const API_URL: &str = "https://api.github.com";

/// GitHub REST API backed by a personal access token.
pub struct GitHub {
    octo: Octocrab,
}

#[derive(Debug, Deserialize)]
struct IssueBody {
    number: u64,
    html_url: String,
}

impl GitHub {
    pub fn new(token: &str) -> Result<Self> {
        Self::with_base_uri(token, API_URL)
    }

    pub fn with_base_uri(token: &str, base_uri: &str) -> Result<Self> {
        let octo = OctocrabBuilder::default()
            .personal_token(token.to_string())
            .base_uri(base_uri)?
            .build()?;

        Ok(Self { octo })
    }
}

#[async_trait]
impl IssueTracker for GitHub {
    async fn open_issue_titles(&self, repo: &Repository) -> Result<Vec<String>> {
        let page = self
            .octo
            .issues(repo.owner.clone(), repo.name.clone())
            .list()
            .state(params::State::Open)
            .per_page(100)
            .send()
            .await?;

        let issues = self.octo.all_pages(page).await?;
        Ok(issues.into_iter().map(|issue| issue.title).collect())
    }

    async fn create_issue(&self, repo: &Repository, draft: &IssueDraft) -> Result<CreateResponse> {
        let route = format!("/repos/{}/{}/issues", repo.owner, repo.name);
        let body = serde_json::json!({
            "title": draft.title,
            "body": draft.body
        });

        // The raw route keeps the status; the typed builder accepts any 2xx
        let response = match self.octo._post(route, Some(&body)).await {
            Ok(response) => response,
            Err(octocrab::Error::GitHub { source, .. }) => {
                return Ok(CreateResponse::status(source.status_code.as_u16()))
            }
            Err(e) => return Err(e.into()),
        };

        let status = response.status().as_u16();
        if status != CREATED {
            return Ok(CreateResponse::status(status));
        }

        let text = self.octo.body_to_string(response).await?;
        let issue: IssueBody = serde_json::from_str(&text)?;
        Ok(CreateResponse::created(CreatedIssue {
            number: issue.number,
            html_url: issue.html_url,
        }))
    }
}
