use std::sync::Arc;

use tracing::{debug, error, warn};

use crate::{
    commands::{Notify, CREATE_ISSUE},
    forms::{self, PendingForm, PendingForms},
    issue::{self, CreatedIssue, Filed, IssueDraft, IssueTracker, Rejection, Repository},
    settings::Settings,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandInvocation {
    pub user: u64,
    pub name: String,
    /// Index into the configured repositories, as registered in the choices.
    pub repository: usize,
    pub notify: Notify,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormSubmission {
    pub user: u64,
    pub custom_id: String,
    pub draft: IssueDraft,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Command(CommandInvocation),
    Submission(FormSubmission),
}

impl Event {
    fn user(&self) -> u64 {
        match self {
            Event::Command(command) => command.user,
            Event::Submission(submission) => submission.user,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub content: String,
    pub ephemeral: bool,
}

impl Reply {
    fn private(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ephemeral: true,
        }
    }

    fn public(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ephemeral: false,
        }
    }
}

/// Terminal state of a received submission.
#[derive(Debug)]
pub enum Submission {
    IssueCreated {
        repository: Repository,
        issue: CreatedIssue,
        notify: Notify,
    },
    IssueRejected {
        repository: Repository,
        rejection: Rejection,
    },
    Error(anyhow::Error),
}

impl Submission {
    pub fn reply(&self) -> Reply {
        match self {
            Submission::IssueCreated {
                repository,
                issue,
                notify,
            } => {
                let content = format!(
                    "Issue #[{}]({}) created in {}.",
                    issue.number,
                    issue.html_url,
                    repository.link()
                );
                match notify {
                    Notify::Public => Reply::public(content),
                    Notify::Private => Reply::private(content),
                }
            }
            Submission::IssueRejected {
                repository,
                rejection: Rejection::Duplicate,
            } => Reply::private(format!(
                "An issue with the same title already exists in {}.",
                repository.link()
            )),
            Submission::IssueRejected {
                rejection: Rejection::Status(status),
                ..
            } => Reply::public(format!("Failed to create issue\n\nStatus: {status}")),
            Submission::Error(_) => Reply::private("Internal error, try again."),
        }
    }
}

#[derive(Debug)]
pub enum Transition {
    /// Not ours or not allowed; nothing is sent back.
    Ignored,
    FormPresented { custom_id: String },
    /// The form is unknown, already used or past its lifetime.
    Expired,
    Finished(Submission),
}

impl Transition {
    pub fn reply(&self) -> Option<Reply> {
        match self {
            Transition::Ignored | Transition::FormPresented { .. } => None,
            Transition::Expired => Some(expired_reply()),
            Transition::Finished(submission) => Some(submission.reply()),
        }
    }
}

pub fn expired_reply() -> Reply {
    Reply::private(format!("This form has expired, run /{CREATE_ISSUE} again."))
}

/// A submission matched to its pending form, not filed yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Received {
    pub repository: Repository,
    pub notify: Notify,
    pub draft: IssueDraft,
}

impl Received {
    /// Visibility of the acknowledgement sent while the issue is filed.
    pub fn acknowledge_ephemeral(&self) -> bool {
        self.notify != Notify::Public
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Claim {
    Ignored,
    Expired,
    Received(Received),
}

/// How a reply reaches the user once the interaction was deferred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// The deferred message already has the right visibility.
    EditDeferred,
    /// Visibility differs: drop the deferred message and send a followup.
    ReplaceDeferred,
}

impl Reply {
    pub fn delivery(&self, deferred_ephemeral: bool) -> Delivery {
        if self.ephemeral == deferred_ephemeral {
            Delivery::EditDeferred
        } else {
            Delivery::ReplaceDeferred
        }
    }
}

/// Entry point for every interaction the bot reacts to.
pub struct Dispatcher {
    allowed_user: u64,
    repositories: Vec<Repository>,
    duplicate_check: bool,
    forms: Arc<PendingForms>,
    tracker: Arc<dyn IssueTracker>,
}

impl Dispatcher {
    pub fn new(settings: &Settings, forms: Arc<PendingForms>, tracker: Arc<dyn IssueTracker>) -> Self {
        Self {
            allowed_user: settings.discord.allowed_user,
            repositories: settings.github.repositories.clone(),
            duplicate_check: settings.github.duplicate_check,
            forms,
            tracker,
        }
    }

    fn authorized(&self, user: u64) -> bool {
        if user != self.allowed_user {
            debug!("dropping interaction from unauthorized user {user}");
            return false;
        }
        true
    }

    pub async fn handle(&self, event: Event) -> Transition {
        if !self.authorized(event.user()) {
            return Transition::Ignored;
        }

        match event {
            Event::Command(command) => self.present_form(command),
            Event::Submission(submission) => match self.claim(submission) {
                Claim::Ignored => Transition::Ignored,
                Claim::Expired => Transition::Expired,
                Claim::Received(received) => Transition::Finished(self.file(received).await),
            },
        }
    }

    fn present_form(&self, command: CommandInvocation) -> Transition {
        if command.name != CREATE_ISSUE {
            return Transition::Ignored;
        }

        let Some(repository) = self.repositories.get(command.repository) else {
            warn!("repository choice {} is not configured", command.repository);
            return Transition::Ignored;
        };

        let id = self.forms.open(PendingForm {
            repository: repository.clone(),
            notify: command.notify,
            user: command.user,
        });
        debug!("presenting issue form {id} for {repository}");

        Transition::FormPresented {
            custom_id: forms::custom_id(&id),
        }
    }

    /// Matches a submission to its pending form without touching the code
    /// host, so the caller can acknowledge the interaction first.
    pub fn claim(&self, submission: FormSubmission) -> Claim {
        if !self.authorized(submission.user) || !forms::is_form_custom_id(&submission.custom_id) {
            return Claim::Ignored;
        }

        let pending = forms::parse_custom_id(&submission.custom_id)
            .and_then(|id| self.forms.take(&id, submission.user));
        match pending {
            Some(PendingForm {
                repository, notify, ..
            }) => Claim::Received(Received {
                repository,
                notify,
                draft: submission.draft,
            }),
            None => Claim::Expired,
        }
    }

    pub async fn file(&self, received: Received) -> Submission {
        let Received {
            repository,
            notify,
            draft,
        } = received;

        let filed =
            issue::file_issue(self.tracker.as_ref(), &repository, &draft, self.duplicate_check)
                .await;

        match filed {
            Ok(Filed::Created(issue)) => Submission::IssueCreated {
                repository,
                issue,
                notify,
            },
            Ok(Filed::Rejected(rejection)) => Submission::IssueRejected {
                repository,
                rejection,
            },
            Err(e) => {
                error!("filing issue in {repository} failed: {e:?}");
                Submission::Error(e)
            }
        }
    }
}
