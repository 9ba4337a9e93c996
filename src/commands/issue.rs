use std::sync::atomic::Ordering;

use poise::Modal as _;

use crate::{
    dispatch::{CommandInvocation, Event, Transition},
    handler::response,
    issue::IssueDraft,
    Context, Result,
};

pub const CREATE_ISSUE: &str = "createissue";

#[derive(Debug, Clone, Copy, PartialEq, Eq, poise::ChoiceParameter)]
pub enum Notify {
    #[name = "Publicly notify the channel"]
    Public,
    #[name = "Do not notify the channel"]
    Private,
}

impl Default for Notify {
    fn default() -> Self {
        Self::Private
    }
}

#[derive(Debug, poise::Modal)]
#[name = "Create Issue"]
pub struct IssueForm {
    #[name = "Issue Title"]
    pub issuetitle: String,
    #[name = "Issue Description"]
    #[paragraph]
    pub issuedescription: String,
}

impl From<IssueForm> for IssueDraft {
    fn from(form: IssueForm) -> Self {
        Self {
            title: form.issuetitle,
            body: form.issuedescription,
        }
    }
}

/// Create an issue in a GitHub repository
#[poise::command(
    slash_command,
    rename = "createissue",
    install_context = "User",
    interaction_context = "Guild|BotDm|PrivateChannel"
)]
pub async fn create_issue(
    ctx: Context<'_>,
    #[description = "The repository to create the issue in."] repository: u32,
    #[description = "Should the bot send a public message to the channel when the issue is created?"]
    shouldnotify: Option<Notify>,
) -> Result<()> {
    let poise::Context::Application(app) = ctx else {
        return Ok(());
    };

    let event = Event::Command(CommandInvocation {
        user: ctx.author().id.get(),
        name: ctx.command().name.clone(),
        repository: repository as usize,
        notify: shouldnotify.unwrap_or_default(),
    });

    let transition = ctx.data().dispatcher.handle(event).await;
    let builder = match transition {
        Transition::FormPresented { custom_id } => IssueForm::create(None, custom_id),
        other => match other.reply() {
            Some(reply) => response(&reply),
            None => return Ok(()),
        },
    };

    app.interaction
        .create_response(ctx.serenity_context(), builder)
        .await?;
    app.has_sent_initial_response.store(true, Ordering::SeqCst);

    Ok(())
}
