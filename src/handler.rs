use poise::{
    serenity_prelude::{self as serenity, FullEvent, Interaction},
    Modal as _,
};
use tracing::info;

use crate::{
    commands::IssueForm,
    dispatch::{self, Claim, Delivery, FormSubmission, Reply},
    forms, Data, Error, Result,
};

pub fn response(reply: &Reply) -> serenity::CreateInteractionResponse {
    serenity::CreateInteractionResponse::Message(
        serenity::CreateInteractionResponseMessage::new()
            .content(reply.content.clone())
            .ephemeral(reply.ephemeral),
    )
}

pub async fn event_handler(
    ctx: &serenity::Context,
    event: &FullEvent,
    _framework: poise::FrameworkContext<'_, Data, Error>,
    data: &Data,
) -> Result<()> {
    match event {
        FullEvent::Ready { data_about_bot } => {
            info!("{} is connected!", data_about_bot.user.name);
        }
        FullEvent::InteractionCreate {
            interaction: Interaction::Modal(modal),
        } => on_modal_submit(ctx, modal, data).await?,
        _ => {}
    }

    Ok(())
}

async fn on_modal_submit(
    ctx: &serenity::Context,
    modal: &serenity::ModalInteraction,
    data: &Data,
) -> Result<()> {
    if !forms::is_form_custom_id(&modal.data.custom_id) {
        return Ok(());
    }

    let form = IssueForm::parse(modal.data.clone())
        .map_err(|e| anyhow::anyhow!("malformed issue form: {e}"))?;

    let submission = FormSubmission {
        user: modal.user.id.get(),
        custom_id: modal.data.custom_id.clone(),
        draft: form.into(),
    };

    let received = match data.dispatcher.claim(submission) {
        Claim::Ignored => return Ok(()),
        Claim::Expired => {
            let reply = dispatch::expired_reply();
            modal.create_response(&ctx.http, response(&reply)).await?;
            return Ok(());
        }
        Claim::Received(received) => received,
    };

    // Filing may outlast the interaction deadline, acknowledge first
    let deferred_ephemeral = received.acknowledge_ephemeral();
    modal
        .create_response(
            &ctx.http,
            serenity::CreateInteractionResponse::Defer(
                serenity::CreateInteractionResponseMessage::new().ephemeral(deferred_ephemeral),
            ),
        )
        .await?;

    let reply = data.dispatcher.file(received).await.reply();
    match reply.delivery(deferred_ephemeral) {
        Delivery::EditDeferred => {
            modal
                .edit_response(
                    &ctx.http,
                    serenity::EditInteractionResponse::new().content(reply.content),
                )
                .await?;
        }
        Delivery::ReplaceDeferred => {
            modal.delete_response(&ctx.http).await?;
            modal
                .create_followup(
                    &ctx.http,
                    serenity::CreateInteractionResponseFollowup::new()
                        .content(reply.content)
                        .ephemeral(reply.ephemeral),
                )
                .await?;
        }
    }

    Ok(())
}
