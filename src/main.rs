use std::{process, sync::Arc};

use poise::serenity_prelude as serenity;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::{
    ctx_data::CtxData,
    integrations::github::GitHub,
    settings::{Loaded, Settings},
};

mod commands;
mod ctx_data;
mod dispatch;
mod forms;
mod framework;
mod handler;
mod integrations;
mod issue;
mod settings;
mod tasks;

pub type Data = Arc<CtxData>;
pub type Error = anyhow::Error;
pub type Result<T, E = Error> = std::result::Result<T, E>;
pub type Context<'a> = poise::Context<'a, Data, Error>;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let settings = match Settings::load() {
        Ok(Loaded::Ready(settings)) => settings,
        Ok(Loaded::TemplateWritten(path)) => {
            error!(
                "Configuration file not found, a template was written to {}. Fill it in and restart.",
                path.display()
            );
            process::exit(1);
        }
        Err(e) => {
            error!("Invalid configuration: {e}");
            process::exit(1);
        }
    };

    let token = settings.discord.token.clone();
    let tracker = Arc::new(GitHub::new(&settings.github.token)?);
    let ctx_data = Arc::new(CtxData::new(settings, tracker));

    let options = poise::FrameworkOptions {
        commands: commands::commands(&ctx_data.settings),
        on_error: |error| Box::pin(framework::on_error(error)),
        event_handler: |ctx, event, framework, data| {
            Box::pin(handler::event_handler(ctx, event, framework, data))
        },
        ..Default::default()
    };

    let framework = poise::Framework::builder()
        .options(options)
        .setup(move |ctx, _ready, framework| {
            Box::pin(async move {
                info!("Registering commands globally...");
                poise::builtins::register_globally(ctx, &framework.options().commands).await?;
                tasks::start_tasks(&ctx_data);
                Ok(ctx_data)
            })
        })
        .build();

    let mut client = serenity::ClientBuilder::new(token, serenity::GatewayIntents::empty())
        .framework(framework)
        .await?;

    client.start().await?;

    Ok(())
}
