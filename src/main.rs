// This is the entry point of the Planner bridge bot.
//
// **Architecture Overview:**
// - `core/` = Business logic (platform-agnostic)
// - `infra/` = Implementations of core traits (the Graph API client)
// - `discord/` = Discord-specific adapters (commands, watchdog)
//
// This file's job is to:
// 1. Load configuration (fail-fast on a bad config file)
// 2. Initialize services (dependency injection)
// 3. Set up the Discord framework
// 4. Wire gateway events to the offline watchdog

// These attrs point each module declaration at a more descriptive root file
// so we don't end up with half a dozen mod.rs files that all look the same.
#[path = "core/core_layer.rs"]
mod core;
#[path = "discord/discord_layer.rs"]
mod discord;
#[path = "infra/infra_layer.rs"]
mod infra;

mod config;

use std::sync::Arc;

use anyhow::Context as _;

use crate::config::{load_config, DEFAULT_CONFIG_PATH};
use crate::core::mappings::MappingTables;
use crate::core::planner::PlannerService;
use crate::discord::watchdog::OfflineWatchdog;
use crate::discord::{Data, Error};
use crate::infra::graph::GraphApiClient;
use poise::serenity_prelude as serenity;

/// Event handler for non-command Discord events.
/// Its only job is keeping the watchdog in sync with the gateway.
async fn event_handler(
    ctx: &serenity::Context,
    event: &serenity::FullEvent,
    _framework: poise::FrameworkContext<'_, Data, Error>,
    data: &Data,
) -> Result<(), Error> {
    match event {
        serenity::FullEvent::Ready { data_about_bot } => {
            tracing::info!("{} is ready", data_about_bot.user.name);
            data.watchdog.mark_connected();
        }
        serenity::FullEvent::Resume { .. } => {
            tracing::info!("Gateway session resumed");
            data.watchdog.mark_connected();
        }
        serenity::FullEvent::ShardStageUpdate { event } => match event.new {
            serenity::ConnectionStage::Disconnected => {
                tracing::warn!("Gateway disconnected, arming offline alert");
                data.watchdog.mark_disconnected(ctx.http.clone());
            }
            serenity::ConnectionStage::Connected => {
                data.watchdog.mark_connected();
            }
            _ => {}
        },
        _ => {}
    }

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging so we can see what's happening
    tracing_subscriber::fmt::init();

    // Load environment variables from .env file (if it exists)
    dotenv::dotenv().ok();

    let config_path =
        std::env::var("PLANNER_BOT_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());

    // A bot without its credentials and mapping tables cannot do anything
    // useful, so a bad config file ends the process here.
    let config = match load_config(&config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    };

    // ========================================================================
    // DEPENDENCY INJECTION
    // ========================================================================
    // Create our services with their dependencies.
    // This is the "composition root" where we wire everything together.

    let mappings = Arc::new(MappingTables::from_config(&config.mappings));

    let graph_client = GraphApiClient::new(
        &config.azure.tenant_id,
        &config.azure.client_id,
        &config.azure.client_secret,
    );
    let planner = Arc::new(PlannerService::new(
        graph_client,
        Arc::clone(&mappings),
        config.azure.plan_id.clone(),
    ));

    let watchdog = Arc::new(OfflineWatchdog::new(config.discord.log_channel_id));

    // Create the data structure that will be shared across all commands
    let data = Data {
        planner,
        mappings,
        watchdog,
    };

    // ========================================================================
    // DISCORD FRAMEWORK SETUP
    // ========================================================================
    // Configure the poise framework with our commands and settings.

    let intents = serenity::GatewayIntents::GUILDS | serenity::GatewayIntents::GUILD_MEMBERS;

    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            // Register all our commands here
            commands: vec![
                discord::commands::ping::ping(),
                discord::commands::planner::list_users(),
                discord::commands::planner::user_tasks(),
                discord::commands::planner::channel_tasks(),
                discord::commands::planner::create_task(),
            ],
            // Event handler for gateway connection events
            event_handler: |ctx, event, framework, data| {
                Box::pin(event_handler(ctx, event, framework, data))
            },
            ..Default::default()
        })
        .setup(|ctx, _ready, framework| {
            Box::pin(async move {
                // Register slash commands globally (can take up to an hour
                // to propagate). For faster development, use
                // register_in_guild instead.
                poise::builtins::register_globally(ctx, &framework.options().commands).await?;
                tracing::info!("Commands registered");
                Ok(data)
            })
        })
        .build();

    let mut client = serenity::ClientBuilder::new(config.discord.token, intents)
        .framework(framework)
        .await
        .context("failed to create Discord client")?;

    client.start().await.context("bot terminated with an error")?;

    Ok(())
}
