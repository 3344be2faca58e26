// Discord commands for the Planner bridge.
//
// **Notice the pattern:**
// 1. Extract primitive data from Discord types
// 2. Resolve identities via the mapping tables
// 3. Call the core service
// 4. Format the response and reply
//
// This layer is THIN - no business logic, just translation. Handlers that
// hit Graph defer the interaction first; list output goes through the
// splitter, one follow-up message per chunk.

use crate::core::formatting::{
    render_channel_task_block, render_user_block, render_user_task_block, split_messages,
    MAX_MESSAGE_LENGTH,
};
use crate::core::mappings::MappingTables;
use crate::core::planner::{filter_by_status, PlannerService, TaskStatus};
use crate::discord::watchdog::OfflineWatchdog;
use crate::infra::graph::GraphApiClient;
use poise::serenity_prelude as serenity;

/// List users from the Microsoft directory.
#[poise::command(slash_command)]
pub async fn list_users(ctx: Context<'_>) -> Result<(), Error> {
    ctx.defer().await?;

    let users = match ctx.data().planner.directory_users().await {
        Ok(users) => users,
        Err(e) => {
            tracing::error!("Failed to fetch directory users: {e}");
            ctx.say("Failed to fetch users.").await?;
            return Ok(());
        }
    };

    if users.is_empty() {
        ctx.say("No users were found.").await?;
        return Ok(());
    }

    let mappings = &ctx.data().mappings;
    let blocks: Vec<String> = users
        .iter()
        .map(|user| render_user_block(user, mappings.discord_user_for(&user.id)))
        .collect();

    for message in split_messages(&blocks, MAX_MESSAGE_LENGTH) {
        ctx.say(message).await?;
    }

    Ok(())
}

/// List a user's tasks from Microsoft Planner.
#[poise::command(slash_command)]
pub async fn user_tasks(
    ctx: Context<'_>,
    #[description = "The user whose tasks to list"] user: serenity::User,
    #[description = "Filter tasks by status"] status: Option<StatusChoice>,
) -> Result<(), Error> {
    ctx.defer().await?;

    let data = ctx.data();
    let discord_id = user.id.get().to_string();
    let Some(graph_user_id) = data.mappings.graph_user_for_discord(&discord_id) else {
        ctx.say("No matching user ID found for the provided Discord ID")
            .await?;
        return Ok(());
    };

    let summaries = match data.planner.tasks_for_user(graph_user_id).await {
        Ok(summaries) => summaries,
        Err(e) => {
            tracing::error!("Failed to fetch tasks for user {graph_user_id}: {e}");
            ctx.say("No tasks were found for the user.").await?;
            return Ok(());
        }
    };

    if summaries.is_empty() {
        ctx.say("No tasks were found for the user.").await?;
        return Ok(());
    }

    let filtered = filter_by_status(summaries, status.map(TaskStatus::from));
    if filtered.is_empty() {
        ctx.say("No tasks found with the given status.").await?;
        return Ok(());
    }

    let blocks: Vec<String> = filtered.iter().map(render_user_task_block).collect();
    for message in split_messages(&blocks, MAX_MESSAGE_LENGTH) {
        ctx.say(message).await?;
    }

    Ok(())
}

/// List tasks for a specified channel, or the current channel if none is
/// specified.
#[poise::command(slash_command)]
pub async fn channel_tasks(
    ctx: Context<'_>,
    #[description = "The channel to list tasks for"]
    #[channel_types("Text")]
    channel: Option<serenity::Channel>,
    #[description = "The status of the tasks to list"] status: Option<StatusChoice>,
) -> Result<(), Error> {
    ctx.defer().await?;

    let data = ctx.data();
    let channel_key = channel
        .map(|c| c.id())
        .unwrap_or_else(|| ctx.channel_id())
        .get()
        .to_string();
    let Some(bucket_id) = data.mappings.bucket_for_channel(&channel_key) else {
        ctx.say("No bucket is mapped to the requested channel.")
            .await?;
        return Ok(());
    };

    let summaries = match data.planner.tasks_for_bucket(bucket_id).await {
        Ok(summaries) => summaries,
        Err(e) => {
            tracing::error!("Failed to fetch tasks for bucket {bucket_id}: {e}");
            ctx.say("No tasks were found for this channel.").await?;
            return Ok(());
        }
    };

    if summaries.is_empty() {
        ctx.say("No tasks were found for this channel.").await?;
        return Ok(());
    }

    let filtered = filter_by_status(summaries, status.map(TaskStatus::from));
    if filtered.is_empty() {
        ctx.say("No tasks found for this channel with the given status.")
            .await?;
        return Ok(());
    }

    let blocks: Vec<String> = filtered.iter().map(render_channel_task_block).collect();
    for message in split_messages(&blocks, MAX_MESSAGE_LENGTH) {
        ctx.say(message).await?;
    }

    Ok(())
}

/// Create a Planner task assigned to a user.
#[poise::command(slash_command)]
pub async fn create_task(
    ctx: Context<'_>,
    #[description = "The user to assign the task to"] user: serenity::User,
    #[description = "The title of the task to create"] task_title: String,
    #[description = "The channel whose bucket receives the task"]
    #[channel_types("Text")]
    bucket: Option<serenity::Channel>,
) -> Result<(), Error> {
    ctx.defer().await?;

    let data = ctx.data();
    let discord_id = user.id.get().to_string();
    let Some(graph_user_id) = data.mappings.graph_user_for_discord(&discord_id) else {
        ctx.say("No matching user ID found for the provided Discord ID")
            .await?;
        return Ok(());
    };

    let channel_key = bucket
        .map(|c| c.id())
        .unwrap_or_else(|| ctx.channel_id())
        .get()
        .to_string();
    let Some(bucket_id) = data.mappings.bucket_for_channel(&channel_key) else {
        ctx.say("No bucket is mapped to the requested channel.")
            .await?;
        return Ok(());
    };

    match data
        .planner
        .assign_task(graph_user_id, bucket_id, &task_title)
        .await
    {
        Ok(()) => {
            ctx.say("Task created successfully.").await?;
        }
        Err(e) => {
            tracing::error!("Failed to create Planner task: {e}");
            ctx.say("Failed to create task.").await?;
        }
    }

    Ok(())
}

/// Status filter options exposed on the slash commands.
#[derive(Debug, Clone, Copy, poise::ChoiceParameter)]
pub enum StatusChoice {
    #[name = "Not Started"]
    NotStarted,
    #[name = "In Progress"]
    InProgress,
    #[name = "Completed"]
    Completed,
}

impl From<StatusChoice> for TaskStatus {
    fn from(choice: StatusChoice) -> Self {
        match choice {
            StatusChoice::NotStarted => TaskStatus::NotStarted,
            StatusChoice::InProgress => TaskStatus::InProgress,
            StatusChoice::Completed => TaskStatus::Completed,
        }
    }
}

/// Type alias for our bot's context.
/// This is what every command receives as its first parameter.
pub type Error = Box<dyn std::error::Error + Send + Sync>;
pub type Context<'a> = poise::Context<'a, Data, Error>;

/// Data that's shared across all commands.
/// This is where we store our services and configuration.
use std::sync::Arc;

pub struct Data {
    pub planner: Arc<PlannerService<GraphApiClient>>,
    pub mappings: Arc<MappingTables>,
    pub watchdog: Arc<OfflineWatchdog>,
}
