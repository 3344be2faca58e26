use crate::discord::{Context, Error};

/// Reply with the current gateway heartbeat latency.
#[poise::command(slash_command)]
pub async fn ping(ctx: Context<'_>) -> Result<(), Error> {
    let latency = ctx.ping().await;
    ctx.say(format!("Pong! {}ms", latency.as_millis())).await?;
    Ok(())
}
