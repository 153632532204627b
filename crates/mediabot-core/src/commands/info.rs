use async_trait::async_trait;

use super::{BotContext, Command, Invocation, Reply};
use crate::errors::Result;

pub struct HelpCommand;

#[async_trait]
impl Command for HelpCommand {
    fn help(&self, _ctx: &BotContext) -> Option<String> {
        Some("Shows command help".into())
    }

    async fn execute(&self, ctx: &BotContext, inv: Invocation<'_>) -> Result<Reply> {
        Ok(Some(inv.table.help_listing(ctx, inv.user)))
    }
}

pub struct AboutCommand;

#[async_trait]
impl Command for AboutCommand {
    fn help(&self, _ctx: &BotContext) -> Option<String> {
        Some("Shows information about this bot".into())
    }

    async fn execute(&self, _ctx: &BotContext, _inv: Invocation<'_>) -> Result<Reply> {
        Ok(Some(format!(
            "{} {}\nText command media bot",
            env!("CARGO_PKG_NAME"),
            env!("CARGO_PKG_VERSION")
        )))
    }
}

pub struct ServiceCommand;

impl ServiceCommand {
    async fn summary(ctx: &BotContext) -> String {
        format!(
            "Current service: {}\nAvailable: {}",
            ctx.services.current().await.name(),
            ctx.services.names().join(", ")
        )
    }
}

#[async_trait]
impl Command for ServiceCommand {
    fn help(&self, _ctx: &BotContext) -> Option<String> {
        Some("SERVICE Selects a service to play from. If no service is given shows current service and a list of available ones".into())
    }

    async fn execute(&self, ctx: &BotContext, inv: Invocation<'_>) -> Result<Reply> {
        if inv.arg.is_empty() {
            return Ok(Some(Self::summary(ctx).await));
        }
        if ctx.services.select(inv.arg).await {
            Ok(Some(format!(
                "Current service: {}",
                ctx.services.current().await.name()
            )))
        } else {
            Ok(Some(format!("Unknown service.\n{}", Self::summary(ctx).await)))
        }
    }
}
