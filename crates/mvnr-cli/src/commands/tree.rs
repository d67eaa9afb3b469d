//! `mvnr tree`: print the mediated dependency tree

use anyhow::{bail, Context, Result};

use mvnr_core::types::Scope;
use mvnr_resolver::{CollectResult, NodeStatus};

use super::{CommandContext, ResolveOptions, Session};

pub async fn execute(scope: Option<Scope>, ctx: &CommandContext) -> Result<()> {
    let result = collect(scope, ctx).await?;

    ctx.output.plain(result.tree.render().trim_end());
    for conflict in &result.conflicts {
        ctx.output.warn(&conflict.to_string());
    }
    for error in &result.errors {
        ctx.output.error(&format!("{}: {}", error.coordinate, error.error));
    }

    let included = result.tree.count(|s| matches!(s, NodeStatus::Included));
    let omitted = result.tree.count(|s| {
        matches!(s, NodeStatus::OmittedForNearer { .. } | NodeStatus::OmittedForCycle)
    });
    ctx.output
        .info(&format!("{included} artifacts included, {omitted} omitted"));

    if result.has_errors() {
        bail!("{} dependencies could not be collected", result.errors.len());
    }
    Ok(())
}

/// Collect the tree for the project in `ctx`
pub async fn collect(scope: Option<Scope>, ctx: &CommandContext) -> Result<CollectResult> {
    let options = ResolveOptions {
        scope,
        ..ResolveOptions::default()
    };
    let session = Session::open(ctx, &options).await?;
    let collector = session.resolver.collector().clone();
    let request = session.request;

    let result = tokio::task::spawn_blocking(move || collector.collect(&request))
        .await
        .context("dependency collection panicked")??;
    Ok(result)
}
