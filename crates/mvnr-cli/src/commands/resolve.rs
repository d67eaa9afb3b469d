//! `mvnr resolve`: fetch every included artifact and print its file

use std::time::Instant;

use anyhow::{Context, Result};

use mvnr_resolver::ArtifactResolutionResult;

use super::{CommandContext, ResolveOptions, Session};

pub async fn execute(options: ResolveOptions, ctx: &CommandContext) -> Result<()> {
    let started = Instant::now();
    let result = run(&options, ctx).await?;

    for artifact in &result.artifacts {
        let file = artifact.file.as_ref().map_or("-", |f| f.as_str());
        ctx.output
            .plain(&format!("{} ({}) {}", artifact.coordinate, artifact.scope, file));
    }
    for conflict in &result.conflicts {
        ctx.output.warn(&conflict.to_string());
    }
    for coordinate in &result.missing {
        ctx.output.error(&format!("{coordinate} was not found"));
    }

    let resolved = result.artifacts.len();
    result.ensure_complete()?;
    ctx.output.success(&format!(
        "Resolved {resolved} artifacts in {:.2}s",
        started.elapsed().as_secs_f64()
    ));
    Ok(())
}

/// Collect and resolve the project in `ctx`
pub async fn run(options: &ResolveOptions, ctx: &CommandContext) -> Result<ArtifactResolutionResult> {
    let session = Session::open(ctx, options).await?;
    let resolver = session.resolver;
    let request = session.request;

    let result = tokio::task::spawn_blocking(move || resolver.resolve(&request))
        .await
        .context("artifact resolution panicked")??;
    Ok(result)
}
