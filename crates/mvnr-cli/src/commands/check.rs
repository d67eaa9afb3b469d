//! `mvnr check`: validate the manifest and settings

use anyhow::Result;

use mvnr_config::{ConfigSource, EffectiveConfig};

use super::CommandContext;

pub async fn execute(ctx: &CommandContext) -> Result<()> {
    let config = ctx.loader().load(Default::default()).await?;
    for line in summarize(&config) {
        ctx.output.plain(&line);
    }
    ctx.output.success("Configuration is valid");
    Ok(())
}

fn describe(source: &ConfigSource) -> String {
    match source {
        ConfigSource::Default => "default".to_string(),
        ConfigSource::Global(path) | ConfigSource::Project(path) => path.to_string(),
        ConfigSource::Environment(name) => format!("${name}"),
        ConfigSource::CommandLine => "command line".to_string(),
    }
}

/// Human readable summary of the effective configuration
pub fn summarize(config: &EffectiveConfig) -> Vec<String> {
    let mut lines = vec![
        format!("manifest: {}", config.manifest_path),
        format!("project: {}", config.root),
        format!(
            "dependencies: {} declared, {} managed",
            config.dependencies.len(),
            config.managed.len()
        ),
        format!(
            "local repository: {} ({})",
            config.local_repository.value,
            describe(&config.local_repository.source)
        ),
        format!(
            "offline: {} ({})",
            config.offline.value,
            describe(&config.offline.source)
        ),
        format!("jobs: {} ({})", config.jobs.value, describe(&config.jobs.source)),
    ];
    for repository in &config.repositories {
        lines.push(format!("repository {}: {}", repository.id, repository.url));
    }
    for mirror in &config.mirrors {
        lines.push(format!("mirror {}: {} (of {})", mirror.id, mirror.url, mirror.mirror_of));
    }
    lines
}
