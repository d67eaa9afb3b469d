//! Command implementations and dispatch logic.
//!
//! Each command loads the effective configuration, builds a `Session` from
//! it and runs the blocking resolution work off the async runtime.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use camino::Utf8PathBuf;
use tracing::info;

use mvnr_cache::{LocalRepository, RepositoryRegistry};
use mvnr_config::merge::{CLI_JOBS, CLI_OFFLINE};
use mvnr_config::{ConfigLoader, EffectiveConfig};
use mvnr_core::types::Scope;
use mvnr_repository::FileTransport;
use mvnr_resolver::{
    ArtifactResolver, CollectRequest, DebugResolutionListener, DependencyCollector, ManagedVersionMap,
    ScopeFilter, TransitiveResolver, WarningResolutionListener,
};

use crate::descriptor::DescriptorMetadataSource;
use crate::output::OutputHandler;
use crate::Commands;

pub mod check;
pub mod resolve;
pub mod tree;


/// Shared context for all commands
#[derive(Debug, Clone)]
pub struct CommandContext {
    /// Where the manifest search starts
    pub cwd: Utf8PathBuf,
    /// Overrides the home directory holding settings and the default local
    /// repository
    pub home: Option<Utf8PathBuf>,
    pub output: OutputHandler,
    pub verbose: bool,
}

impl CommandContext {
    pub fn new(directory: Option<Utf8PathBuf>, verbose: bool) -> Result<Self> {
        let cwd = match directory {
            Some(directory) => directory,
            None => {
                let cwd = std::env::current_dir().context("Failed to get current directory")?;
                Utf8PathBuf::from_path_buf(cwd)
                    .map_err(|path| anyhow!("Current directory {} is not valid UTF-8", path.display()))?
            },
        };
        Ok(Self {
            cwd,
            home: None,
            output: OutputHandler::new(),
            verbose,
        })
    }

    pub fn loader(&self) -> ConfigLoader {
        let loader = ConfigLoader::new(self.cwd.clone());
        match &self.home {
            Some(home) => loader.with_home(home.clone()),
            None => loader,
        }
    }
}

/// Options shared by the commands that collect or resolve
#[derive(Debug, Clone, Default)]
pub struct ResolveOptions {
    /// Classpath to restrict the result to
    pub scope: Option<Scope>,
    pub offline: bool,
    pub force: bool,
    pub jobs: Option<usize>,
}

impl ResolveOptions {
    fn cli_overrides(&self) -> HashMap<String, String> {
        let mut overrides = HashMap::new();
        if self.offline {
            overrides.insert(CLI_OFFLINE.to_string(), "true".to_string());
        }
        if let Some(jobs) = self.jobs {
            overrides.insert(CLI_JOBS.to_string(), jobs.to_string());
        }
        overrides
    }
}

/// Everything needed to run one resolution for the current project
#[derive(Debug)]
pub struct Session {
    pub config: EffectiveConfig,
    pub request: CollectRequest,
    pub resolver: TransitiveResolver,
}

impl Session {
    pub async fn open(ctx: &CommandContext, options: &ResolveOptions) -> Result<Self> {
        let config = ctx.loader().load(options.cli_overrides()).await?;
        info!(
            "local repository {} ({:?})",
            config.local_repository.value, config.local_repository.source
        );

        let local = LocalRepository::new(config.local_repository.value.clone());
        let registry = RepositoryRegistry::new(local.clone(), config.repositories.clone())
            .with_mirrors(config.mirrors.clone())
            .with_online(!config.offline.value);

        let mut collector = DependencyCollector::new(Arc::new(DescriptorMetadataSource::new(local)))
            .with_listener(Arc::new(WarningResolutionListener::new()));
        if ctx.verbose {
            collector = collector.with_listener(Arc::new(DebugResolutionListener));
        }
        let resolver = TransitiveResolver::new(
            collector,
            ArtifactResolver::new(registry, Arc::new(FileTransport::new())),
        )
        .with_jobs(config.jobs.value)
        .forced(options.force);

        let mut request = CollectRequest::new(config.root.clone(), config.repositories.clone())
            .with_dependencies(config.dependencies.clone())
            .with_managed(ManagedVersionMap::from_dependencies(config.managed.clone()));
        if let Some(scope) = options.scope {
            request = request.with_filter(Arc::new(ScopeFilter::new(scope)));
        }

        Ok(Self {
            config,
            request,
            resolver,
        })
    }
}

/// Dispatch a command to its handler
pub async fn dispatch_command(command: Commands, ctx: &CommandContext) -> Result<()> {
    match command {
        Commands::Tree { scope } => {
            info!("Printing dependency tree (scope: {:?})", scope);
            tree::execute(scope, ctx).await
        },
        Commands::Resolve(args) => {
            info!("Resolving dependencies ({:?})", args);
            resolve::execute(args.into(), ctx).await
        },
        Commands::Check => {
            info!("Checking configuration");
            check::execute(ctx).await
        },
    }
}
