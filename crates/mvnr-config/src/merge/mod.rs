//! Configuration layering, fallback logic, and environment overrides

use std::collections::HashMap;

use camino::{Utf8Path, Utf8PathBuf};
use tracing::debug;

use mvnr_core::error::MvnrError;
use mvnr_core::types::{ArtifactCoordinate, Dependency};
use mvnr_repository::repository::CENTRAL_ID;
use mvnr_repository::{ArtifactRepository, Mirror};

use crate::document::invalid;
use crate::manifest::{Manifest, MANIFEST_FILE};
use crate::settings::{Settings, SETTINGS_DIR, SETTINGS_FILE};
use crate::ConfigResult;

/// Environment variable forcing offline mode
pub const ENV_OFFLINE: &str = "MVNR_OFFLINE";
/// Environment variable overriding the local repository
pub const ENV_LOCAL_REPOSITORY: &str = "MVNR_LOCAL_REPOSITORY";
/// Environment variable setting the number of parallel downloads
pub const ENV_JOBS: &str = "MVNR_JOBS";

/// CLI override keys understood by `ConfigLayering::merge_configs`
pub const CLI_OFFLINE: &str = "offline";
pub const CLI_LOCAL_REPOSITORY: &str = "local-repository";
pub const CLI_JOBS: &str = "jobs";

/// Finds and reads the configuration files for a working directory
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    cwd: Utf8PathBuf,
    /// Home directory; `None` when it cannot be determined
    home: Option<Utf8PathBuf>,
}

/// Where an effective value came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    Default,
    /// Global settings file
    Global(Utf8PathBuf),
    /// Project mvnr.toml
    Project(Utf8PathBuf),
    /// Environment variable
    Environment(String),
    /// CLI flag
    CommandLine,
}

/// A value together with the layer that set it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Setting<T> {
    pub value: T,
    pub source: ConfigSource,
}

impl<T> Setting<T> {
    fn new(value: T, source: ConfigSource) -> Self {
        Self { value, source }
    }
}

/// Fully merged configuration ready to drive a resolution
#[derive(Debug, Clone)]
pub struct EffectiveConfig {
    pub manifest: Manifest,
    pub manifest_path: Utf8PathBuf,
    pub root: ArtifactCoordinate,
    pub dependencies: Vec<Dependency>,
    pub managed: Vec<Dependency>,
    /// Project repositories, then settings repositories, then central
    pub repositories: Vec<ArtifactRepository>,
    pub mirrors: Vec<Mirror>,
    pub local_repository: Setting<Utf8PathBuf>,
    pub offline: Setting<bool>,
    pub jobs: Setting<usize>,
}

impl ConfigLoader {
    /// Loader rooted at `cwd`, with the home directory taken from the system
    pub fn new(cwd: Utf8PathBuf) -> Self {
        let home = dirs::home_dir().and_then(|home| Utf8PathBuf::from_path_buf(home).ok());
        Self { cwd, home }
    }

    /// Use `home` instead of the user's home directory
    pub fn with_home(mut self, home: impl Into<Utf8PathBuf>) -> Self {
        self.home = Some(home.into());
        self
    }

    pub fn cwd(&self) -> &Utf8Path {
        &self.cwd
    }

    /// Nearest mvnr.toml at or above the working directory
    pub fn find_manifest(&self) -> Option<Utf8PathBuf> {
        self.cwd
            .ancestors()
            .map(|dir| dir.join(MANIFEST_FILE))
            .find(|path| path.is_file())
    }

    /// Load the project manifest found by `find_manifest`
    pub async fn load_project_config(&self) -> ConfigResult<(Manifest, ConfigSource)> {
        let path = self.find_manifest().ok_or_else(|| {
            invalid(
                "manifest",
                format!("No {MANIFEST_FILE} found in {} or any parent directory", self.cwd),
            )
        })?;
        debug!("loading project manifest {path}");
        let manifest = crate::manifest::load_from_file(&path).await?;
        Ok((manifest, ConfigSource::Project(path)))
    }

    pub fn settings_path(&self) -> Option<Utf8PathBuf> {
        self.home
            .as_ref()
            .map(|home| home.join(SETTINGS_DIR).join(SETTINGS_FILE))
    }

    /// Load global settings when the file exists
    pub async fn load_global_config(&self) -> ConfigResult<Option<(Settings, ConfigSource)>> {
        let Some(path) = self.settings_path() else {
            return Ok(None);
        };
        if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
            return Ok(None);
        }
        debug!("loading settings {path}");
        let settings = crate::settings::load_from_file(&path).await?;
        Ok(Some((settings, ConfigSource::Global(path))))
    }

    /// Default local repository, `~/.mvnr/repository`
    pub fn default_local_repository(&self) -> ConfigResult<Utf8PathBuf> {
        self.home
            .as_ref()
            .map(|home| home.join(SETTINGS_DIR).join("repository"))
            .ok_or_else(|| invalid("local-repository", "Could not determine home directory"))
    }

    /// Load every layer and merge them
    pub async fn load(&self, cli_overrides: HashMap<String, String>) -> ConfigResult<EffectiveConfig> {
        let project = self.load_project_config().await?;
        let global = self.load_global_config().await?;
        let layering = ConfigLayering {
            default_local_repository: self.default_local_repository().ok(),
        };
        layering.merge_configs(global, project, ConfigLayering::collect_env_overrides(), cli_overrides)
    }
}

/// Merges global < project < environment < command line
#[derive(Debug, Clone, Default)]
pub struct ConfigLayering {
    /// Used when no layer sets a local repository
    pub default_local_repository: Option<Utf8PathBuf>,
}

impl ConfigLayering {
    pub fn new(default_local_repository: Option<Utf8PathBuf>) -> Self {
        Self {
            default_local_repository,
        }
    }

    /// Merge multiple configuration layers
    pub fn merge_configs(
        &self,
        global: Option<(Settings, ConfigSource)>,
        project: (Manifest, ConfigSource),
        env_overrides: HashMap<String, String>,
        cli_overrides: HashMap<String, String>,
    ) -> ConfigResult<EffectiveConfig> {
        let (manifest, project_source) = project;
        let manifest_path = match &project_source {
            ConfigSource::Project(path) => path.clone(),
            _ => Utf8PathBuf::from(MANIFEST_FILE),
        };

        let mut repositories = manifest.repositories()?;
        let mut mirrors = Vec::new();
        let mut local_repository = self
            .default_local_repository
            .clone()
            .map(|path| Setting::new(path, ConfigSource::Default));
        let mut offline = Setting::new(false, ConfigSource::Default);
        let mut jobs = Setting::new(1, ConfigSource::Default);

        if let Some((settings, source)) = global {
            for repository in settings.repositories()? {
                if !repositories.iter().any(|r| r.id == repository.id) {
                    repositories.push(repository);
                }
            }
            mirrors = settings.mirrors();
            if let Some(path) = settings.local_repository {
                local_repository = Some(Setting::new(path, source.clone()));
            }
            if let Some(value) = settings.offline {
                offline = Setting::new(value, source.clone());
            }
            if let Some(value) = settings.jobs {
                jobs = Setting::new(value, source);
            }
        }

        if !repositories.iter().any(|r| r.id == CENTRAL_ID) {
            repositories.push(ArtifactRepository::central());
        }

        for (key, value, source) in Self::overrides(&env_overrides, &cli_overrides) {
            match key {
                Key::Offline => offline = Setting::new(parse_flag(&source, value)?, source),
                Key::LocalRepository => {
                    local_repository = Some(Setting::new(Utf8PathBuf::from(value), source))
                },
                Key::Jobs => jobs = Setting::new(parse_jobs(&source, value)?, source),
            }
        }

        let local_repository = local_repository
            .ok_or_else(|| invalid("local-repository", "Could not determine home directory"))?;

        Ok(EffectiveConfig {
            root: manifest.root(),
            dependencies: manifest.dependencies()?,
            managed: manifest.managed_dependencies()?,
            manifest,
            manifest_path,
            repositories,
            mirrors,
            local_repository,
            offline,
            jobs,
        })
    }

    /// Recognised overrides, environment first so the command line wins
    fn overrides<'a>(
        env: &'a HashMap<String, String>,
        cli: &'a HashMap<String, String>,
    ) -> Vec<(Key, &'a str, ConfigSource)> {
        let mut overrides = Vec::new();
        for (name, key) in [
            (ENV_OFFLINE, Key::Offline),
            (ENV_LOCAL_REPOSITORY, Key::LocalRepository),
            (ENV_JOBS, Key::Jobs),
        ] {
            if let Some(value) = env.get(name) {
                overrides.push((key, value.as_str(), ConfigSource::Environment(name.to_string())));
            }
        }
        for (name, key) in [
            (CLI_OFFLINE, Key::Offline),
            (CLI_LOCAL_REPOSITORY, Key::LocalRepository),
            (CLI_JOBS, Key::Jobs),
        ] {
            if let Some(value) = cli.get(name) {
                overrides.push((key, value.as_str(), ConfigSource::CommandLine));
            }
        }
        overrides
    }

    /// Collect `MVNR_*` environment variables
    pub fn collect_env_overrides() -> HashMap<String, String> {
        std::env::vars().filter(|(key, _)| key.starts_with("MVNR_")).collect()
    }
}

#[derive(Debug, Clone, Copy)]
enum Key {
    Offline,
    LocalRepository,
    Jobs,
}

fn field_of(source: &ConfigSource) -> String {
    match source {
        ConfigSource::Environment(name) => name.clone(),
        _ => "command line".to_string(),
    }
}

fn parse_flag(source: &ConfigSource, value: &str) -> ConfigResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(invalid(field_of(source), format!("'{other}' is not a boolean"))),
    }
}

fn parse_jobs(source: &ConfigSource, value: &str) -> ConfigResult<usize> {
    match value.trim().parse::<usize>() {
        Ok(jobs) if jobs > 0 => Ok(jobs),
        _ => Err(MvnrError::ConfigValidation {
            field: field_of(source),
            reason: format!("'{value}' is not a positive number of jobs"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::parse_manifest;
    use crate::settings::parse_settings;
    use tempfile::TempDir;

    const MANIFEST: &str = r#"
dependencies = ["org.example:lib:1.0"]

[project]
group-id = "org.example"
artifact-id = "app"
version = "1.0"

[[repositories]]
id = "internal"
url = "https://repo.example.com"
"#;

    fn project() -> (Manifest, ConfigSource) {
        (
            parse_manifest(MANIFEST).unwrap(),
            ConfigSource::Project(Utf8PathBuf::from("/work/mvnr.toml")),
        )
    }

    fn layering() -> ConfigLayering {
        ConfigLayering::new(Some(Utf8PathBuf::from("/home/u/.mvnr/repository")))
    }

    fn utf8(dir: &TempDir) -> Utf8PathBuf {
        Utf8PathBuf::try_from(dir.path().to_path_buf()).unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = layering()
            .merge_configs(None, project(), HashMap::new(), HashMap::new())
            .unwrap();

        assert_eq!(config.root.artifact_id, "app");
        assert_eq!(config.dependencies.len(), 1);
        assert_eq!(config.local_repository.value, Utf8PathBuf::from("/home/u/.mvnr/repository"));
        assert_eq!(config.local_repository.source, ConfigSource::Default);
        assert_eq!(config.offline, Setting::new(false, ConfigSource::Default));
        assert_eq!(config.jobs.value, 1);
        let ids: Vec<_> = config.repositories.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["internal", CENTRAL_ID]);
    }

    #[test]
    fn test_layer_precedence() {
        let global_path = Utf8PathBuf::from("/home/u/.mvnr/settings.toml");
        let settings = parse_settings(
            r#"
local-repository = "/settings/repo"
offline = false
jobs = 2

[[repositories]]
id = "internal"
url = "https://shadowed.example.com"

[[repositories]]
id = "extra"
url = "https://extra.example.com"
"#,
        )
        .unwrap();

        let env = HashMap::from([
            (ENV_OFFLINE.to_string(), "true".to_string()),
            (ENV_JOBS.to_string(), "3".to_string()),
        ]);
        let cli = HashMap::from([(CLI_JOBS.to_string(), "8".to_string())]);

        let config = layering()
            .merge_configs(
                Some((settings, ConfigSource::Global(global_path.clone()))),
                project(),
                env,
                cli,
            )
            .unwrap();

        assert_eq!(
            config.local_repository,
            Setting::new(Utf8PathBuf::from("/settings/repo"), ConfigSource::Global(global_path))
        );
        assert_eq!(
            config.offline,
            Setting::new(true, ConfigSource::Environment(ENV_OFFLINE.to_string()))
        );
        assert_eq!(config.jobs, Setting::new(8, ConfigSource::CommandLine));

        let internal = config.repositories.iter().find(|r| r.id == "internal").unwrap();
        assert_eq!(internal.url, "https://repo.example.com");
        let ids: Vec<_> = config.repositories.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["internal", "extra", CENTRAL_ID]);
    }

    #[test]
    fn test_invalid_override() {
        let env = HashMap::from([(ENV_OFFLINE.to_string(), "perhaps".to_string())]);
        let err = layering()
            .merge_configs(None, project(), env, HashMap::new())
            .unwrap_err();
        assert!(matches!(err, MvnrError::ConfigValidation { ref field, .. } if field == ENV_OFFLINE));

        let cli = HashMap::from([(CLI_JOBS.to_string(), "0".to_string())]);
        assert!(layering().merge_configs(None, project(), HashMap::new(), cli).is_err());
    }

    #[test]
    fn test_no_home_needs_explicit_local_repository() {
        let without_home = ConfigLayering::default();
        assert!(without_home
            .merge_configs(None, project(), HashMap::new(), HashMap::new())
            .is_err());

        let cli = HashMap::from([(CLI_LOCAL_REPOSITORY.to_string(), "/tmp/repo".to_string())]);
        let config = without_home.merge_configs(None, project(), HashMap::new(), cli).unwrap();
        assert_eq!(config.local_repository.source, ConfigSource::CommandLine);
    }

    #[tokio::test]
    async fn test_find_manifest_walks_up() {
        let dir = TempDir::new().unwrap();
        let root = utf8(&dir);
        let nested = root.join("module").join("src");
        tokio::fs::create_dir_all(&nested).await.unwrap();
        tokio::fs::write(root.join(MANIFEST_FILE), MANIFEST).await.unwrap();

        let loader = ConfigLoader::new(nested).with_home(root.join("home"));
        assert_eq!(loader.find_manifest(), Some(root.join(MANIFEST_FILE)));

        let (manifest, source) = loader.load_project_config().await.unwrap();
        assert_eq!(manifest.project.artifact_id, "app");
        assert_eq!(source, ConfigSource::Project(root.join(MANIFEST_FILE)));
    }

    #[tokio::test]
    async fn test_missing_manifest() {
        let dir = TempDir::new().unwrap();
        let loader = ConfigLoader::new(utf8(&dir)).with_home(utf8(&dir));
        if loader.find_manifest().is_none() {
            assert!(matches!(
                loader.load_project_config().await.unwrap_err(),
                MvnrError::ConfigValidation { .. }
            ));
        }
    }

    #[tokio::test]
    async fn test_load_merges_settings() {
        let dir = TempDir::new().unwrap();
        let root = utf8(&dir);
        let home = root.join("home");
        tokio::fs::create_dir_all(home.join(SETTINGS_DIR)).await.unwrap();
        tokio::fs::write(home.join(SETTINGS_DIR).join(SETTINGS_FILE), "jobs = 6\n")
            .await
            .unwrap();
        tokio::fs::write(root.join(MANIFEST_FILE), MANIFEST).await.unwrap();

        let loader = ConfigLoader::new(root.clone()).with_home(home.clone());
        let global = loader.load_global_config().await.unwrap().unwrap();
        assert_eq!(global.0.jobs, Some(6));

        let cli = HashMap::from([(CLI_OFFLINE.to_string(), "true".to_string())]);
        let config = loader.load(cli).await.unwrap();
        assert!(config.offline.value);
        assert_eq!(config.manifest_path, root.join(MANIFEST_FILE));
        assert_eq!(config.local_repository.value.parent(), Some(home.join(SETTINGS_DIR).as_path()));
    }

    #[tokio::test]
    async fn test_absent_settings() {
        let dir = TempDir::new().unwrap();
        let loader = ConfigLoader::new(utf8(&dir)).with_home(utf8(&dir));
        assert!(loader.load_global_config().await.unwrap().is_none());
    }

    #[test]
    fn test_collect_env_overrides() {
        std::env::set_var("MVNR_TEST_COLLECT", "1");
        std::env::set_var("NOT_MVNR_TEST_COLLECT", "1");

        let overrides = ConfigLayering::collect_env_overrides();
        assert!(overrides.contains_key("MVNR_TEST_COLLECT"));
        assert!(!overrides.contains_key("NOT_MVNR_TEST_COLLECT"));

        std::env::remove_var("MVNR_TEST_COLLECT");
        std::env::remove_var("NOT_MVNR_TEST_COLLECT");
    }
}
