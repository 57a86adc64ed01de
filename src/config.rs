//! Service endpoints, credentials and local paths of a run.

use crate::cli::run::Args;
use crate::fasttree::{Runner, FASTTREE_BIN};
use crate::workspace::{Client, DataFileUtil, KBaseReport, Workspace};
use color_eyre::eyre::{eyre, Report, Result, WrapErr};
use color_eyre::Help;
use log::debug;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Scratch directory of the platform's app containers.
pub const SCRATCH: &str = "/kb/module/work/tmp";

/// Deployment config file, every key is optional.
///
/// ```rust
/// use kb_fasttree::config::DeployConfig;
/// let text = r#"{"workspace-url": "https://kbase.us/services/ws", "scratch": "/tmp/work"}"#;
/// let deploy: DeployConfig = serde_json::from_str(text)?;
/// assert_eq!(deploy.workspace_url.as_deref(), Some("https://kbase.us/services/ws"));
/// assert!(deploy.fasttree_bin.is_none());
/// # Ok::<(), color_eyre::eyre::Report>(())
/// ```
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct DeployConfig {
    pub workspace_url: Option<String>,
    pub callback_url: Option<String>,
    pub scratch: Option<PathBuf>,
    pub fasttree_bin: Option<PathBuf>,
    /// Seconds before FastTree is stopped.
    pub timeout: Option<u64>,
}

impl DeployConfig {
    pub fn read<P>(path: &P) -> Result<Self, Report>
    where
        P: AsRef<Path> + Debug,
    {
        let text = std::fs::read_to_string(path).wrap_err_with(|| format!("Failed to read config: {path:?}"))?;
        let deploy = serde_json::from_str(&text).wrap_err_with(|| format!("Failed to parse config: {path:?}"))?;
        Ok(deploy)
    }
}

/// Resolved configuration: command-line values, then the deployment config, then defaults.
#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    pub workspace_url: String,
    pub callback_url: String,
    /// Absolute, existing directory where run directories are created.
    pub scratch: PathBuf,
    pub token: Option<String>,
    pub fasttree_bin: PathBuf,
    pub timeout: Option<Duration>,
}

impl Config {
    pub fn new(args: &Args) -> Result<Self, Report> {
        let deploy = match &args.config {
            Some(path) => DeployConfig::read(path)?,
            None => DeployConfig::default(),
        };

        let workspace_url = args
            .workspace_url
            .clone()
            .or(deploy.workspace_url)
            .ok_or_else(|| {
                eyre!("workspace-url not set in config")
                    .suggestion("Use --workspace-url, KB_WORKSPACE_URL, or workspace-url in --config.")
            })?;
        let callback_url = args
            .callback_url
            .clone()
            .or(deploy.callback_url)
            .ok_or_else(|| eyre!("SDK_CALLBACK_URL not set in environment"))?;

        let scratch = args.scratch.clone().or(deploy.scratch).unwrap_or_else(|| PathBuf::from(SCRATCH));
        let scratch = match scratch.is_absolute() {
            true => scratch,
            false => std::env::current_dir()?.join(scratch),
        };
        if !scratch.exists() {
            std::fs::create_dir_all(&scratch)
                .wrap_err_with(|| format!("Failed to create scratch directory: {scratch:?}"))?;
        }

        let fasttree_bin = args
            .fasttree_bin
            .clone()
            .or(deploy.fasttree_bin)
            .unwrap_or_else(|| PathBuf::from(FASTTREE_BIN));
        let timeout = args.timeout.or(deploy.timeout).map(Duration::from_secs);

        let config = Config { workspace_url, callback_url, scratch, token: args.token.clone(), fasttree_bin, timeout };
        debug!("Config: workspace {}, callback {}, scratch {:?}", config.workspace_url, config.callback_url, config.scratch);
        Ok(config)
    }

    pub fn runner(&self) -> Runner {
        Runner::new(&self.fasttree_bin).with_timeout(self.timeout)
    }

    pub fn workspace(&self) -> Workspace {
        Workspace(Client::new(&self.workspace_url, self.token.as_deref()))
    }

    pub fn file_staging(&self) -> DataFileUtil {
        DataFileUtil(Client::new(&self.callback_url, self.token.as_deref()))
    }

    pub fn reports(&self) -> KBaseReport {
        KBaseReport::new(&self.callback_url, self.token.as_deref())
    }
}
