use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// CLI arguments of a tree build.
#[derive(Clone, Debug, Deserialize, Parser, Serialize)]
#[clap(verbatim_doc_comment)]
pub struct Args {
    /// Method parameters (JSON file).
    ///
    /// Requires workspace_name, input_ref and output_name.
    #[clap(short = 'p', long, required = true)]
    pub params: PathBuf,

    /// Write the result (JSON) to a file instead of stdout.
    #[clap(short = 'o', long)]
    pub output: Option<PathBuf>,

    /// Deployment config (JSON file).
    ///
    /// Keys: workspace-url, callback-url, scratch, fasttree-bin, timeout.
    #[clap(short = 'c', long)]
    pub config: Option<PathBuf>,

    /// Workspace service URL.
    #[clap(long, env = "KB_WORKSPACE_URL")]
    pub workspace_url: Option<String>,

    /// Callback server URL, for file staging and reports.
    #[clap(long, env = "SDK_CALLBACK_URL")]
    pub callback_url: Option<String>,

    /// Authentication token.
    #[clap(long, env = "KB_AUTH_TOKEN", hide_env_values = true)]
    #[serde(skip_serializing)]
    pub token: Option<String>,

    /// Directory where run directories are created.
    #[clap(long)]
    pub scratch: Option<PathBuf>,

    /// FastTree binary.
    #[clap(long, env = "FASTTREE_BIN")]
    pub fasttree_bin: Option<PathBuf>,

    /// Stop FastTree after this many seconds.
    #[clap(long)]
    pub timeout: Option<u64>,
}
