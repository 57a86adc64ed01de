pub mod console;
pub mod lenient;
pub mod verbosity;

use color_eyre::eyre::{eyre, Report, Result, WrapErr};
use color_eyre::Help;
use std::fmt::Debug;
use std::path::Path;

/// Create the parent directory of a file path, if it doesn't exist yet.
pub fn create_parent_dir<P>(path: &P) -> Result<(), Report>
where
    P: AsRef<Path> + Debug,
{
    if let Some(parent) = path.as_ref().parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)
                .wrap_err_with(|| format!("Failed to create directory: {parent:?}"))?;
        }
    }
    Ok(())
}

/// Check that a path is an existing, non-empty file.
///
/// ## Examples
///
/// ```rust
/// use kb_fasttree::utils::check_file;
/// assert!(check_file(&"Cargo.toml").is_ok());
/// assert!(check_file(&"does/not/exist.fasta").is_err());
/// ```
pub fn check_file<P>(path: &P) -> Result<(), Report>
where
    P: AsRef<Path> + Debug,
{
    let path = path.as_ref();
    if !path.is_file() {
        Err(eyre!("no such file '{}'", path.display()))?
    }
    let size = path.metadata().wrap_err_with(|| format!("Failed to read metadata: {path:?}"))?.len();
    if size == 0 {
        Err(eyre!("empty file '{}'", path.display())
            .suggestion("Check that the previous step wrote its output."))?
    }
    Ok(())
}
