//! Runs the FastTree binary as a child process.

use crate::utils::console::Console;
use color_eyre::eyre::{eyre, Report, Result, WrapErr};
use color_eyre::Help;
use itertools::Itertools;
use log::{info, warn};
use std::fmt::Debug;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

/// Messages FastTree wrote to stderr, and how it exited.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RunLog {
    pub lines: Vec<String>,
    pub code: Option<i32>,
}

/// Spawns FastTree with an optional timeout and a cancellation token.
#[derive(Clone, Debug)]
pub struct Runner {
    pub binary: PathBuf,
    pub timeout: Option<Duration>,
    pub cancel: CancellationToken,
}

/// Why a run stopped before FastTree exited on its own.
enum Interrupt {
    Cancelled,
    TimedOut(Duration),
}

impl Runner {
    pub fn new<P: AsRef<Path>>(binary: P) -> Self {
        Runner { binary: binary.as_ref().to_path_buf(), timeout: None, cancel: CancellationToken::new() }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Checks that the binary is an executable file.
    pub fn check_binary(&self) -> Result<(), Report> {
        let binary = &self.binary;
        if !binary.is_file() {
            Err(eyre!("no such file '{}'", binary.display())
                .suggestion("Set the FastTree location with --fasttree-bin or FASTTREE_BIN."))?
        }
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = binary
                .metadata()
                .wrap_err_with(|| format!("Failed to read metadata: {binary:?}"))?
                .permissions()
                .mode();
            if mode & 0o111 == 0 {
                Err(eyre!("file is not executable '{}'", binary.display()))?
            }
        }
        Ok(())
    }

    /// Runs FastTree on `input` (FASTA) and writes the tree to `output` (Newick).
    ///
    /// The alignment is streamed to stdin line by line, stdout is copied into `output`,
    /// and stderr lines are logged and kept in the returned [`RunLog`]. All three pipes
    /// are serviced at once so neither side blocks on a full buffer.
    ///
    /// A non-zero exit, a missing or empty `output`, a timeout and a cancellation are all errors.
    /// The error of a non-zero exit carries the full `console` including FastTree's messages.
    pub async fn run<P>(
        &self,
        args: &[String],
        input: &P,
        output: &P,
        console: &mut Console,
    ) -> Result<RunLog, Report>
    where
        P: AsRef<Path> + Debug,
    {
        self.check_binary()?;
        crate::utils::check_file(input)?;
        crate::utils::create_parent_dir(output)?;

        console.log("RUNNING FASTTREE:");
        console.log(format!("    {} {}", self.binary.display(), args.iter().join(" ")));

        let mut child = Command::new(&self.binary)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .wrap_err_with(|| format!("Failed to spawn: {:?}", self.binary))?;

        let stdin = child.stdin.take().ok_or_else(|| eyre!("Failed to open FastTree stdin."))?;
        let stdout = child.stdout.take().ok_or_else(|| eyre!("Failed to open FastTree stdout."))?;
        let stderr = child.stderr.take().ok_or_else(|| eyre!("Failed to open FastTree stderr."))?;

        let streams = async {
            let (fed, copied, drained) = tokio::join!(
                feed(input.as_ref(), stdin),
                copy(stdout, output.as_ref()),
                drain(stderr),
            );
            fed?;
            copied?;
            drained
        };
        let work = async {
            let lines = streams.await?;
            let status = child.wait().await.wrap_err("Failed to wait for FastTree.")?;
            Ok::<(Vec<String>, ExitStatus), Report>((lines, status))
        };
        let timeout = async {
            match self.timeout {
                Some(duration) => {
                    tokio::time::sleep(duration).await;
                    duration
                }
                None => std::future::pending().await,
            }
        };

        let outcome = tokio::select! {
            result = work => Ok(result?),
            _ = self.cancel.cancelled() => Err(Interrupt::Cancelled),
            duration = timeout => Err(Interrupt::TimedOut(duration)),
        };

        let (lines, status) = match outcome {
            Ok(finished) => finished,
            Err(interrupt) => {
                if let Err(e) = child.kill().await {
                    warn!("Failed to kill FastTree: {e}");
                }
                let message = match interrupt {
                    Interrupt::Cancelled => eyre!("FastTree run was cancelled."),
                    Interrupt::TimedOut(d) => eyre!("FastTree run timed out after {} seconds.", d.as_secs_f32())
                        .suggestion("Increase --timeout, or try the fastest option."),
                };
                console.log(message.to_string());
                return Err(message);
            }
        };

        lines.iter().for_each(|line| console.record(line));
        let code = status.code();
        console.log(format!("return code: {}", code.map(|c| c.to_string()).unwrap_or_else(|| "signal".into())));

        if !status.success() {
            let code = code.map(|c| c.to_string()).unwrap_or_else(|| "none (killed by signal)".into());
            Err(eyre!("Error running FASTTREE, return code: {code}\n\n{console}"))?
        }

        let output = output.as_ref();
        if !output.is_file() {
            Err(eyre!("failed to create FASTTREE output: {}", output.display()))?
        }
        if output.metadata().map(|m| m.len()).unwrap_or(0) == 0 {
            Err(eyre!("created empty file for FASTTREE output: {}", output.display()))?
        }

        Ok(RunLog { lines, code })
    }
}

/// Writes the alignment into the child's stdin, then closes it.
async fn feed<W>(input: &Path, mut stdin: W) -> Result<(), Report>
where
    W: AsyncWrite + Unpin,
{
    let file = tokio::fs::File::open(input).await.wrap_err_with(|| format!("Failed to open: {input:?}"))?;
    let mut lines = BufReader::new(file).lines();
    while let Some(line) = lines.next_line().await.wrap_err_with(|| format!("Failed to read: {input:?}"))? {
        let written = async {
            stdin.write_all(line.as_bytes()).await?;
            stdin.write_all(b"\n").await
        };
        match written.await {
            Ok(()) => (),
            // FastTree stopped reading, its exit status tells why
            Err(e) if e.kind() == ErrorKind::BrokenPipe => {
                warn!("FastTree closed its input early.");
                return Ok(());
            }
            Err(e) => Err(e).wrap_err("Failed to write alignment to FastTree.")?,
        }
    }
    stdin.shutdown().await.or_else(|e| match e.kind() {
        ErrorKind::BrokenPipe => Ok(()),
        _ => Err(e),
    })?;
    Ok(())
}

/// Copies the child's stdout into the output file.
async fn copy<R>(mut stdout: R, output: &Path) -> Result<(), Report>
where
    R: AsyncRead + Unpin,
{
    let mut file =
        tokio::fs::File::create(output).await.wrap_err_with(|| format!("Failed to create: {output:?}"))?;
    tokio::io::copy(&mut stdout, &mut file)
        .await
        .wrap_err_with(|| format!("Failed to write FastTree output: {output:?}"))?;
    file.flush().await?;
    Ok(())
}

/// Collects the child's stderr line by line.
async fn drain<R>(stderr: R) -> Result<Vec<String>, Report>
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(stderr).lines();
    let mut log = Vec::new();
    while let Some(line) = lines.next_line().await.wrap_err("Failed to read FastTree messages.")? {
        info!("{line}");
        log.push(line);
    }
    Ok(log)
}
