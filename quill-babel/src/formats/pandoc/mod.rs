//! Pandoc engine
//!
//! Shells out to the `pandoc` binary, piping markdown or JSON through stdin and reading the
//! converted output from stdout:
//!
//! ```text
//! markdown_to_ast:  pandoc --from <format> --to json
//! ast_to_markdown:  pandoc --from json --to <format>
//! ```
//!
//! The binary is resolved in this order: the `QUILL_PANDOC_BIN` environment variable, the
//! path configured on the engine, then `pandoc` on `PATH`.

use crate::engine::MarkdownEngine;
use crate::ir::tokens::TokenStream;
use log::debug;
use std::env;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use which::which;

/// Errors from running pandoc
#[derive(Debug)]
pub enum PandocError {
    /// No pandoc binary could be located
    NotFound(String),
    /// Spawning or talking to the process failed
    Io(std::io::Error),
    /// Pandoc ran but exited unsuccessfully
    Failed { status: Option<i32>, stderr: String },
    /// Pandoc's JSON could not be decoded, or ours could not be encoded
    Json(serde_json::Error),
    /// Pandoc's markdown output was not UTF-8
    Utf8(std::string::FromUtf8Error),
}

impl fmt::Display for PandocError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PandocError::NotFound(msg) => write!(f, "Pandoc not found: {msg}"),
            PandocError::Io(err) => write!(f, "Failed to run pandoc: {err}"),
            PandocError::Failed { status, stderr } => match status {
                Some(code) => write!(f, "Pandoc exited with status {code}: {}", stderr.trim()),
                None => write!(f, "Pandoc was terminated: {}", stderr.trim()),
            },
            PandocError::Json(err) => write!(f, "Invalid pandoc JSON: {err}"),
            PandocError::Utf8(err) => write!(f, "Pandoc output is not UTF-8: {err}"),
        }
    }
}

impl std::error::Error for PandocError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PandocError::Io(err) => Some(err),
            PandocError::Json(err) => Some(err),
            PandocError::Utf8(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for PandocError {
    fn from(err: std::io::Error) -> Self {
        PandocError::Io(err)
    }
}

impl From<serde_json::Error> for PandocError {
    fn from(err: serde_json::Error) -> Self {
        PandocError::Json(err)
    }
}

#[derive(Debug, Clone, Default)]
pub struct PandocEngine {
    binary: Option<PathBuf>,
    extra_args: Vec<String>,
}

impl PandocEngine {
    pub fn new() -> Self {
        PandocEngine::default()
    }

    /// Uses `binary` instead of looking `pandoc` up on `PATH`. Bare names are still
    /// resolved through `PATH`.
    pub fn with_binary(mut self, binary: impl Into<PathBuf>) -> Self {
        self.binary = Some(binary.into());
        self
    }

    /// Extra arguments appended to every invocation (e.g., `--wrap=none`).
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extra_args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn resolve_binary(&self) -> Result<PathBuf, PandocError> {
        if let Some(path) = env::var_os("QUILL_PANDOC_BIN") {
            if !path.is_empty() {
                return Ok(PathBuf::from(path));
            }
        }
        match &self.binary {
            Some(binary) if has_directory(binary) => Ok(binary.clone()),
            Some(binary) => which(binary)
                .map_err(|err| PandocError::NotFound(format!("{}: {err}", binary.display()))),
            None => which("pandoc").map_err(|err| PandocError::NotFound(err.to_string())),
        }
    }

    async fn run(&self, args: &[&str], input: &[u8]) -> Result<Vec<u8>, PandocError> {
        let binary = self.resolve_binary()?;
        debug!("running {} {}", binary.display(), args.join(" "));

        let mut child = Command::new(&binary)
            .args(args)
            .args(&self.extra_args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let mut stdin = child.stdin.take().ok_or_else(|| {
            PandocError::Io(std::io::Error::other("pandoc stdin was not captured"))
        })?;
        let feed = async move {
            stdin.write_all(input).await?;
            stdin.shutdown().await
        };
        let (_, output) = tokio::try_join!(feed, child.wait_with_output())?;

        if !output.status.success() {
            return Err(PandocError::Failed {
                status: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }
        Ok(output.stdout)
    }
}

fn has_directory(path: &Path) -> bool {
    path.parent().is_some_and(|parent| !parent.as_os_str().is_empty())
}

impl MarkdownEngine for PandocEngine {
    type Error = PandocError;

    fn name(&self) -> &str {
        "pandoc"
    }

    async fn markdown_to_ast(
        &self,
        format: &str,
        source: &str,
    ) -> Result<TokenStream, PandocError> {
        let output = self
            .run(&["--from", format, "--to", "json"], source.as_bytes())
            .await?;
        Ok(serde_json::from_slice(&output)?)
    }

    async fn ast_to_markdown(
        &self,
        format: &str,
        stream: &TokenStream,
    ) -> Result<String, PandocError> {
        let input = serde_json::to_vec(stream)?;
        let output = self.run(&["--from", "json", "--to", format], &input).await?;
        String::from_utf8(output).map_err(PandocError::Utf8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_paths_are_not_looked_up() {
        assert!(has_directory(Path::new("/opt/pandoc/bin/pandoc")));
        assert!(has_directory(Path::new("./pandoc")));
        assert!(!has_directory(Path::new("pandoc")));
    }

    #[test]
    fn failure_message_includes_stderr() {
        let err = PandocError::Failed {
            status: Some(64),
            stderr: "unknown reader\n".into(),
        };
        assert_eq!(err.to_string(), "Pandoc exited with status 64: unknown reader");
    }
}
