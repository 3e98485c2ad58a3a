//! Stderr logging bootstrap.
//!
//! The level comes from `--log-level` when given. Otherwise `RUST_LOG` is honored, falling back
//! to `logging.level` from the configuration. Log lines go to stderr so that stdout stays clean
//! for converted output.

use flexi_logger::{Logger, LoggerHandle};

/// Where the effective log level comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LevelSource {
    /// Set on the command line; `RUST_LOG` is ignored.
    Flag(&'static str),
    /// `RUST_LOG` if set, else this level.
    EnvOr(&'static str),
}

pub fn resolve_level(flag: Option<&str>, configured: &str) -> Result<LevelSource, String> {
    match flag {
        Some(level) => Ok(LevelSource::Flag(normalize_level(level)?)),
        None => Ok(LevelSource::EnvOr(normalize_level(configured)?)),
    }
}

/// Starts the logger. The returned handle must be kept alive for the life of the process.
pub fn init(source: LevelSource) -> Result<LoggerHandle, String> {
    let logger = match source {
        LevelSource::Flag(level) => Logger::try_with_str(level),
        LevelSource::EnvOr(level) => Logger::try_with_env_or_str(level),
    }
    .map_err(|err| format!("invalid log specification: {err}"))?;

    logger
        .log_to_stderr()
        .format(flexi_logger::default_format)
        .start()
        .map_err(|err| format!("failed to start logger: {err}"))
}

fn normalize_level(level: &str) -> Result<&'static str, String> {
    match level.trim().to_ascii_lowercase().as_str() {
        "off" => Ok("off"),
        "trace" => Ok("trace"),
        "debug" => Ok("debug"),
        "info" => Ok("info"),
        "warn" | "warning" => Ok("warn"),
        "error" => Ok("error"),
        other => Err(format!(
            "unsupported log level `{other}`; expected off|error|warn|info|debug|trace"
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_wins_over_configuration() {
        assert_eq!(
            resolve_level(Some("DEBUG"), "warn"),
            Ok(LevelSource::Flag("debug"))
        );
        assert_eq!(resolve_level(None, "warning"), Ok(LevelSource::EnvOr("warn")));
    }

    #[test]
    fn rejects_unknown_levels() {
        assert!(resolve_level(Some("loud"), "warn").is_err());
        assert!(resolve_level(None, "chatty").is_err());
    }
}
