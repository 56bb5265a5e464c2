//! What taskkeep prints.
//!
//! With `--json` every invocation prints exactly one [`Envelope`] on stdout,
//! success or failure. Otherwise a command renders a [`Report`] and errors go
//! to stderr as `error:` / `hint:` lines.

use std::fmt;

use serde::Serialize;

use crate::error::{exit_codes, Error, Result};

pub const SCHEMA_VERSION: &str = "taskkeep.v1";

#[derive(Debug, Clone, Copy)]
pub struct OutputOptions {
    pub json: bool,
    pub quiet: bool,
}

/// Plain-text result of one command.
///
/// Renders as a title line, indented `key: value` counts, one line per task
/// or rollover, then `warning:` lines and a closing `hint:`.
#[derive(Debug, Clone, Default)]
pub struct Report {
    title: String,
    counts: Vec<(&'static str, String)>,
    lines: Vec<String>,
    warnings: Vec<String>,
    hint: Option<String>,
}

impl Report {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn count(&mut self, label: &'static str, value: impl fmt::Display) {
        self.counts.push((label, value.to_string()));
    }

    pub fn line(&mut self, text: impl Into<String>) {
        self.lines.push(text.into());
    }

    pub fn warn(&mut self, text: impl Into<String>) {
        self.warnings.push(text.into());
    }

    pub fn hint(&mut self, text: impl Into<String>) {
        self.hint = Some(text.into());
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.title)?;
        let width = self.counts.iter().map(|(label, _)| label.len()).max().unwrap_or(0);
        for (label, value) in &self.counts {
            write!(f, "\n  {label:<width$}  {value}")?;
        }
        if !self.lines.is_empty() {
            writeln!(f)?;
            for line in &self.lines {
                write!(f, "\n  {line}")?;
            }
        }
        for warning in &self.warnings {
            write!(f, "\nwarning: {warning}")?;
        }
        if let Some(hint) = &self.hint {
            write!(f, "\nhint: {hint}")?;
        }
        Ok(())
    }
}

/// The `--json` document. Exactly one of `data` and `error` is set.
#[derive(Debug, Serialize)]
pub struct Envelope<'a, T: Serialize> {
    pub schema_version: &'static str,
    pub command: &'a str,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<&'a T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
    #[serde(skip_serializing_if = "<[String]>::is_empty")]
    pub warnings: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<&'a str>,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub message: String,
    pub code: i32,
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl From<&Error> for ErrorBody {
    fn from(err: &Error) -> Self {
        let code = err.exit_code();
        Self {
            message: err.to_string(),
            code,
            kind: match code {
                exit_codes::USER_ERROR => "user_error",
                exit_codes::BLOCKED => "blocked",
                _ => "operation_failed",
            },
            details: err.details(),
        }
    }
}

pub fn emit_success<T: Serialize>(
    options: OutputOptions,
    command: &str,
    data: &T,
    report: &Report,
) -> Result<()> {
    if options.json {
        let envelope = Envelope {
            schema_version: SCHEMA_VERSION,
            command,
            status: "success",
            data: Some(data),
            error: None,
            warnings: &report.warnings,
            hint: report.hint.as_deref(),
        };
        println!("{}", serde_json::to_string_pretty(&envelope)?);
    } else if !options.quiet {
        println!("{report}");
    }
    Ok(())
}

pub fn emit_error(command: &str, err: &Error, json: bool) -> Result<()> {
    let hint = error_hint(err);
    if json {
        let envelope: Envelope<'_, ()> = Envelope {
            schema_version: SCHEMA_VERSION,
            command,
            status: "error",
            data: None,
            error: Some(ErrorBody::from(err)),
            warnings: &[],
            hint,
        };
        println!("{}", serde_json::to_string_pretty(&envelope)?);
        return Ok(());
    }

    eprintln!("error: {err}");
    if let Some(hint) = hint {
        eprintln!("hint: {hint}");
    }
    Ok(())
}

/// What the user can do about a failed run, if anything.
pub fn error_hint(err: &Error) -> Option<&'static str> {
    match err {
        Error::InvalidConfig(_) | Error::TomlParse(_) => Some("fix taskkeep.toml then retry"),
        Error::LockFailed(_) => Some("another sync is running; retry when it finishes"),
        Error::Fetch(_) | Error::RemoteStatus { .. } | Error::Http(_) => {
            Some("local snapshot unchanged; run taskkeep sync again later")
        }
        Error::InvalidData(_) => Some("inspect the file named above"),
        _ => None,
    }
}

/// Best-effort subcommand name for error envelopes, read before clap parses.
pub fn infer_command_name_from_args() -> String {
    command_name_from(std::env::args().skip(1))
}

fn command_name_from(mut args: impl Iterator<Item = String>) -> String {
    while let Some(arg) = args.next() {
        if arg == "--config" {
            args.next();
            continue;
        }
        if arg.starts_with('-') {
            continue;
        }
        return arg;
    }
    "taskkeep".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(values: &[&str]) -> impl Iterator<Item = String> {
        values
            .iter()
            .map(|value| value.to_string())
            .collect::<Vec<_>>()
            .into_iter()
    }

    #[test]
    fn command_name_skips_flags_and_config_value() {
        assert_eq!(
            command_name_from(args(&["--json", "--config", "a.toml", "sync"])),
            "sync"
        );
        assert_eq!(command_name_from(args(&["list", "--archived"])), "list");
        assert_eq!(command_name_from(args(&["--quiet"])), "taskkeep");
    }

    #[test]
    fn error_body_kind_follows_exit_code() {
        let body = ErrorBody::from(&Error::InvalidConfig("marker".into()));
        assert_eq!(body.kind, "user_error");
        assert_eq!(body.code, exit_codes::USER_ERROR);

        let body = ErrorBody::from(&Error::LockFailed("snapshot.json.lock".into()));
        assert_eq!(body.kind, "blocked");
    }
}
