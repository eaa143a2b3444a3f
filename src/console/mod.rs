//! Line-oriented console shell that drives the scheduler.
//!
//! Every action of the showcase page (presets, free-form toasts, form
//! save/submit, closing a card) has a command here.

use std::str::FromStr;

use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use crate::forms::{Credentials, FormToasts};
use crate::metrics::encode_metrics;
use crate::notification::{NotificationId, NotificationScheduler, ScheduleRequest};
use crate::presets::{self, SHOWCASE_PRESETS};
use crate::render::render_stack;

pub const HELP: &str = "\
commands:
  toast [--category C] [--ttl MS] <message...>   schedule a toast
  preset <1|2|3|label|category>                   fire a showcase preset
  dismiss <id>                                    close a toast (toast-N or N)
  list                                            show the live stack
  save <username> <password>                      validate and save the form
  submit <username> <password>                    validate and submit the form
  stats                                           scheduler counters
  metrics                                         prometheus exposition
  help                                            this text
  quit                                            shut down
";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("empty command")]
    Empty,
    #[error("unknown command: {0}")]
    UnknownCommand(String),
    #[error("unknown flag: {0}")]
    UnknownFlag(String),
    #[error("missing argument: {0}")]
    MissingArgument(&'static str),
    #[error("invalid toast id: {0}")]
    InvalidId(String),
    #[error("lifetime must be a whole number of milliseconds, got {0}")]
    InvalidLifetime(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Toast(ScheduleRequest),
    Preset(String),
    Dismiss(NotificationId),
    List,
    Save(Credentials),
    Submit(Credentials),
    Stats,
    Metrics,
    Help,
    Quit,
}

impl FromStr for Command {
    type Err = ParseError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let name = words.next().ok_or(ParseError::Empty)?;
        let args: Vec<&str> = words.collect();

        match name.to_ascii_lowercase().as_str() {
            "toast" | "t" => parse_toast(&args).map(Command::Toast),
            "preset" | "p" => {
                if args.is_empty() {
                    return Err(ParseError::MissingArgument("preset"));
                }
                Ok(Command::Preset(args.join(" ")))
            }
            "dismiss" | "d" | "close" => {
                let raw = args.first().ok_or(ParseError::MissingArgument("id"))?;
                raw.parse()
                    .map(Command::Dismiss)
                    .map_err(|_| ParseError::InvalidId(raw.to_string()))
            }
            "list" | "ls" => Ok(Command::List),
            "save" => Ok(Command::Save(credentials(&args))),
            "submit" => Ok(Command::Submit(credentials(&args))),
            "stats" => Ok(Command::Stats),
            "metrics" => Ok(Command::Metrics),
            "help" | "?" => Ok(Command::Help),
            "quit" | "exit" | "q" => Ok(Command::Quit),
            other => Err(ParseError::UnknownCommand(other.to_string())),
        }
    }
}

fn parse_toast(args: &[&str]) -> Result<ScheduleRequest, ParseError> {
    let mut category = None;
    let mut lifetime_ms = None;
    let mut rest = args;

    while let Some((flag, tail)) = rest.split_first() {
        match *flag {
            "--category" | "-c" => {
                let (value, tail) = tail
                    .split_first()
                    .ok_or(ParseError::MissingArgument("category"))?;
                category = Some(*value);
                rest = tail;
            }
            "--ttl" | "-t" => {
                let (value, tail) = tail.split_first().ok_or(ParseError::MissingArgument("ttl"))?;
                let ms = value
                    .parse::<i64>()
                    .map_err(|_| ParseError::InvalidLifetime(value.to_string()))?;
                lifetime_ms = Some(ms);
                rest = tail;
            }
            "--" => {
                rest = tail;
                break;
            }
            flag if flag.starts_with("--") => return Err(ParseError::UnknownFlag(flag.to_string())),
            _ => break,
        }
    }

    // Blank messages are left for the scheduler to reject
    let mut request = ScheduleRequest::new(rest.join(" "));
    if let Some(category) = category {
        request = request.category(category);
    }
    if let Some(ms) = lifetime_ms {
        request = request.lifetime_ms(ms);
    }
    Ok(request)
}

fn credentials(args: &[&str]) -> Credentials {
    Credentials::new(
        args.first().copied().unwrap_or_default(),
        args.get(1).copied().unwrap_or_default(),
    )
}

/// Result of running one command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Continue(String),
    Quit,
}

pub struct Console {
    scheduler: NotificationScheduler,
    forms: FormToasts,
    metrics_enabled: bool,
}

impl Console {
    pub fn new(scheduler: NotificationScheduler, metrics_enabled: bool) -> Self {
        Self {
            forms: FormToasts::new(scheduler.clone()),
            scheduler,
            metrics_enabled,
        }
    }

    /// Parse and run one input line
    pub fn handle_line(&self, line: &str) -> Outcome {
        match line.parse::<Command>() {
            Ok(command) => self.execute(command),
            Err(ParseError::Empty) => Outcome::Continue(String::new()),
            Err(e) => Outcome::Continue(format!("error: {}\n", e)),
        }
    }

    pub fn execute(&self, command: Command) -> Outcome {
        let output = match command {
            Command::Toast(request) => match self.scheduler.schedule(request) {
                Ok(id) => format!("scheduled {}\n", id),
                Err(e) => format!("error [{}]: {}\n", e.code(), e),
            },
            Command::Preset(key) => match presets::find(&key) {
                Some(preset) => match self.scheduler.schedule(preset.request()) {
                    Ok(id) => format!("scheduled {} ({})\n", id, preset.label),
                    Err(e) => format!("error [{}]: {}\n", e.code(), e),
                },
                None => {
                    let labels: Vec<_> = SHOWCASE_PRESETS.iter().map(|p| p.label).collect();
                    format!("unknown preset '{}', try one of: {}\n", key, labels.join(", "))
                }
            },
            Command::Dismiss(id) => {
                if self.scheduler.dismiss(id) {
                    format!("dismissed {}\n", id)
                } else {
                    format!("{} is not showing\n", id)
                }
            }
            Command::List => render_stack(&self.scheduler.snapshot()),
            Command::Save(credentials) => self.form_result(self.forms.save(&credentials)),
            Command::Submit(credentials) => self.form_result(self.forms.submit(&credentials)),
            Command::Stats => {
                let stats = self.scheduler.stats();
                format!(
                    "scheduled={} dismissed={} expired={} rejected={} live={} timers={}\n",
                    stats.scheduled,
                    stats.dismissed,
                    stats.expired,
                    stats.rejected,
                    stats.live,
                    stats.pending_timers
                )
            }
            Command::Metrics => {
                if !self.metrics_enabled {
                    "metrics are disabled\n".to_string()
                } else {
                    match encode_metrics() {
                        Ok(text) => text,
                        Err(e) => format!("error: failed to encode metrics: {}\n", e),
                    }
                }
            }
            Command::Help => HELP.to_string(),
            Command::Quit => return Outcome::Quit,
        };
        Outcome::Continue(output)
    }

    fn form_result(&self, result: crate::error::Result<Vec<NotificationId>>) -> String {
        match result {
            Ok(ids) => {
                let ids: Vec<_> = ids.iter().map(ToString::to_string).collect();
                format!("scheduled {}\n", ids.join(", "))
            }
            Err(e) => format!("error [{}]: {}\n", e.code(), e),
        }
    }

    /// Read commands until `quit` or end of input.
    pub async fn run<R, W>(&self, input: R, mut output: W) -> std::io::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = input.lines();
        while let Some(line) = lines.next_line().await? {
            match self.handle_line(&line) {
                Outcome::Continue(text) => {
                    output.write_all(text.as_bytes()).await?;
                    output.flush().await?;
                }
                Outcome::Quit => {
                    tracing::debug!("Console quit requested");
                    break;
                }
            }
        }
        Ok(())
    }
}
