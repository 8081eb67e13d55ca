//! Quote lookups through an external helper process.
//!
//! Each lookup spawns the helper, writes `(<source> "<symbol>")` to its stdin
//! and reads a single response line from stdout (see [`super::parser`]).

use std::process::Stdio;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};

use super::{HelperResponse, Quote, QuoteFetcher, ResponseParser};

pub const DEFAULT_HELPER_PROGRAM: &str = "gnc-fq-helper";
pub const DEFAULT_HELPER_TIMEOUT: Duration = Duration::from_secs(60);

/// How to launch the helper: a program plus leading arguments.
///
/// The default runs `gnc-fq-helper` directly; an alternate invocation such as
/// `perl /opt/fq/gnc-fq-helper` is expressed as program `perl` with the script
/// path as the first argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HelperCommand {
    pub program: String,
    pub args: Vec<String>,
    pub timeout: Duration,
}

impl Default for HelperCommand {
    fn default() -> Self {
        Self {
            program: DEFAULT_HELPER_PROGRAM.to_string(),
            args: Vec::new(),
            timeout: DEFAULT_HELPER_TIMEOUT,
        }
    }
}

impl HelperCommand {
    /// Build from a full command line, e.g. `["perl", "gnc-fq-helper"]`.
    pub fn from_argv(argv: &[String], timeout: Duration) -> Option<Self> {
        let (program, args) = argv.split_first()?;
        Some(Self {
            program: program.clone(),
            args: args.to_vec(),
            timeout,
        })
    }
}

pub struct HelperFetcher {
    command: HelperCommand,
    parser: ResponseParser,
}

impl HelperFetcher {
    pub fn new(command: HelperCommand) -> Result<Self> {
        Ok(Self {
            command,
            parser: ResponseParser::new()?,
        })
    }

    pub fn request_line(symbol: &str, source: &str) -> String {
        format!("({} \"{}\")\n", source, symbol.replace('"', "\\\""))
    }

    async fn run_helper(&self, request: &str) -> Result<Option<String>> {
        let mut child = Command::new(&self.command.program)
            .args(&self.command.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("Failed to start quote helper {}", self.command.program))?;

        let mut stdin = child.stdin.take().context("Quote helper stdin unavailable")?;
        stdin
            .write_all(request.as_bytes())
            .await
            .context("Failed to write request to quote helper")?;
        drop(stdin);

        let output = match tokio::time::timeout(self.command.timeout, child.wait_with_output())
            .await
        {
            Ok(output) => output.context("Failed to read quote helper output")?,
            Err(_) => {
                warn!(
                    program = %self.command.program,
                    timeout_ms = self.command.timeout.as_millis() as u64,
                    "quote helper timed out"
                );
                return Ok(None);
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        debug!(output = %stdout.trim_end(), error = %stderr.trim_end(), "quote helper finished");

        if !output.status.success() {
            warn!(
                status = %output.status,
                error = %stderr.trim_end(),
                "quote helper exited unsuccessfully"
            );
            return Ok(None);
        }

        Ok(Some(stdout.into_owned()))
    }
}

#[async_trait::async_trait]
impl QuoteFetcher for HelperFetcher {
    async fn fetch(&self, symbol: &str, source: &str) -> Result<Option<Quote>> {
        let request = Self::request_line(symbol, source);
        debug!(symbol, source, request = %request.trim_end(), "sending quote request");

        let Some(output) = self.run_helper(&request).await? else {
            return Ok(None);
        };

        match self.parser.parse(&output) {
            HelperResponse::Found(quote) => Ok(Some(quote)),
            HelperResponse::NotFound => {
                debug!(symbol, source, "quote helper found no price");
                Ok(None)
            }
            HelperResponse::Malformed(reason) => {
                warn!(symbol, source, output = %output.trim_end(), %reason, "no match on helper output");
                Ok(None)
            }
        }
    }

    fn name(&self) -> &str {
        &self.command.program
    }
}
