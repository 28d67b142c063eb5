//! promptgate command line
//!
//! Checks a chat completion body against a configured guardrail, or validates
//! a configuration file.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use promptgate_common::{init_tracing, LogFormat};
use promptgate_config::{Config, ValidationResult, DEFAULT_GUARDRAIL_NAME};
use promptgate_guardrail::{
    CallType, GuardrailError, GuardrailProcessor, InboundRequest, RequestContext,
};
use tracing::{debug, error};

/// Exit status when the request is blocked
const EXIT_BLOCKED: u8 = 2;

#[derive(Parser, Debug)]
#[command(name = "promptgate", version, about = "Prompt injection guardrail for LLM gateways")]
struct Cli {
    /// Log output format (pretty or json)
    #[arg(long, global = true, default_value = "pretty", env = "PROMPTGATE_LOG_FORMAT")]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Screen a chat completion request body
    Check {
        /// Path to the KDL configuration file
        #[arg(short, long, env = "PROMPTGATE_CONFIG")]
        config: PathBuf,

        /// Path to the JSON request body
        #[arg(short, long)]
        request: PathBuf,

        /// Guardrail name to run
        #[arg(long, default_value = DEFAULT_GUARDRAIL_NAME)]
        guardrail: String,

        /// Gateway call type tag
        #[arg(long, default_value = "completion")]
        call_type: String,
    },

    /// Validate a configuration file
    Validate {
        /// Path to the KDL configuration file
        #[arg(short, long, env = "PROMPTGATE_CONFIG")]
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.log_format, "promptgate=info,warn");

    match run(cli.command).await {
        Ok(code) => code,
        Err(e) => {
            error!(error = %e, "promptgate failed");
            eprintln!("error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Command) -> Result<ExitCode> {
    match command {
        Command::Check {
            config,
            request,
            guardrail,
            call_type,
        } => check(config, request, guardrail, call_type).await,
        Command::Validate { config } => {
            let config = Config::from_file(&config)?;
            let result = config.validate();
            report_validation(&result);
            Ok(if result.is_valid() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
    }
}

async fn check(
    config_path: PathBuf,
    request_path: PathBuf,
    guardrail: String,
    call_type: String,
) -> Result<ExitCode> {
    let config = Config::from_file(&config_path)?;
    let validation = config.validate();
    if !validation.is_valid() {
        report_validation(&validation);
        return Ok(ExitCode::FAILURE);
    }

    let body = tokio::fs::read(&request_path)
        .await
        .with_context(|| format!("Failed to read request file {}", request_path.display()))?;
    let request = InboundRequest::from_slice(&body)?;

    let processor = GuardrailProcessor::from_config(&config, &guardrail)?;
    let ctx = RequestContext::new(CallType::from(call_type.as_str()));

    debug!(
        correlation_id = %ctx.correlation_id,
        guardrail = %guardrail,
        message_count = request.messages.len(),
        "Checking request"
    );

    match processor.moderate(&request, &ctx).await {
        Ok(outcome) => {
            println!("{}", outcome);
            Ok(ExitCode::SUCCESS)
        }
        Err(e @ GuardrailError::Violation(_)) => {
            println!("blocked ({})", e.status_code());
            println!("{}", serde_json::to_string_pretty(&e.detail())?);
            Ok(ExitCode::from(EXIT_BLOCKED))
        }
        Err(e) => Err(e.into()),
    }
}

fn report_validation(result: &ValidationResult) {
    for warning in &result.warnings {
        eprintln!("warning: {}", warning);
    }
    for error in &result.errors {
        eprintln!("error: {}", error);
    }
    if result.is_valid() {
        println!("configuration ok ({} warnings)", result.warnings.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_check() {
        let cli = Cli::try_parse_from([
            "promptgate",
            "--log-format",
            "json",
            "check",
            "--config",
            "promptgate.kdl",
            "--request",
            "body.json",
        ])
        .unwrap();

        assert_eq!(cli.log_format, LogFormat::Json);
        match cli.command {
            Command::Check {
                guardrail,
                call_type,
                ..
            } => {
                assert_eq!(guardrail, DEFAULT_GUARDRAIL_NAME);
                assert_eq!(call_type, "completion");
            }
            other => panic!("expected check, got {:?}", other),
        }
    }
}
