//! Vigil CLI binary entrypoint.

use std::io;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use vigil_cli::cli::{Cli, Commands, LogFormat};
use vigil_cli::commands::{CheckCommand, RulesCommand, WatchCommand};
use vigil_cli::config::VigilConfig;
use vigil_cli::output::OutputFormat;

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

async fn run(cli: Cli) -> Result<(), vigil_cli::CliError> {
    let format = OutputFormat::new(cli.format);
    let mut stdout = io::stdout().lock();

    match cli.command {
        Commands::Check(args) => {
            let config = VigilConfig::load_or_default(cli.config.as_deref())?;
            let cmd = CheckCommand::new(&config);
            cmd.execute(&mut stdout, &format, &args).await?;
        }
        Commands::Watch(args) => {
            let config = VigilConfig::load_or_default(cli.config.as_deref())?;
            let cmd = WatchCommand::new(&config);
            cmd.execute(&mut stdout, &format, &args).await?;
        }
        Commands::Rules => {
            RulesCommand::new().execute(&mut stdout, &format)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use vigil_cli::cli::Format;

    #[test]
    fn cli_parses_check() {
        let cli = Cli::parse_from(["vigil", "check", "--strict"]);
        match cli.command {
            Commands::Check(args) => assert!(args.strict),
            _ => panic!("expected check command"),
        }
    }

    #[test]
    fn cli_parses_watch_duration() {
        let cli = Cli::parse_from(["vigil", "watch", "--duration", "3"]);
        match cli.command {
            Commands::Watch(args) => assert_eq!(args.duration, Some(3)),
            _ => panic!("expected watch command"),
        }
    }

    #[test]
    fn cli_respects_format_flag() {
        let cli = Cli::parse_from(["vigil", "--format", "json", "rules"]);
        assert_eq!(cli.format, Format::Json);
        assert!(matches!(cli.command, Commands::Rules));
    }

    #[test]
    fn cli_respects_config_flag() {
        let cli = Cli::parse_from(["vigil", "-c", "/etc/vigil.json", "check"]);
        assert_eq!(cli.config.as_deref(), Some(std::path::Path::new("/etc/vigil.json")));
    }

    #[tokio::test]
    async fn run_with_missing_config_fails() {
        let cli = Cli::parse_from(["vigil", "-c", "/nonexistent/vigil.json", "check"]);
        assert!(run(cli).await.is_err());
    }
}
