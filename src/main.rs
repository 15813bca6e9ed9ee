use anyhow::Result;
use clap::{Parser, Subcommand};
use doc_qa::commands::{ask, check_health, init_config};
use doc_qa::config::{Config, get_config_dir, show_config};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "doc-qa")]
#[command(about = "Answer questions about a document with a local language model")]
#[command(version)]
struct Cli {
    /// Directory holding config.toml (defaults to ~/.doc-qa)
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,
    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Answer the questions in a JSON file against a document
    Ask {
        /// Document to answer from (.pdf, .json, .txt or .md)
        #[arg(long, short)]
        document: PathBuf,
        /// JSON file with the questions
        #[arg(long, short)]
        questions: PathBuf,
        /// Write the answers here instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Check that Ollama is reachable and the configured models are installed
    Health,
    /// Show or initialize the configuration
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
        /// Write the default configuration file
        #[arg(long, conflicts_with = "show")]
        init: bool,
    },
}

fn init_tracing(json: bool) {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.json);

    let config_dir = match cli.config_dir {
        Some(dir) => dir,
        None => get_config_dir()?,
    };

    match cli.command {
        Commands::Ask {
            document,
            questions,
            output,
        } => {
            let config = Config::load(&config_dir)?;
            ask(&config, &document, &questions, output.as_deref()).await?;
        }
        Commands::Health => {
            check_health(&Config::load(&config_dir)?)?;
        }
        Commands::Config { init: true, .. } => {
            init_config(&config_dir)?;
        }
        Commands::Config { .. } => {
            show_config(&Config::load(&config_dir)?)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    #[test]
    fn ask_command_arguments() {
        let cli = Cli::try_parse_from([
            "doc-qa",
            "ask",
            "--document",
            "doc.json",
            "-q",
            "questions.json",
        ]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            if let Commands::Ask {
                document,
                questions,
                output,
            } = parsed.command
            {
                assert_eq!(document, PathBuf::from("doc.json"));
                assert_eq!(questions, PathBuf::from("questions.json"));
                assert_eq!(output, None);
            }
        }
    }

    #[test]
    fn ask_requires_document_and_questions() {
        let cli = Cli::try_parse_from(["doc-qa", "ask", "--document", "doc.json"]);
        assert!(cli.is_err());

        if let Err(err) = cli {
            assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
        }
    }

    #[test]
    fn global_flags() {
        let cli = Cli::try_parse_from(["doc-qa", "health", "--json", "--config-dir", "/tmp/qa"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            assert!(parsed.json);
            assert_eq!(parsed.config_dir, Some(PathBuf::from("/tmp/qa")));
            assert!(matches!(parsed.command, Commands::Health));
        }
    }

    #[test]
    fn config_show_flag() {
        let cli = Cli::try_parse_from(["doc-qa", "config", "--show"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            if let Commands::Config { show, init } = parsed.command {
                assert!(show);
                assert!(!init);
            }
        }
    }

    #[test]
    fn config_show_and_init_conflict() {
        let cli = Cli::try_parse_from(["doc-qa", "config", "--show", "--init"]);
        assert!(cli.is_err());

        if let Err(err) = cli {
            assert_eq!(err.kind(), ErrorKind::ArgumentConflict);
        }
    }

    #[test]
    fn invalid_command() {
        let cli = Cli::try_parse_from(["doc-qa", "invalid"]);
        assert!(cli.is_err());

        if let Err(err) = cli {
            assert_eq!(err.kind(), ErrorKind::InvalidSubcommand);
        }
    }

    #[test]
    fn help_message() {
        let cli = Cli::try_parse_from(["doc-qa", "--help"]);
        assert!(cli.is_err());

        if let Err(err) = cli {
            assert_eq!(err.kind(), ErrorKind::DisplayHelp);
        }
    }
}
