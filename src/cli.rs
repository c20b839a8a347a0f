use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Markdown,
    Json,
}

#[derive(Parser)]
#[command(
    name = "ytbrief",
    about = "YouTube transcript analyzer",
    version = env!("GIT_DESCRIBE"),
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// LLM model for analysis (overrides AI_MODEL and the config file)
    #[arg(long, global = true)]
    pub model: Option<String>,

    /// OpenAI-compatible API base URL (overrides AI_API_BASE)
    #[arg(long, global = true)]
    pub api_base: Option<String>,

    /// Preferred caption language
    #[arg(short, long, global = true)]
    pub lang: Option<String>,

    /// Show resolved settings and video details on stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the HTTP analysis service
    Serve {
        /// Address to listen on, e.g. 0.0.0.0:8080
        #[arg(short, long)]
        bind: Option<String>,
    },

    /// Analyze one video and print the result
    Analyze {
        /// YouTube video URL or video ID
        url: String,

        /// Output format: text (default), markdown, json
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,

        /// Write output to file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show title, channel, duration and counts for a video
    Info {
        /// YouTube video URL or video ID
        url: String,
    },
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
    fn test_parse_analyze() {
        let cli = Cli::try_parse_from(["ytbrief", "analyze", "dQw4w9WgXcQ", "-f", "json", "--model", "gpt-4o"]).unwrap();
        assert_eq!(cli.model.as_deref(), Some("gpt-4o"));
        match cli.command {
            Command::Analyze { url, format, output } => {
                assert_eq!(url, "dQw4w9WgXcQ");
                assert_eq!(format, OutputFormat::Json);
                assert!(output.is_none());
            }
            _ => panic!("expected analyze"),
        }
    }

    #[test]
    fn test_parse_serve() {
        let cli = Cli::try_parse_from(["ytbrief", "serve", "--bind", "0.0.0.0:8080"]).unwrap();
        assert!(matches!(cli.command, Command::Serve { bind: Some(ref b) } if b == "0.0.0.0:8080"));
    }
}
