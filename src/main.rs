use std::path::PathBuf;
use std::sync::Arc;

use eyre::{Result, WrapErr, bail};
use log::{debug, info, warn};

mod cli;

use cli::{Cli, Command, OutputFormat};
use ytbrief::completion::CompletionClient;
use ytbrief::config::{Config, Settings, config_path};
use ytbrief::pipeline::Analyzer;
use ytbrief::server::AppState;
use ytbrief::youtube::CaptionFetcher;

fn setup_logging() -> Result<()> {
    let log_dir = log_dir();
    std::fs::create_dir_all(&log_dir)?;
    let log_file = log_dir.join("ytbrief.log");

    let target = Box::new(std::fs::OpenOptions::new().create(true).append(true).open(&log_file)?);

    env_logger::Builder::from_default_env()
        .target(env_logger::Target::Pipe(target))
        .init();

    info!("Logging initialized: {}", log_file.display());
    Ok(())
}

fn log_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("ytbrief")
        .join("logs")
}

fn env_status(name: &str) -> String {
    match std::env::var(name) {
        Ok(v) if !v.trim().is_empty() => format!("  \x1b[32m✅\x1b[0m {name}"),
        _ => format!("  \x1b[31m❌\x1b[0m {name} (not set)"),
    }
}

fn build_after_help() -> String {
    let keys = ["AI_API_KEY", "ANTHROPIC_API_KEY", "OPENAI_API_KEY", "YOUTUBE_API_KEY"]
        .iter()
        .map(|k| env_status(k))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "\nENVIRONMENT:\n{keys}\n\nConfig file: {}\nLogs are written to: {}",
        config_path().display(),
        log_dir().join("ytbrief.log").display()
    )
}

fn resolve_video_id(input: &str) -> Result<String> {
    ytbrief::extract_video_id(input).ok_or_else(|| {
        eyre::eyre!(
            "could not extract video ID from: {input}\n\nSupported formats:\n  https://www.youtube.com/watch?v=ID\n  https://youtu.be/ID\n  <11-character video ID>"
        )
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    setup_logging()?;

    let after_help = build_after_help();
    let cmd = <Cli as clap::CommandFactory>::command().after_help(after_help);
    let matches = cmd.get_matches();
    let cli = <Cli as clap::FromArgMatches>::from_arg_matches(&matches)?;

    // Load config file (non-fatal if missing/invalid)
    let config = Config::load().unwrap_or_else(|e| {
        warn!("Ignoring config file {}: {e}", config_path().display());
        Config::default()
    });

    // CLI flags take priority over environment and config file
    let mut settings = Settings::from_env(&config);
    if let Some(model) = cli.model.clone() {
        settings.provider.model = model;
    }
    if let Some(api_base) = cli.api_base.clone() {
        settings.provider.api_base = Some(api_base);
    }
    if let Some(lang) = cli.lang.clone() {
        settings.lang = lang;
    }
    debug!(
        "Settings: model={} api_base={:?} lang={} api_key={}",
        settings.provider.model,
        settings.provider.api_base,
        settings.lang,
        if settings.provider.api_key.is_some() { "set" } else { "unset" },
    );

    if cli.verbose {
        let path = config_path();
        if path.exists() {
            eprintln!("Config: {}", path.display());
        }
        eprintln!("Model: {}", settings.provider.model);
    }

    let client = reqwest::Client::new();

    match cli.command {
        Command::Serve { bind } => {
            let bind = bind.unwrap_or_else(|| settings.bind.clone());
            if settings.provider.api_key.is_none() {
                warn!("No AI API key configured; analysis requests will fail");
                eprintln!("warning: no AI API key set (AI_API_KEY); analysis requests will fail");
            }

            let analyzer = build_analyzer(&client, &settings);
            let state = AppState::new(analyzer, client, settings.youtube_api_key.clone());

            eprintln!("Listening on http://{bind}");
            ytbrief::server::serve(&bind, state)
                .await
                .wrap_err_with(|| format!("server on {bind} failed"))?;
        }

        Command::Analyze { url, format, output } => {
            let video_id = resolve_video_id(&url)?;
            let analyzer = build_analyzer(&client, &settings);

            if cli.verbose {
                eprintln!("Video: {video_id}\nAnalyzing...");
            }

            let analysis = match analyzer.analyze(&video_id).await {
                Ok(a) => a,
                Err(e) => bail!("{}: {e}", e.public_message()),
            };

            let rendered = match format {
                OutputFormat::Text => ytbrief::output::render_text(&analysis),
                OutputFormat::Markdown => ytbrief::output::render_markdown(&analysis),
                OutputFormat::Json => ytbrief::output::render_json(&analysis)?,
            };

            if let Some(ref path) = output {
                std::fs::write(path, &rendered)?;
                if cli.verbose {
                    eprintln!("Output written to: {}", path.display());
                }
            } else {
                println!("{rendered}");
            }
        }

        Command::Info { url } => {
            let video_id = resolve_video_id(&url)?;
            let Some(api_key) = settings.youtube_api_key.as_deref() else {
                bail!("YOUTUBE_API_KEY environment variable not set (required for video info)");
            };

            match ytbrief::metadata::fetch_video_info(&client, api_key, &video_id).await? {
                Some(info) => println!("{}", ytbrief::output::render_video_info(&info)),
                None => bail!("video {video_id} not found"),
            }
        }
    }

    Ok(())
}

fn build_analyzer(client: &reqwest::Client, settings: &Settings) -> Analyzer {
    let fetcher = CaptionFetcher::new(client.clone(), settings.lang.clone());
    let provider = CompletionClient::new(client.clone(), settings.provider.clone());
    debug!("Analyzer using model {}", provider.model());
    Analyzer::new(Arc::new(fetcher), Arc::new(provider))
}
