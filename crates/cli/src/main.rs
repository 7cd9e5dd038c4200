//! Binary entry point for the SRT translator.

use anyhow::Result;
use clap::{ArgGroup, Parser};
use srtllm_core::config::Config;
use srtllm_core::translate::{
    openai::OpenAiTranslator, process_file, process_folder, JobOptions, SubtitleTranslator,
    AUTO_DETECT,
};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// SRT file translator using an LLM.
#[derive(Parser, Debug)]
#[command(group(ArgGroup::new("input").required(true).args(["file", "folder"])))]
struct Cli {
    /// Source SRT file path.
    #[arg(long)]
    file: Option<PathBuf>,

    /// Folder whose `.srt` files are all translated.
    #[arg(long)]
    folder: Option<PathBuf>,

    /// Source language (e.g. Spanish); detected per line when omitted.
    #[arg(long, default_value = AUTO_DETECT)]
    source_lang: String,

    /// Target language (e.g. English); also used as the output file tag.
    #[arg(long)]
    target_lang: String,

    /// Number of subtitle lines to translate per request.
    #[arg(long)]
    batch_size: Option<usize>,

    /// Enable verbose debug and trace logs, including model payloads.
    #[arg(long)]
    debug: bool,
}

/// Build the log filter; `verbose` enables trace output for our crates.
fn log_filter(verbose: bool) -> Result<EnvFilter> {
    let filter = if verbose {
        EnvFilter::default()
            .add_directive("srtllm=trace".parse()?)
            .add_directive("srtllm_core=trace".parse()?)
            .add_directive("info".parse()?)
    } else {
        EnvFilter::default()
            .add_directive("srtllm=info".parse()?)
            .add_directive("srtllm_core=info".parse()?)
            .add_directive("warn".parse()?)
    };
    Ok(filter)
}

/// Application entry point which parses CLI args and performs actions.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = Config::from_env()?;
    if let Some(size) = cli.batch_size {
        config.batch_size = size;
    }
    config.debug |= cli.debug;
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(config.debug)?)
        .init();

    let job = JobOptions {
        source_language: cli.source_lang,
        target_language: cli.target_lang,
        batch_size: config.batch_size,
    };
    let translator = SubtitleTranslator::new(OpenAiTranslator::new(&config)?, &config)?;
    match (cli.file, cli.folder) {
        (Some(file), None) => {
            process_file(&file, &translator, &job).await?;
        }
        (None, Some(folder)) => {
            process_folder(&folder, &translator, &job).await?;
        }
        _ => anyhow::bail!("specify exactly one of --file or --folder"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_file_job_with_defaults() {
        let cli = Cli::try_parse_from(["srtllm", "--file", "a.srt", "--target-lang", "en"]).unwrap();
        assert_eq!(cli.file, Some(PathBuf::from("a.srt")));
        assert_eq!(cli.source_lang, AUTO_DETECT);
        assert_eq!(cli.batch_size, None);
        assert!(!cli.debug);
    }

    #[test]
    fn parses_folder_job_with_options() {
        let cli = Cli::try_parse_from([
            "srtllm",
            "--folder",
            "subs",
            "--target-lang",
            "English",
            "--source-lang",
            "Spanish",
            "--batch-size",
            "20",
            "--debug",
        ])
        .unwrap();
        assert_eq!(cli.folder, Some(PathBuf::from("subs")));
        assert_eq!(cli.source_lang, "Spanish");
        assert_eq!(cli.batch_size, Some(20));
        assert!(cli.debug);
    }

    #[test]
    fn debug_setting_enables_payload_logging() {
        use tracing_subscriber::filter::LevelFilter;
        assert_eq!(
            log_filter(true).unwrap().max_level_hint(),
            Some(LevelFilter::TRACE)
        );
        assert_eq!(
            log_filter(false).unwrap().max_level_hint(),
            Some(LevelFilter::INFO)
        );
    }

    #[test]
    fn requires_file_or_folder() {
        assert!(Cli::try_parse_from(["srtllm", "--target-lang", "en"]).is_err());
    }

    #[test]
    fn rejects_file_and_folder_together() {
        assert!(Cli::try_parse_from([
            "srtllm",
            "--file",
            "a.srt",
            "--folder",
            "subs",
            "--target-lang",
            "en"
        ])
        .is_err());
    }

    #[test]
    fn requires_target_language() {
        assert!(Cli::try_parse_from(["srtllm", "--file", "a.srt"]).is_err());
    }
}
