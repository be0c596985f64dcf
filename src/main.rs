mod api;
mod config;
mod error;
mod pipeline;
mod process;
mod scene;
mod video;

use std::path::PathBuf;

use anyhow::Context;
use api::{EdgeTtsClient, GeminiClient, HuggingFaceClient};
use clap::Parser;
use config::{AssetFailurePolicy, Config};
use pipeline::Pipeline;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "auto-short")]
#[command(about = "Generate a narrated vertical short video from a topic", long_about = None)]
struct Args {
    /// Topic for the video (prompted for when omitted)
    #[arg(short, long)]
    topic: Option<String>,

    /// Output video file path
    #[arg(short, long, default_value = "output/final_short.mp4")]
    output: PathBuf,

    /// Working directory for the voiceover and scene images
    #[arg(short = 'w', long, default_value = "assets")]
    work_dir: PathBuf,

    /// Gemini API key
    #[arg(long)]
    gemini_api_key: Option<String>,

    /// Hugging Face access token
    #[arg(long)]
    hf_token: Option<String>,

    /// edge-tts voice name
    #[arg(long)]
    voice: Option<String>,

    /// What to do when a scene image cannot be generated
    #[arg(long, value_enum, default_value_t = AssetFailurePolicy::Abort)]
    on_asset_failure: AssetFailurePolicy,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_thread_ids(false)
        .with_level(true)
        .init();

    dotenvy::dotenv().ok();

    let args = Args::parse();

    let mut config = Config::from_env();
    config.output_path = args.output;
    config.work_dir = args.work_dir;
    config.on_asset_failure = args.on_asset_failure;
    if let Some(key) = args.gemini_api_key {
        config.gemini_api_key = key;
    }
    if let Some(token) = args.hf_token {
        config.huggingface_token = token;
    }
    if let Some(voice) = args.voice {
        config.voice = voice;
    }
    config.validate()?;

    let topic = match args.topic {
        Some(topic) => topic,
        None => prompt_topic().await?,
    };
    if topic.trim().is_empty() {
        anyhow::bail!("a topic is required");
    }

    let pipeline = build_pipeline(config).context("Failed to set up service clients")?;

    info!("Starting auto-short generation for: {}", topic.trim());
    match pipeline.run(topic.trim()).await {
        Ok(path) => {
            info!("Done! Video saved to: {}", path.display());
            Ok(())
        }
        Err(e) => {
            error!("Video generation failed: {}", e);
            std::process::exit(1);
        }
    }
}

fn build_pipeline(config: Config) -> error::Result<Pipeline> {
    let text = GeminiClient::new(
        config.gemini_api_key.clone(),
        config.text_model.clone(),
        config.text_api_base.clone(),
        config.timeouts.text,
    )?;
    let images = HuggingFaceClient::new(
        config.huggingface_token.clone(),
        config.image_api_url.clone(),
        config.timeouts.image,
    )?;
    let speech = EdgeTtsClient::new(config.voice.clone(), config.timeouts.speech);

    Ok(Pipeline::new(
        config,
        Box::new(text),
        Box::new(speech),
        Box::new(images),
    ))
}

async fn prompt_topic() -> anyhow::Result<String> {
    let mut stdout = tokio::io::stdout();
    stdout
        .write_all(b"Enter a topic for your video (e.g. 'What happens if you swallow a spider?'): ")
        .await?;
    stdout.flush().await?;

    let mut line = String::new();
    BufReader::new(tokio::io::stdin())
        .read_line(&mut line)
        .await
        .context("Failed to read topic from stdin")?;
    Ok(line)
}
