use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use sticker_studio::prompt::settings::MAX_STYLE_STRENGTH;
use sticker_studio::utils::export::{decode_data_uri, metadata_json, save_data_uri, save_metadata, sticker_filename};
use sticker_studio::utils::upload::UploadedImage;
use sticker_studio::workflow::StickerResult;
use sticker_studio::{
    Config, GeminiClient, GenerationSettings, PromptConstructor, PromptSubject, StylePreset, WorkflowController,
};

#[derive(Parser, Debug)]
#[command(name = "stickerctl", about = "Turn a photo into a sticker set", version)]
struct Cli {
    /// Override GEMINI_MODEL
    #[arg(global = true, long)]
    model: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug, Clone)]
struct SettingsArgs {
    /// Style preset id (see `stickerctl styles`)
    #[arg(long, default_value = "cute")]
    style: StylePreset,
    /// Free-text style; implies --style custom
    #[arg(long, value_name = "TEXT")]
    custom_style: Option<String>,
    /// How strongly the style is applied, 0-100
    #[arg(long, default_value_t = 70, value_parser = clap::value_parser!(u8).range(0..=MAX_STYLE_STRENGTH as i64))]
    strength: u8,
    /// Extra details about the subject
    #[arg(long, value_name = "TEXT", default_value = "")]
    description: String,
    /// Do not ask the model to keep the subject's likeness
    #[arg(long)]
    no_character_consistency: bool,
    /// Do not ask the model to keep the style uniform across the set
    #[arg(long)]
    no_style_consistency: bool,
}

impl SettingsArgs {
    fn to_settings(&self) -> GenerationSettings {
        let settings = GenerationSettings::default()
            .with_style(self.style)
            .with_strength(self.strength)
            .with_description(self.description.clone())
            .with_character_consistency(!self.no_character_consistency)
            .with_style_consistency(!self.no_style_consistency);
        match &self.custom_style {
            Some(text) => settings.with_custom_style(text.clone()),
            None => settings,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List style presets
    Styles,
    /// Print the prompt that would be sent, without calling the API
    Prompt {
        #[command(flatten)]
        settings: SettingsArgs,
        /// Build the prompt for this action or emotion instead of the original pose
        #[arg(long, value_name = "TEXT")]
        action: Option<String>,
    },
    /// Print the metadata document for the given settings
    Metadata {
        #[command(flatten)]
        settings: SettingsArgs,
        /// Write sticker-metadata.json into this directory instead of stdout
        #[arg(long, value_name = "DIR")]
        out: Option<PathBuf>,
    },
    /// Generate a base sticker and optional variants from a photo
    Generate {
        /// Photo to turn into stickers
        #[arg(long, value_name = "PATH")]
        image: PathBuf,
        /// Confirm you have permission to use this photo
        #[arg(long)]
        accept: bool,
        #[command(flatten)]
        settings: SettingsArgs,
        /// Comma-separated captions, up to 12 (e.g. "yes, no, ok")
        #[arg(long, value_name = "LIST", conflicts_with = "random_variants")]
        variants: Option<String>,
        /// Also generate three random variants
        #[arg(long)]
        random_variants: bool,
        /// Gemini API key
        #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
        api_key: Option<String>,
        /// Output directory (defaults to OUTPUT_DIR)
        #[arg(long, value_name = "DIR")]
        out: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load env and parse CLI
    Config::dotenv_load();
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let mut conf = Config::new()?;
    if let Some(model) = cli.model {
        conf.model = model;
    }

    match cli.command {
        Commands::Styles => {
            for preset in StylePreset::ALL {
                println!("{:<12} {}", preset.id(), preset.label());
            }
            Ok(())
        }
        Commands::Prompt { settings, action } => {
            let subject = match action.as_deref() {
                Some(a) => PromptSubject::Action(a),
                None => PromptSubject::Original,
            };
            println!("{}", PromptConstructor::new().construct_prompt(&settings.to_settings(), subject));
            Ok(())
        }
        Commands::Metadata { settings, out } => {
            let settings = settings.to_settings();
            match out {
                Some(dir) => {
                    let path = save_metadata(&settings, &conf.model, dir).await?;
                    println!("Saved {}", path.display());
                }
                None => {
                    let body = metadata_json(&settings, chrono::Utc::now(), &conf.model)?;
                    println!("{}", body);
                }
            }
            Ok(())
        }
        Commands::Generate { image, accept, settings, variants, random_variants, api_key, out } => {
            if let Some(key) = api_key {
                conf.gemini_api_key = Some(key);
            }
            let client = GeminiClient::from_config(&conf).map_err(|e| {
                eprintln!("Error: {}", e);
                e
            })?;
            let out_dir = out.unwrap_or_else(|| PathBuf::from(&conf.output_dir));

            let mut controller = WorkflowController::new(Some(client), conf.model.clone());
            controller.update_settings(settings.to_settings())?;
            controller.upload_image(UploadedImage::from_path(&image).await?)?;
            controller.set_consent(accept)?;
            if !controller.can_generate_base() {
                eprintln!("Pass --accept to confirm you have permission to use this photo");
                std::process::exit(2);
            }

            eprintln!("Generating base sticker...");
            let base = controller.generate_base().await.map_err(|e| {
                eprintln!("Error: {}", e);
                e
            })?;
            save_sticker(0, &base, &out_dir).await?;

            let batch = match variants {
                Some(text) => Some(controller.generate_custom_variants(&text).await?),
                None if random_variants => Some(controller.confirm_base().await?),
                None => None,
            };
            if let Some(batch) = batch {
                for err in &batch.errors {
                    eprintln!("Warning: {}", err);
                }
                for (i, sticker) in batch.variants.iter().enumerate() {
                    save_sticker(i + 1, sticker, &out_dir).await?;
                }
            }

            let path = save_metadata(controller.settings(), controller.model(), &out_dir).await?;
            println!("Saved {}", path.display());
            Ok(())
        }
    }
}

async fn save_sticker(index: usize, sticker: &StickerResult, dir: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let (media_type, _) = decode_data_uri(&sticker.image)?;
    let filename = sticker_filename(index, &sticker.label, &media_type);
    let path = save_data_uri(&sticker.image, dir, &filename).await?;
    println!("Saved {} ({})", path.display(), sticker.label);
    Ok(())
}
