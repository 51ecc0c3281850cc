use std::io::Read;
use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use clap::Subcommand;
use tracing_subscriber::EnvFilter;

use sentiment_api::inference::models::model::ModelArtifact;
use sentiment_api::inference::service::PredictionService;
use sentiment_api::inference::task::predict::PredictHandler;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the serialized model artifact
    #[arg(short, long, env, default_value = "model.json")]
    model_path: PathBuf,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify text with the model and print the JSON result
    Predict {
        /// Text to classify, read from stdin when omitted
        text: Vec<String>,
    },
    /// Print a summary of the model artifact
    Inspect,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("WARN")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    match args.cmd {
        Commands::Predict { text } => {
            let text = if text.is_empty() {
                let mut input = String::new();
                std::io::stdin().read_to_string(&mut input)?;
                input
            } else {
                text.join(" ")
            };
            let service = PredictionService::from_artifact(&args.model_path)?;
            let result = service.predict(&text)?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Commands::Inspect => {
            let artifact = ModelArtifact::from_file(&args.model_path)?;
            let ngram_range = artifact.preprocessor.ngram_range;
            let (base, _, model) = artifact.build()?;
            println!("name:        {}", base.name);
            println!("version:     {}", base.version);
            println!("classifier:  {}", model.kind());
            println!("features:    {}", model.n_features());
            println!("ngrams:      {}..={}", ngram_range.0, ngram_range.1);
            println!("probability: {}", model.has_probability());
        }
    }
    Ok(())
}
