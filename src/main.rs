use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use image_classifier::config::ConfigLoadError;
use image_classifier::{
    ClassifierConfig, ConfigLoader, ConvolutionConfig, DataSetIterator, DatasetPipeline, Evaluator,
    JsonConfigLoader, ModelBuilder, ModelPersistence, TrainedNetwork, TrainingLoop,
};

/// Train and evaluate a convolutional image classifier on a labeled directory
#[derive(Parser, Debug)]
#[command(name = "image_classifier", version)]
struct Args {
    /// Root of the `<label>/<image>` tree
    #[arg(value_name = "DATA_DIR")]
    data_dir: PathBuf,

    /// Directory the JSON configuration resources are resolved against
    #[arg(long, value_name = "DIR", default_value = "resources")]
    resources: PathBuf,

    /// Process parameters resource; defaults apply when it is absent
    #[arg(long, value_name = "NAME", default_value = "classifier.json")]
    config: String,

    /// Kernel configuration resource
    #[arg(long, value_name = "NAME", default_value = "convolution-config.json")]
    conv_config: String,

    /// Where to write the trained model (overrides `modelPath`)
    #[arg(short, long, value_name = "FILE")]
    model_out: Option<PathBuf>,

    /// Override the number of epochs
    #[arg(short, long, value_name = "N")]
    epochs: Option<usize>,

    /// Resume from a saved model instead of building a fresh one
    #[arg(long, value_name = "FILE")]
    load: Option<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("image_classifier=info")),
        )
        .init();

    let args = Args::parse();
    let loader = JsonConfigLoader::new(&args.resources);

    let mut config = match loader.load::<ClassifierConfig>(&args.config) {
        Ok(config) => config,
        Err(ConfigLoadError::NotFound { path }) => {
            warn!("No classifier config at {}, using defaults", path.display());
            ClassifierConfig::default()
        }
        Err(e) => return Err(e).context("failed to load classifier config"),
    };
    if let Some(epochs) = args.epochs {
        config.epochs = epochs;
    }
    let kernels: ConvolutionConfig = loader
        .load(&args.conv_config)
        .with_context(|| format!("failed to load kernel config {}", args.conv_config))?;
    info!("Kernels: convolution {}, subsampling {}", kernels.convolution(), kernels.subsampling());

    let dataset = DatasetPipeline::build(&config.dataloader_config(&args.data_dir))
        .with_context(|| format!("failed to prepare dataset under {}", args.data_dir.display()))?;
    dataset.info.log();

    let mut network = match &args.load {
        Some(path) => ModelPersistence::load(path)
            .with_context(|| format!("failed to load model from {}", path.display()))?,
        None => {
            let spec = config.network_spec(&kernels).context("invalid network architecture")?;
            ModelBuilder::build(&spec, config.seed)
        }
    };
    network.log_summary();

    let mut train: Box<dyn DataSetIterator> = if config.prefetch > 0 {
        Box::new(dataset.train.prefetch(config.prefetch))
    } else {
        Box::new(dataset.train)
    };
    let mut test = dataset.test;

    let report = TrainingLoop::new(config.training_config())
        .train_and_evaluate(&mut network, &mut *train, &mut test)
        .context("training failed")?;
    if let Some(loss) = report.final_loss() {
        info!("Training finished after {} epochs, final loss {:.5}", report.epochs.len(), loss);
    }

    report_scores("train", &network, &mut *train)?;
    report_scores("test", &network, &mut test)?;

    let model_path = args.model_out.unwrap_or(config.model_path);
    ModelPersistence::save(&network, &model_path)
        .with_context(|| format!("failed to save model to {}", model_path.display()))?;

    Ok(())
}

fn report_scores(split: &str, network: &TrainedNetwork, data: &mut dyn DataSetIterator) -> Result<()> {
    let metrics = Evaluator::evaluate(network, data).with_context(|| format!("{split} evaluation failed"))?;
    data.reset();
    println!("{split} split");
    println!("{}", metrics.stats());
    Ok(())
}
