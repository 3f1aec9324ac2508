use clap::{Parser, Subcommand};
use env_logger::{Builder, Env};
use std::path::{Path, PathBuf};

use canopy::batch::BatchRunner;
use canopy::config::{Config, ExportFormats};
use canopy::export::{MaskOutputs, write_u8_geotiff};
use canopy::model::{
    ForestConfig, load_model, predict_vegetation, save_model, train_vegetation_classifier,
};
use canopy::preprocessing::calculate_index;
use canopy::tile::TileProcessor;

#[derive(Parser)]
#[command(name = "canopy")]
#[command(version, about = "Vegetation masks from Sentinel-2 tiles", long_about = None)]
struct Cli {
    /// JSON configuration file, overridden by the flags below
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding the band files [default: data]
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Directory receiving the masks [default: output]
    #[arg(long, global = true)]
    output_dir: Option<PathBuf>,

    /// NDVI threshold for vegetation [default: 0.3]
    #[arg(long, global = true)]
    threshold: Option<f64>,

    /// Run log file [default: batch_process.log]
    #[arg(long)]
    log: Option<PathBuf>,

    /// Only write the GeoTIFF mask
    #[arg(long, global = true)]
    no_vector: bool,

    /// Debug diagnostics
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Train a random forest on one tile's threshold mask
    Train {
        /// Tile identifier, e.g. S2A_20200601_T32TQM
        #[arg(long)]
        tile: String,
        /// Model file [default: <output_dir>/<tile>_rf_model.json]
        #[arg(long)]
        model: Option<PathBuf>,
        /// Number of trees
        #[arg(long, default_value = "50")]
        trees: u16,
        /// Maximum tree depth
        #[arg(long)]
        max_depth: Option<u16>,
    },
    /// Classify one tile with a trained model
    Predict {
        #[arg(long)]
        tile: String,
        /// Model file written by `train`
        #[arg(long)]
        model: PathBuf,
    },
}

fn load_config(cli: &Cli) -> Result<Config, Box<dyn std::error::Error>> {
    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };

    if let Some(data_dir) = &cli.data_dir {
        config.set_data_dir(data_dir);
    }
    if let Some(output_dir) = &cli.output_dir {
        config.set_output_dir(output_dir);
    }
    if let Some(log) = &cli.log {
        config.set_log_file(log);
    }
    if let Some(threshold) = cli.threshold {
        config.set_index_threshold(threshold)?;
    }
    if cli.no_vector {
        config.set_export(ExportFormats::raster_only());
    }

    Ok(config)
}

fn train(
    config: &Config,
    tile: &str,
    model_path: Option<PathBuf>,
    forest: ForestConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let processor = TileProcessor::new(config);
    let bands = processor.load(&processor.locate(tile)?)?;
    let vegetation = processor.vegetation(tile, &bands)?;

    let model =
        train_vegetation_classifier(&vegetation.index, &bands.blue, &vegetation.mask, &forest)?;

    std::fs::create_dir_all(config.output_dir())?;
    let path = model_path
        .unwrap_or_else(|| config.output_dir().join(format!("{}_rf_model.json", tile)));
    save_model(&model, &path)?;
    println!(
        "✓ Trained {} trees on {}, model: {}",
        model.config().n_trees,
        tile,
        path.display()
    );

    Ok(())
}

fn predict(
    config: &Config,
    tile: &str,
    model_path: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let model = load_model(model_path)?;
    let processor = TileProcessor::new(config);
    let bands = processor.load(&processor.locate(tile)?)?;

    let index = calculate_index(&bands.nir, &bands.red, config.epsilon())?;
    let labels = predict_vegetation(&model, &index, &bands.blue)?;

    std::fs::create_dir_all(config.output_dir())?;
    let path = MaskOutputs::with_suffix(config.output_dir(), tile, "vegetation_rf").raster;
    write_u8_geotiff(&labels, &bands.profile.for_mask(), &path)?;
    println!("✓ Predicted {}: {}", tile, path.display());

    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    Builder::from_env(Env::default().default_filter_or(level)).init();

    let config = load_config(&cli)?;
    log::debug!("Bands: {}", config.bands());

    match cli.command {
        Some(Commands::Train {
            tile,
            model,
            trees,
            max_depth,
        }) => {
            let mut forest = ForestConfig::new().with_n_trees(trees);
            if let Some(depth) = max_depth {
                forest = forest.with_max_depth(depth);
            }
            train(&config, &tile, model, forest)
        }
        Some(Commands::Predict { tile, model }) => predict(&config, &tile, &model),
        None => {
            println!("Starting vegetation mask batch processing...");
            let runner = BatchRunner::new(config);
            let summary = runner.run()?;
            log::debug!(
                "{} tiles processed, {} failed",
                summary.succeeded,
                summary.failed
            );
            Ok(())
        }
    }
}
