use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use eing_gml::{
    default_geopackage_path, export_to_gml, import_to_geopackage, ConversionConfig, TracingSink,
};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Export a GeoPackage to an EING GML document
    Export {
        /// Source GeoPackage
        #[arg(value_name = "GPKG")]
        input: PathBuf,

        /// Destination GML file
        #[arg(value_name = "GML")]
        output: PathBuf,

        /// Fail instead of replacing an existing GML file
        #[arg(long)]
        no_overwrite: bool,
    },
    /// Import an EING GML document into a new GeoPackage
    Import {
        /// Source GML file
        #[arg(value_name = "GML")]
        input: PathBuf,

        /// Destination GeoPackage (default: the source path with a .gpkg extension)
        #[arg(value_name = "GPKG")]
        output: Option<PathBuf>,

        /// Structural schema to use instead of the bundled one
        #[arg(long, value_name = "XSD")]
        schema: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let start_time = std::time::Instant::now();

    match args.command {
        Command::Export {
            input,
            output,
            no_overwrite,
        } => {
            let config = ConversionConfig {
                overwrite_markup: !no_overwrite,
                ..ConversionConfig::default()
            };
            let summary = export_to_gml(&input, &output, &config, &TracingSink)
                .with_context(|| format!("GML export failed: {}", output.display()))?;
            println!(
                "GML export succeeded: {} features in {} layers",
                summary.feature_count,
                summary.layers.len()
            );
        }
        Command::Import {
            input,
            output,
            schema,
        } => {
            let output = output.unwrap_or_else(|| default_geopackage_path(&input));
            let config = match schema {
                Some(path) => ConversionConfig::with_schema_path(path),
                None => ConversionConfig::default(),
            };
            let summary = import_to_geopackage(&input, &output, &config, &TracingSink)
                .with_context(|| format!("GML import failed: {}", input.display()))?;
            println!(
                "GML import succeeded: {} features written to {}",
                summary.feature_count,
                output.display()
            );
        }
    }

    info!("Total processing time: {:?}", start_time.elapsed());

    Ok(())
}
