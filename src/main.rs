mod basemap;
mod bbox;
mod config;
mod extract;
mod pipeline;
mod raster;
mod readers;
mod render;
mod sites;

use config::Config;
use pipeline::Pipeline;

const DEFAULT_CONFIG: &str = "./data/config/pipeline.json";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG.to_string());

    println!("Starting environmental covariate extraction...");

    let config = Config::from_file(&config_path)?;
    let summary = Pipeline::new(config).run()?;

    println!(
        "Extracted {} sites x {} variables ({} missing values)",
        summary.sites, summary.layers, summary.missing_values
    );
    println!("Covariate table: {}", summary.table.display());
    println!("Figures written: {}", summary.figures.len());

    Ok(())
}
