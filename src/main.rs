pub mod animation;
pub mod config;
pub mod data;
pub mod processing;
pub mod render;
pub mod server;
pub mod types;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render the service-area map to SVG and GeoJSON
    Generate {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
    },
    /// Serve the rendered map and the point API
    Serve {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
    },
    /// Print every town with its projected canvas position
    Points {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so `points` output stays pipeable
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Generate { config } => {
            tracing::info!("Generating map with config: {:?}", config);
            let app_config = config::AppConfig::load_or_default(config)?;

            let points = data::load_points(&app_config)?;
            let layout = processing::build_layout(&app_config, &points)?;
            if let Some(hub) = layout.hub() {
                tracing::info!("Connecting {} towns to hub {}", layout.connectors.len(), hub.name);
            }
            render::write_map(&app_config, &layout, &points)?;

            tracing::info!("Generation complete!");
        }
        Commands::Serve { config } => {
            tracing::info!("Serving map with config: {:?}", config);
            let app_config = config::AppConfig::load_or_default(config)?;
            let points = data::load_points(&app_config)?;

            server::start_server(app_config, points).await?;
        }
        Commands::Points { config } => {
            let app_config = config::AppConfig::load_or_default(config)?;
            let points = data::load_points(&app_config)?;
            let projector = processing::Projector::new(
                app_config.map.bounding_box(),
                app_config.map.canvas(),
            );

            println!("{:<16} {:>9} {:>9} {:>8} {:>8}", "name", "lat", "lng", "x", "y");
            for p in &points {
                let pt = projector.project_point(p);
                let marker = if p.is_hub { " (hub)" } else { "" };
                println!(
                    "{:<16} {:>9.4} {:>9.4} {:>8.2} {:>8.2}{}",
                    p.name,
                    p.lat(),
                    p.lng(),
                    pt.x,
                    pt.y,
                    marker
                );
            }
        }
    }

    Ok(())
}
