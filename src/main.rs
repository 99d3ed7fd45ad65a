use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use geotify::color::parse_color;
use geotify::config::AppConfig;
use geotify::province::Province;
use geotify::render::RasterSurface;
use geotify::{Visualization, Visualizer};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Draw region outlines with a flat fill
    Outline {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
        /// Only draw the region with this name
        #[arg(short, long)]
        region: Option<String>,
        #[arg(long, default_value = "white")]
        color: String,
        /// Restrict to one province (name or two-digit code)
        #[arg(short, long)]
        province: Option<String>,
        #[arg(short, long, value_name = "PNG")]
        output: PathBuf,
    },
    /// Draw a choropleth of a value column with bars for the given regions
    Overlay {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
        /// Region names to draw bars for
        #[arg(short, long = "region")]
        regions: Vec<String>,
        #[arg(short, long)]
        value_column: Option<String>,
        #[arg(short, long)]
        province: Option<String>,
        /// Statistics table, overriding the configured one
        #[arg(long, value_name = "FILE")]
        data_csv: Option<PathBuf>,
        #[arg(short, long, value_name = "PNG")]
        output: PathBuf,
    },
}

fn load_config(path: &Path, province: Option<&str>) -> anyhow::Result<AppConfig> {
    let mut config = AppConfig::load_from_file(path)?;
    config.resolve_env_overrides();
    if let Some(province) = province {
        let province: Province = province.parse()?;
        config.join.region_code = Some(province.code().to_string());
    }
    Ok(config)
}

fn render(config: &AppConfig, request: Visualization, output: &Path) -> anyhow::Result<()> {
    let visualizer = Visualizer::load(config)?;

    let mut surface = RasterSurface::new(
        config.output.width,
        config.output.height,
        parse_color(&config.style.background)?,
        config.output.padding,
    );
    if let Some(font) = &config.output.title_font {
        surface = surface.with_font(font)?;
    }

    let frame = visualizer.visualize(&request, &mut surface)?;
    for warning in &frame.warnings {
        eprintln!("warning: {}", warning);
    }

    surface
        .save(output)
        .with_context(|| format!("Failed to write {:?}", output))?;
    println!("{} -> {:?}", frame.title, output);
    Ok(())
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Outline {
            config,
            region,
            color,
            province,
            output,
        } => {
            let app_config = load_config(&config, province.as_deref())?;
            let request = Visualization::Outline {
                region,
                fill: parse_color(&color)?,
            };
            render(&app_config, request, &output)?;
        }
        Commands::Overlay {
            config,
            regions,
            value_column,
            province,
            data_csv,
            output,
        } => {
            let mut app_config = load_config(&config, province.as_deref())?;
            if let Some(path) = data_csv {
                app_config.input.data_csv = path;
            }
            let Some(value_column) = value_column.or_else(|| app_config.join.value_column.clone())
            else {
                bail!("No value column given; pass --value-column or set join.value_column");
            };
            let request = Visualization::Overlay {
                regions,
                value_column,
            };
            render(&app_config, request, &output)?;
        }
    }

    Ok(())
}
