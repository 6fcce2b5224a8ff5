use anyhow::{Context, Result};
use clap::Parser;
use fruit_suitability::selection::MULTI_YEARS;
use fruit_suitability::{
    render, resolve_year, BoundaryLayer, Crop, DashboardConfig, Scenario, Selection,
};
use std::fs;
use std::path::PathBuf;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Crop: apple, grape, peach, pear or tangerine
    #[arg(short, long)]
    crop: Option<String>,

    /// Climate scenario: SSP245 or SSP585
    #[arg(short, long, default_value = "SSP245")]
    scenario: String,

    /// Year for SSP245 (2021, 2041, 2061 or 2081)
    #[arg(short, long, default_value_t = MULTI_YEARS[0])]
    year: u16,

    /// Leave the SSP585 single-year (2021) box unchecked
    #[arg(long)]
    no_single_year: bool,

    /// Raster overlay opacity between 0.0 and 1.0
    #[arg(long, default_value_t = 0.7)]
    opacity: f64,

    /// Directory holding <crop>/<scenario>/*_FULL.tif
    #[arg(long, value_name = "DIR", default_value = "full_tif")]
    raster_dir: PathBuf,

    /// District boundary GeoJSON
    #[arg(long, value_name = "FILE", default_value = "jb_sgg.geojson")]
    boundary: PathBuf,

    /// Output HTML file
    #[arg(short, long, value_name = "FILE", default_value = "map.html")]
    output: PathBuf,

    /// Also write the colourised overlay PNG
    #[arg(long, value_name = "FILE")]
    overlay_png: Option<PathBuf>,

    /// Initial zoom level
    #[arg(long, default_value_t = 8)]
    zoom: u8,

    /// Map height in pixels
    #[arg(long, default_value_t = 700)]
    height: u32,
}

fn main() -> Result<()> {
    // ログの初期化
    tracing_subscriber::fmt::init();

    let args = Args::parse();

    // 処理開始時間を記録
    let start_time = std::time::Instant::now();

    let config = DashboardConfig {
        raster_dir: args.raster_dir.clone(),
        boundary_path: args.boundary.clone(),
        zoom: args.zoom,
        height: args.height,
        ..DashboardConfig::default()
    };

    // 境界データは一度だけ読み込む
    let boundary = BoundaryLayer::open(&config.boundary_path)
        .with_context(|| format!("Failed to load boundary {:?}", config.boundary_path))?;

    let selection = build_selection(&args)?;

    let rendered = match render(&config, &boundary, &selection) {
        Ok(rendered) => rendered,
        Err(e) => {
            error!("Failed to render map: {}", e);
            return Err(e.into());
        }
    };

    if let Some(parent) = args.output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(&args.output, rendered.to_html(&config))
        .with_context(|| format!("Failed to write {:?}", args.output))?;
    info!("Written map: {:?}", args.output);

    if let Some(png_path) = &args.overlay_png {
        fs::write(png_path, &rendered.png)
            .with_context(|| format!("Failed to write {:?}", png_path))?;
        info!("Written overlay PNG: {:?}", png_path);
    }

    // 処理時間を表示
    let elapsed = start_time.elapsed();
    info!("Total processing time: {:?}", elapsed);

    Ok(())
}

fn build_selection(args: &Args) -> Result<Selection> {
    let crop = args
        .crop
        .as_deref()
        .map(str::parse::<Crop>)
        .transpose()?;
    let scenario: Scenario = args.scenario.parse()?;
    let year = resolve_year(scenario, !args.no_single_year, args.year);

    Ok(Selection {
        crop,
        scenario,
        year,
        opacity: args.opacity,
    })
}
