//! Headless PogoTrack session.
//!
//! Loads an image, replays a scripted pointer session against the viewer,
//! prints the readouts and writes the resulting image, mask and rendered
//! scene as PNG files.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, ValueEnum};

use pogotrack::loader::save_image;
use pogotrack::processing::{MaxChannelThreshold, OtsuComponentLabeler};
use pogotrack::{
    ImageSurface, OverlayLayer, PointerButton, Readouts, ScreenPoint, ToolKind,
    ViewerConfig, ViewerError, ViewportController,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum CliTool {
    Line,
    Rectangle,
    Circle,
}

impl From<CliTool> for ToolKind {
    fn from(tool: CliTool) -> Self {
        match tool {
            CliTool::Line => ToolKind::Line,
            CliTool::Rectangle => ToolKind::Rectangle,
            CliTool::Circle => ToolKind::Circle,
        }
    }
}

/// A drag between two screen points.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Region {
    from: ScreenPoint,
    to: ScreenPoint,
}

/// Parse `x0,y0,x1,y1`.
fn parse_region(s: &str) -> Result<Region, String> {
    let values = s
        .split(',')
        .map(|part| {
            part.trim()
                .parse::<f64>()
                .map_err(|e| format!("'{}': {}", part.trim(), e))
        })
        .collect::<Result<Vec<_>, _>>()?;
    match values.as_slice() {
        [x0, y0, x1, y1] => Ok(Region {
            from: ScreenPoint::new(*x0, *y0),
            to: ScreenPoint::new(*x1, *y1),
        }),
        _ => Err(format!("expected x0,y0,x1,y1, got {} values", values.len())),
    }
}

/// Replay a pointer session against an image without a window.
#[derive(Parser, Debug)]
#[command(name = "pogotrack", about = "PogoTrack headless viewer session")]
struct CliArgs {
    /// Image to load (PNG, JPEG or BMP)
    input: PathBuf,

    /// Directory the output PNGs are written to
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,

    /// Tool used for --region
    #[arg(short, long, value_enum, default_value_t = CliTool::Rectangle)]
    tool: CliTool,

    /// Drag in screen coordinates, `x0,y0,x1,y1`; area tools apply the mask
    #[arg(short, long, value_parser = parse_region)]
    region: Option<Region>,

    /// Wheel rotation (120 per notch) applied at the origin before dragging
    #[arg(long, allow_negative_numbers = true)]
    wheel: Option<f64>,

    /// Max-channel threshold level
    #[arg(long)]
    threshold: Option<u8>,

    /// Label connected components after filtering
    #[arg(long)]
    components: bool,

    /// Configuration file; defaults to the user config path
    #[arg(short, long)]
    config: Option<PathBuf>,
}

fn print_readouts(readouts: &Readouts) {
    if let Some(position) = &readouts.position {
        println!("{}", position);
    }
    if let Some(pixel) = &readouts.pixel {
        println!("{}", pixel);
    }
    if let Some(measurement) = &readouts.measurement {
        println!("{}", measurement);
    }
}

fn run(args: &CliArgs, config: ViewerConfig) -> Result<(), ViewerError> {
    let mut viewer = ViewportController::new(config);
    viewer.load_path(&args.input)?;

    if let Some(delta) = args.wheel {
        viewer.wheel(ScreenPoint::new(0.0, 0.0), delta);
    }

    if let Some(region) = args.region {
        let tool = ToolKind::from(args.tool);
        viewer.set_tool(tool);
        viewer.pointer_down(region.from, PointerButton::Left);
        let readouts = viewer.pointer_move(region.to);
        viewer.pointer_up(PointerButton::Left);
        print_readouts(&readouts);

        if tool.produces_mask() {
            viewer.apply_mask()?;
        }
    }

    if let Some(level) = args.threshold {
        viewer.apply_filter(&MaxChannelThreshold::new(level))?;
    }

    if args.components {
        viewer.label_components(&OtsuComponentLabeler::default())?;
        if let OverlayLayer::ComponentMarkers { centers, areas } = viewer.current_overlay() {
            for ((x, y), area) in centers.iter().zip(areas) {
                println!("{} ({}, {})", area, x.round() as i64, y.round() as i64);
            }
        }
    }

    for entry in viewer.history().entries() {
        log::debug!("history: {}", entry.action().description());
    }

    write_outputs(&viewer, &args.output_dir)
}

fn write_outputs(viewer: &ViewportController, dir: &Path) -> Result<(), ViewerError> {
    std::fs::create_dir_all(dir)?;

    let image = viewer.current_image()?;
    save_image(&image.to_dynamic(), &dir.join("result.png"))?;

    if let Some(mask) = viewer.active_mask() {
        save_image(
            &image::DynamicImage::ImageLuma8(mask.to_gray_image()),
            &dir.join("mask.png"),
        )?;
    }

    let transform = viewer.transform();
    let (pan_x, pan_y) = transform.pan_offset();
    let extent = |size: u32, pan: f64| ((f64::from(size) * transform.scale() + pan).ceil() as u32).max(1);
    let mut surface = ImageSurface::new(
        extent(image.width(), pan_x),
        extent(image.height(), pan_y),
    );
    viewer.render(&mut surface);
    if surface.skipped_text() > 0 {
        log::debug!("Scene labels not rasterized: {}", surface.skipped_text());
    }
    save_image(
        &image::DynamicImage::ImageRgb8(surface.into_image()),
        &dir.join("scene.png"),
    )
}

fn load_config(path: Option<&Path>) -> Result<ViewerConfig, pogotrack::ConfigError> {
    match path {
        Some(path) => ViewerConfig::load(path),
        None => Ok(ViewerConfig::load_from_default_path().unwrap_or_default()),
    }
}

fn main() -> ExitCode {
    let args = CliArgs::parse();

    let config = match load_config(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    env_logger::Builder::new()
        .filter_level(config.log_level.to_level_filter())
        .parse_default_env()
        .init();

    match run(&args, config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_region() {
        let region = parse_region("100, 100,200,250.5").expect("four values");
        assert_eq!(region.from, ScreenPoint::new(100.0, 100.0));
        assert_eq!(region.to, ScreenPoint::new(200.0, 250.5));
    }

    #[test]
    fn test_parse_region_rejects_bad_input() {
        assert!(parse_region("1,2,3").is_err());
        assert!(parse_region("1,2,three,4").is_err());
    }

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        CliArgs::command().debug_assert();
    }

    #[test]
    fn test_session_writes_outputs() {
        let dir = tempfile::tempdir().expect("temp dir");
        let input = dir.path().join("plate.png");
        let gray = image::GrayImage::from_fn(20, 20, |x, y| {
            image::Luma([if (5..10).contains(&x) && (5..10).contains(&y) { 250 } else { 10 }])
        });
        save_image(&image::DynamicImage::ImageLuma8(gray), &input).expect("write input");

        let out = dir.path().join("out");
        let args = CliArgs::parse_from([
            "pogotrack",
            input.to_str().expect("utf-8 path"),
            "--output-dir",
            out.to_str().expect("utf-8 path"),
            "--region",
            "0,0,15,15",
            "--threshold",
            "100",
            "--components",
        ]);
        run(&args, ViewerConfig::default()).expect("session");

        assert!(out.join("result.png").exists());
        assert!(out.join("mask.png").exists());
        assert!(out.join("scene.png").exists());
    }
}
