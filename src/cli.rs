use crate::config::load_config;
use crate::render::{render_svg, write_output_svg};
use crate::route_dump::write_route_dump;
use crate::router::GridRouter;
use crate::scene::parse_scene;
use anyhow::Result;
use clap::{Parser, ValueEnum};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "gridr", version, about = "Orthogonal edge router for nested diagram nodes")]
pub struct Args {
    /// Input scene file (.json) or '-' for stdin
    #[arg(short = 'i', long = "input")]
    pub input: Option<PathBuf>,

    /// Output file. Defaults to stdout for SVG and JSON if omitted.
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Output format
    #[arg(short = 'e', long = "outputFormat", value_enum, default_value = "svg")]
    pub output_format: OutputFormat,

    /// Config file (JSON5)
    #[arg(short = 'c', long = "configFile")]
    pub config: Option<PathBuf>,

    /// Minimum gap between parallel routes (overrides the config)
    #[arg(short = 'g', long = "gap")]
    pub gap: Option<f32>,

    /// Log routing details to stderr
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Svg,
    Png,
    Json,
}

pub fn run() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let mut config = load_config(args.config.as_deref())?;
    if let Some(gap) = args.gap {
        config.router.nudge_gap = gap;
    }

    let input = read_input(args.input.as_deref())?;
    let scene = parse_scene(&input)?;
    let router = GridRouter::from_scene(&scene, &config.router)?;
    let edges = scene.resolve_edges()?;
    let routes = router.route_edges(&edges, config.router.nudge_gap, |e| e.0, |e| e.1)?;
    info!(
        nodes = scene.nodes.len(),
        edges = edges.len(),
        "routing finished"
    );

    match args.output_format {
        OutputFormat::Svg => {
            let svg = render_svg(&scene, &router, &routes, &config.theme, &config.render);
            write_output_svg(&svg, args.output.as_deref())?;
        }
        OutputFormat::Png => {
            let output = ensure_output(&args.output, "png")?;
            let svg = render_svg(&scene, &router, &routes, &config.theme, &config.render);
            write_png(&svg, &output, &config.render)?;
        }
        OutputFormat::Json => {
            write_route_dump(args.output.as_deref(), &scene, &router, &edges, &routes)?;
        }
    }
    Ok(())
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    // a subscriber may already be installed when embedded
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

#[cfg(feature = "png")]
fn write_png(svg: &str, output: &Path, render: &crate::config::RenderConfig) -> Result<()> {
    crate::render::write_output_png(svg, output, render)
}

#[cfg(not(feature = "png"))]
fn write_png(_svg: &str, _output: &Path, _render: &crate::config::RenderConfig) -> Result<()> {
    Err(anyhow::anyhow!("PNG output requires the `png` feature"))
}

fn read_input(path: Option<&Path>) -> Result<String> {
    if let Some(path) = path
        && path != Path::new("-")
    {
        return Ok(std::fs::read_to_string(path)?);
    }
    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf)?;
    Ok(buf)
}

fn ensure_output(output: &Option<PathBuf>, ext: &str) -> Result<PathBuf> {
    if let Some(path) = output {
        return Ok(path.clone());
    }
    Err(anyhow::anyhow!("Output path required for {} output", ext))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_short_flags() {
        let args = Args::try_parse_from([
            "gridr", "-i", "scene.json", "-e", "json", "-g", "6", "-v",
        ])
        .unwrap();
        assert_eq!(args.input, Some(PathBuf::from("scene.json")));
        assert_eq!(args.output_format, OutputFormat::Json);
        assert_eq!(args.gap, Some(6.0));
        assert!(args.verbose);
    }

    #[test]
    fn defaults_to_svg() {
        let args = Args::try_parse_from(["gridr", "--configFile", "cfg.json5"]).unwrap();
        assert_eq!(args.output_format, OutputFormat::Svg);
        assert_eq!(args.config, Some(PathBuf::from("cfg.json5")));
        assert_eq!(args.gap, None);
        assert!(!args.verbose);
    }

    #[test]
    fn png_needs_an_output_path() {
        assert!(ensure_output(&None, "png").is_err());
        let path = PathBuf::from("out.png");
        assert_eq!(ensure_output(&Some(path.clone()), "png").unwrap(), path);
    }
}
