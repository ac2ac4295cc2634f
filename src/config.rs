//! Runtime configuration of the CLI.
//!
//! All scan parameters can come from a JSON config file; the handful of
//! flags people actually reach for (`--shape`, `--json-out`,
//! `--debug-image`) override it on the command line.
use crate::scanner::ScanParams;
use crate::types::GridShape;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Write the full scan report (output + trace) here.
    pub json_out: Option<PathBuf>,
    /// Write the annotated overlay image here.
    pub debug_image: Option<PathBuf>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub scan_params: ScanParams,
    pub output: OutputConfig,
}

pub fn load_config(path: &Path) -> Result<RuntimeConfig, String> {
    let contents = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config {}: {e}", path.display()))?;
    let config: RuntimeConfig = serde_json::from_str(&contents)
        .map_err(|e| format!("Failed to parse config {}: {e}", path.display()))?;
    Ok(config)
}

/// Parsed command line: the input image plus the effective configuration.
#[derive(Clone, Debug)]
pub struct CliOptions {
    pub input_path: PathBuf,
    pub config: RuntimeConfig,
}

pub fn usage(program: &str) -> String {
    format!(
        "Usage: {program} <image> [--config <json>] [--shape <FLOORSxUNITS>] \
         [--json-out <path>] [--debug-image <path>]"
    )
}

/// Parse `FLOORSxUNITS`, e.g. `25x10`.
fn parse_shape(value: &str) -> Result<GridShape, String> {
    let (floors, units) = value
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("Invalid shape '{value}', expected FLOORSxUNITS"))?;
    let floors: usize = floors
        .trim()
        .parse()
        .map_err(|e| format!("Invalid floor count in '{value}': {e}"))?;
    let units: usize = units
        .trim()
        .parse()
        .map_err(|e| format!("Invalid unit count in '{value}': {e}"))?;
    if floors == 0 || units == 0 {
        return Err(format!("Shape '{value}' must be at least 1x1"));
    }
    Ok(GridShape { floors, units })
}

/// Parse the argument list (without the program name).
pub fn parse_args<I>(program: &str, args: I) -> Result<CliOptions, String>
where
    I: IntoIterator<Item = String>,
{
    let mut input_path: Option<PathBuf> = None;
    let mut config = RuntimeConfig::default();
    let mut shape: Option<GridShape> = None;
    let mut json_out: Option<PathBuf> = None;
    let mut debug_image: Option<PathBuf> = None;

    let mut it = args.into_iter();
    while let Some(arg) = it.next() {
        let mut value_for = |flag: &str| {
            it.next()
                .ok_or_else(|| format!("Missing value for {flag}\n{}", usage(program)))
        };
        match arg.as_str() {
            "--config" => {
                let path = PathBuf::from(value_for("--config")?);
                config = load_config(&path)?;
            }
            "--shape" => shape = Some(parse_shape(&value_for("--shape")?)?),
            "--json-out" => json_out = Some(PathBuf::from(value_for("--json-out")?)),
            "--debug-image" => debug_image = Some(PathBuf::from(value_for("--debug-image")?)),
            "--help" | "-h" => return Err(usage(program)),
            flag if flag.starts_with("--") => {
                return Err(format!("Unknown flag {flag}\n{}", usage(program)));
            }
            _ if input_path.is_none() => input_path = Some(PathBuf::from(arg)),
            _ => return Err(format!("Unexpected argument {arg}\n{}", usage(program))),
        }
    }

    if let Some(shape) = shape {
        config.scan_params.shape = shape;
    }
    if json_out.is_some() {
        config.output.json_out = json_out;
    }
    if debug_image.is_some() {
        config.output.debug_image = debug_image;
    }
    let input_path = input_path.ok_or_else(|| format!("Missing image path\n{}", usage(program)))?;
    Ok(CliOptions { input_path, config })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<CliOptions, String> {
        parse_args("board_scanner", args.iter().map(|s| s.to_string()))
    }

    #[test]
    fn positional_image_and_flags() {
        let opts = parse(&[
            "board.png",
            "--shape",
            "20x8",
            "--json-out",
            "report.json",
        ])
        .expect("parse");
        assert_eq!(opts.input_path, PathBuf::from("board.png"));
        assert_eq!(
            opts.config.scan_params.shape,
            GridShape { floors: 20, units: 8 }
        );
        assert_eq!(
            opts.config.output.json_out,
            Some(PathBuf::from("report.json"))
        );
    }

    #[test]
    fn missing_image_is_rejected() {
        assert!(parse(&["--shape", "25x10"]).is_err());
    }

    #[test]
    fn shape_format_is_validated() {
        assert!(parse_shape("25x10").is_ok());
        assert!(parse_shape("25X10").is_ok());
        assert!(parse_shape("25").is_err());
        assert!(parse_shape("0x10").is_err());
        assert!(parse_shape("25xten").is_err());
    }

    #[test]
    fn unknown_flags_are_rejected() {
        assert!(parse(&["board.png", "--frobnicate"]).is_err());
    }

    #[test]
    fn config_json_round_trips_defaults() {
        let config: RuntimeConfig = serde_json::from_str("{}").expect("empty config");
        assert_eq!(config.scan_params.shape, GridShape::default());
        let config: RuntimeConfig = serde_json::from_str(
            r#"{"scan_params": {"shape": {"floors": 12, "units": 6}, "sample_margin": 2}}"#,
        )
        .expect("partial config");
        assert_eq!(config.scan_params.shape, GridShape { floors: 12, units: 6 });
        assert_eq!(config.scan_params.sample_margin, 2);
    }
}
