use board_scanner::config;
use board_scanner::image::io::{load_rgb_image, save_rgb_image, write_json_file};
use board_scanner::scanner::{render_overlay, BoardScanner};
use log::info;
use std::env;

fn main() {
    // Structured result on stdout, everything else on stderr.
    env_logger::Builder::from_default_env()
        .target(env_logger::Target::Stderr)
        .init();
    if let Err(err) = run() {
        match serde_json::to_string(&serde_json::json!({ "error": err })) {
            Ok(json) => println!("{json}"),
            Err(_) => eprintln!("Error: {err}"),
        }
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let mut args = env::args();
    let program = args.next().unwrap_or_else(|| "board_scanner".to_string());
    let opts = config::parse_args(&program, args)?;

    let image = load_rgb_image(&opts.input_path)?;
    let scanner = BoardScanner::new(opts.config.scan_params.clone());
    let (report, artifacts) = scanner.process_with_artifacts(&image);
    info!(
        "scan finished in {:.1} ms ({} blobs, fallback: {})",
        report.trace.timings.total_ms, report.trace.regions.blob_count, artifacts.fallback
    );

    if let Some(path) = &opts.config.output.debug_image {
        let overlay = render_overlay(&image, &artifacts);
        save_rgb_image(&overlay, path)?;
        info!("debug overlay written to {}", path.display());
    }
    if let Some(path) = &opts.config.output.json_out {
        write_json_file(path, &report)?;
        info!("full report written to {}", path.display());
    }

    let json = serde_json::to_string(&report.output)
        .map_err(|e| format!("Failed to serialize output: {e}"))?;
    println!("{json}");
    Ok(())
}
