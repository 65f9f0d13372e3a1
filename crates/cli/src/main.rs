mod edit_script;

use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

use clap::Parser;

use maskflow_core::editor::infrastructure::raster_surface::RasterSurface;
use maskflow_core::pipeline::pipeline_controller::PipelineController;
use maskflow_core::pipeline::pipeline_logger::ConsolePipelineLogger;
use maskflow_core::remote::domain::video_service::{video_mime_type, VideoUpload};
use maskflow_core::remote::infrastructure::http_video_service::HttpVideoService;
use maskflow_core::shared::constants::{BLUR_STRENGTH_MAX, BLUR_STRENGTH_MIN};
use maskflow_core::shared::settings::ClientSettings;

use edit_script::EditAction;

/// Face blurring through a remote detection and blur service.
///
/// Uploads the video, waits for face detection, applies optional scripted
/// edits to the detected regions, then blurs and downloads the result.
#[derive(Parser)]
#[command(name = "maskflow")]
struct Cli {
    /// Input video file.
    input: PathBuf,

    /// Where to write the blurred video.
    output: PathBuf,

    /// Service base URL (overrides the settings file).
    #[arg(long)]
    server: Option<String>,

    /// Blur strength, 1-50 (overrides the settings file).
    #[arg(long)]
    blur_strength: Option<u32>,

    /// Status poll interval in milliseconds (overrides the settings file).
    #[arg(long)]
    poll_interval_ms: Option<u64>,

    /// JSON file of region edits to apply before processing.
    #[arg(long)]
    edits: Option<PathBuf>,

    /// Save a PNG of the editor canvas after each edit into this directory.
    #[arg(long)]
    render_dir: Option<PathBuf>,

    /// Blur the detected faces as they are, without editing.
    #[arg(long, conflicts_with = "edits")]
    skip_editing: bool,

    /// Settings file to use instead of the one in the user config directory.
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    validate(&cli)?;
    let settings = resolve_settings(&cli)?;
    check_blur_strength(settings.blur_strength)?;
    let edits = match &cli.edits {
        Some(path) => edit_script::load(path)?,
        None => Vec::new(),
    };

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(run_pipeline(&cli, settings, &edits))
}

async fn run_pipeline(
    cli: &Cli,
    settings: ClientSettings,
    edits: &[EditAction],
) -> Result<(), Box<dyn std::error::Error>> {
    let filename = cli
        .input
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or("Input path has no usable file name")?
        .to_string();
    let bytes = tokio::fs::read(&cli.input).await?;

    log::info!("Using service at {}", settings.server_url);
    let service = Arc::new(HttpVideoService::new(settings.server_url.clone()));
    let blur_strength = settings.blur_strength;
    let (display_width, display_height) = (settings.display_width, settings.display_height);
    let mut controller = PipelineController::new(
        service,
        settings,
        Box::new(ConsolePipelineLogger::default()),
    );

    let session = controller.upload(VideoUpload::new(filename, bytes)).await?;
    log::info!("Uploaded as session {}", session.id);

    let summary = controller.analyze().await?;
    eprintln!(
        "Detected {} faces on {} of {} frames",
        summary.total_faces, summary.frames_with_faces, summary.total_frames
    );

    if cli.skip_editing {
        log::info!("Skipping editing");
    } else if !edits.is_empty() || cli.render_dir.is_some() {
        let mut surface = RasterSurface::new(display_width, display_height);
        let editor = controller.editor()?;
        edit_script::apply(editor, &mut surface, edits, cli.render_dir.as_deref()).await?;
        if edits.is_empty() {
            if let Some(dir) = &cli.render_dir {
                surface.save_png(&dir.join("frame_00000.png"))?;
            }
        }
    }
    controller.finish_editing()?;

    let reference = controller.process(blur_strength).await?;
    log::info!("Result available at {}", reference.url);
    let video = controller.download().await?;
    tokio::fs::write(&cli.output, &video).await?;
    eprintln!(
        "Wrote {} ({} bytes) to {}",
        reference.filename,
        video.len(),
        cli.output.display()
    );

    controller.log_summary();
    Ok(())
}

fn resolve_settings(cli: &Cli) -> Result<ClientSettings, Box<dyn std::error::Error>> {
    let mut settings = match &cli.config {
        Some(path) => ClientSettings::load_from(path)
            .map_err(|e| format!("Cannot load settings from {}: {e}", path.display()))?,
        None => ClientSettings::load(),
    };
    if let Some(server) = &cli.server {
        settings.server_url = server.clone();
    }
    if let Some(strength) = cli.blur_strength {
        settings.blur_strength = strength;
    }
    if let Some(ms) = cli.poll_interval_ms {
        settings.poll_interval_ms = ms;
    }
    Ok(settings)
}

fn validate(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    if !cli.input.exists() {
        return Err(format!("Input file not found: {}", cli.input.display()).into());
    }
    if !is_video(&cli.input) {
        return Err(format!(
            "Input must be a video file (mp4, mov, avi, mkv, webm, ...), got {}",
            cli.input.display()
        )
        .into());
    }
    if let Some(path) = &cli.edits {
        if !path.exists() {
            return Err(format!("Edit script not found: {}", path.display()).into());
        }
    }
    if let Some(dir) = &cli.render_dir {
        if !dir.is_dir() {
            return Err(format!("Render directory does not exist: {}", dir.display()).into());
        }
    }
    if cli.poll_interval_ms == Some(0) {
        return Err("Poll interval must be greater than zero".into());
    }
    Ok(())
}

/// Catches a bad strength from either the flag or the settings file before
/// the video is uploaded and analysed.
fn check_blur_strength(strength: u32) -> Result<(), Box<dyn std::error::Error>> {
    if !(BLUR_STRENGTH_MIN..=BLUR_STRENGTH_MAX).contains(&strength) {
        return Err(format!(
            "Blur strength must be between {BLUR_STRENGTH_MIN} and {BLUR_STRENGTH_MAX}, got {strength}"
        )
        .into());
    }
    Ok(())
}

fn is_video(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .and_then(video_mime_type)
        .is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("maskflow").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_flags_override_settings_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("settings.json");
        ClientSettings {
            server_url: "http://from-file:8000".to_string(),
            blur_strength: 5,
            ..ClientSettings::default()
        }
        .save_to(&config)
        .unwrap();

        let parsed = cli(&[
            "in.mp4",
            "out.mp4",
            "--config",
            config.to_str().unwrap(),
            "--blur-strength",
            "30",
        ]);
        let settings = resolve_settings(&parsed).unwrap();

        assert_eq!(settings.server_url, "http://from-file:8000");
        assert_eq!(settings.blur_strength, 30);
    }

    #[test]
    fn test_missing_config_file_is_an_error() {
        let parsed = cli(&["in.mp4", "out.mp4", "--config", "/nonexistent/settings.json"]);
        assert!(resolve_settings(&parsed).is_err());
    }

    #[test]
    fn test_validate_rejects_non_video_input() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("notes.txt");
        std::fs::write(&input, b"hello").unwrap();

        let parsed = cli(&[input.to_str().unwrap(), "out.mp4"]);
        let err = validate(&parsed).unwrap_err().to_string();

        assert!(err.starts_with("Input must be a video file"));
    }

    #[test]
    fn test_blur_strength_out_of_range_is_rejected() {
        assert!(check_blur_strength(BLUR_STRENGTH_MIN).is_ok());
        assert!(check_blur_strength(BLUR_STRENGTH_MAX).is_ok());
        assert!(check_blur_strength(0).is_err());

        let err = check_blur_strength(80).unwrap_err().to_string();
        assert!(err.starts_with("Blur strength must be between"));
    }

    #[test]
    fn test_out_of_range_strength_from_settings_file_is_caught() {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("settings.json");
        std::fs::write(&config, r#"{"blur_strength": 80}"#).unwrap();

        let parsed = cli(&["in.mp4", "out.mp4", "--config", config.to_str().unwrap()]);
        let settings = resolve_settings(&parsed).unwrap();

        assert!(check_blur_strength(settings.blur_strength).is_err());
    }

    #[test]
    fn test_skip_editing_conflicts_with_edits() {
        let result = Cli::try_parse_from([
            "maskflow",
            "in.mp4",
            "out.mp4",
            "--skip-editing",
            "--edits",
            "e.json",
        ]);
        assert!(result.is_err());
    }
}
