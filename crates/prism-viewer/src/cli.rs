//! Command-line arguments.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use prism_camera::Camera;
use prism_render::RenderSettings;

#[derive(Parser, Debug)]
#[command(name = "prism")]
#[command(about = "View glTF 2.0 scenes, interactively or as a single PNG frame")]
#[command(version)]
pub struct Cli {
    /// Path to a .gltf or .glb file
    pub path: PathBuf,

    /// Initial camera as eye,center,up: nine comma-separated numbers
    #[arg(long, value_name = "EX,EY,EZ,CX,CY,CZ,UX,UY,UZ", allow_hyphen_values = true)]
    pub lookat: Option<Camera>,

    /// Window or image width in pixels
    #[arg(long, default_value_t = 1280, value_parser = clap::value_parser!(u32).range(1..))]
    pub width: u32,

    /// Window or image height in pixels
    #[arg(long, default_value_t = 720, value_parser = clap::value_parser!(u32).range(1..))]
    pub height: u32,

    /// Render one frame to this PNG file instead of opening a window
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Scene index to draw instead of the document's default scene
    #[arg(long)]
    pub scene: Option<usize>,

    /// Render offline frames on the CPU
    #[arg(long, requires = "output")]
    pub software: bool,

    /// JSON file with lighting and shading settings
    #[arg(long, value_name = "FILE")]
    pub settings: Option<PathBuf>,
}

impl Cli {
    /// Render settings from `--settings`, or the defaults.
    pub fn render_settings(&self) -> Result<RenderSettings> {
        let Some(path) = &self.settings else {
            return Ok(RenderSettings::default());
        };
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings from {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("Invalid settings in {}", path.display()))
    }
}
