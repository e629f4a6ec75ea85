//! Prism: a glTF 2.0 viewer.
//!
//! Opens a window with an orbit or fly camera, or renders a single frame to
//! PNG when `--output` is given.

mod app;
mod cli;
mod input;
mod overlay;

use anyhow::{bail, Context, Result};
use clap::Parser;
use prism_render::{render_to_png, Device, OfflineFrame, SoftwareDevice, Viewport, WgpuDevice};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::app::{Viewer, ViewerOptions};
use crate::cli::Cli;

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let settings = cli.render_settings()?;
    let loaded = prism_io::load(&cli.path).with_context(|| format!("Failed to load {}", cli.path.display()))?;
    let document = loaded.document;

    if let Some(index) = cli.scene {
        if index >= document.scenes.len() {
            bail!(
                "Scene {} does not exist; {} has {} scene(s)",
                index,
                cli.path.display(),
                document.scenes.len()
            );
        }
    }

    match &cli.output {
        Some(output) => {
            let frame = OfflineFrame {
                viewport: Viewport::new(cli.width, cli.height),
                scene: cli.scene,
                camera: cli.lookat,
                settings,
            };
            let mut device = offline_device(cli.software);
            let stats = render_to_png(output, device.as_mut(), &document, &frame)
                .with_context(|| format!("Failed to render {}", output.display()))?;
            info!(nodes = stats.nodes, draw_calls = stats.draw_calls, "done");
            Ok(())
        }
        None => Viewer::new(
            document,
            ViewerOptions {
                width: cli.width,
                height: cli.height,
                scene: cli.scene,
                camera: cli.lookat,
                settings,
            },
        )
        .run(),
    }
}

/// GPU device for offline frames, or the CPU rasterizer when asked for or
/// when no adapter is available.
fn offline_device(software: bool) -> Box<dyn Device> {
    if software {
        return Box::new(SoftwareDevice::new());
    }
    match WgpuDevice::headless() {
        Ok(device) => Box::new(device),
        Err(e) => {
            warn!("{}; falling back to software rendering", e);
            Box::new(SoftwareDevice::new())
        }
    }
}
