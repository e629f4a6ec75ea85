//! Single-frame rendering to a PNG file.

use std::path::Path;

use image::RgbImage;
use prism_camera::Camera;
use prism_core::Document;
use tracing::info;

use crate::device::{Device, Viewport};
use crate::errors::RenderError;
use crate::frame::{FrameRenderer, FrameStats};
use crate::resources::GpuResources;
use crate::settings::RenderSettings;

/// What to draw for an offline frame.
#[derive(Debug, Clone)]
pub struct OfflineFrame {
    pub viewport: Viewport,
    pub scene: Option<usize>,
    /// Falls back to a camera framing the scene bounds.
    pub camera: Option<Camera>,
    pub settings: RenderSettings,
}

/// Render one frame of `document` and return it as top-down RGB.
pub fn render_image(
    device: &mut dyn Device,
    document: &Document,
    frame: &OfflineFrame,
) -> Result<(RgbImage, FrameStats), RenderError> {
    let resources = GpuResources::build(device, document)?;
    let renderer = FrameRenderer::new(device, document, frame.scene);
    let camera = frame.camera.unwrap_or_else(|| renderer.default_camera());

    let stats = renderer.render(device, document, &resources, &camera, &frame.settings, frame.viewport)?;
    let image = device.read_pixels()?.into_top_down();

    let rgb: Vec<u8> = image
        .pixels
        .chunks_exact(4)
        .flat_map(|p| [p[0], p[1], p[2]])
        .collect();
    let rgb = RgbImage::from_raw(image.width, image.height, rgb).ok_or(RenderError::InvalidSize {
        width: image.width,
        height: image.height,
    })?;
    Ok((rgb, stats))
}

/// Render one frame and write it to `path` as an RGB PNG.
pub fn render_to_png(
    path: impl AsRef<Path>,
    device: &mut dyn Device,
    document: &Document,
    frame: &OfflineFrame,
) -> Result<FrameStats, RenderError> {
    let path = path.as_ref();
    let (image, stats) = render_image(device, document, frame)?;
    image.save_with_format(path, image::ImageFormat::Png)?;
    info!(
        path = %path.display(),
        width = image.width(),
        height = image.height(),
        draw_calls = stats.draw_calls,
        "wrote frame"
    );
    Ok(stats)
}
