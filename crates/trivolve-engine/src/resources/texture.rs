use std::path::Path;

use anyhow::{Context, Result};
use image::RgbaImage;

use crate::device::DeviceCtx;

/// A 2D GPU image with its default view.
pub struct GpuImage {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub width: u32,
    pub height: u32,
    pub format: wgpu::TextureFormat,
}

pub fn allocate_image(
    ctx: DeviceCtx<'_>,
    label: &str,
    width: u32,
    height: u32,
    usage: wgpu::TextureUsages,
    format: wgpu::TextureFormat,
) -> GpuImage {
    let texture = ctx.device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size: wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format,
        usage,
        view_formats: &[],
    });
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

    GpuImage {
        texture,
        view,
        width,
        height,
        format,
    }
}

/// Uploads an RGBA8 image into a new `Rgba8Unorm` texture.
///
/// `COPY_DST` is added to `usage`.
pub fn upload_rgba(
    ctx: DeviceCtx<'_>,
    label: &str,
    pixels: &RgbaImage,
    usage: wgpu::TextureUsages,
) -> GpuImage {
    let (width, height) = pixels.dimensions();
    let image = allocate_image(
        ctx,
        label,
        width,
        height,
        usage | wgpu::TextureUsages::COPY_DST,
        wgpu::TextureFormat::Rgba8Unorm,
    );

    ctx.queue.write_texture(
        wgpu::TexelCopyTextureInfo {
            texture: &image.texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        pixels.as_raw(),
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(4 * width),
            rows_per_image: Some(height),
        },
        wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
    );

    image
}

/// Decodes an image file, optionally resizes it, and uploads it as a
/// shader-readable texture.
pub fn load_image_from_file(
    ctx: DeviceCtx<'_>,
    path: &Path,
    resize_to: Option<(u32, u32)>,
) -> Result<GpuImage> {
    let decoded = image::open(path)
        .with_context(|| format!("failed to load image {}", path.display()))?
        .to_rgba8();

    let pixels = match resize_to {
        Some((w, h)) if decoded.dimensions() != (w, h) => {
            anyhow::ensure!(w > 0 && h > 0, "cannot resize image to {w}x{h}");
            log::debug!(
                "resizing {} from {:?} to {w}x{h}",
                path.display(),
                decoded.dimensions()
            );
            image::imageops::resize(&decoded, w, h, image::imageops::FilterType::Triangle)
        }
        _ => decoded,
    };

    let label = path.display().to_string();
    Ok(upload_rgba(
        ctx,
        &label,
        &pixels,
        wgpu::TextureUsages::TEXTURE_BINDING,
    ))
}
