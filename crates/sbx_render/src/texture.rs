//! GPU textures: decoded images, DDS surfaces and the checkerboard fallback.
//!
//! Colour textures are created with sRGB formats. Images are flipped so that
//! row 0 is the bottom, matching OBJ texture coordinates.

use image::imageops::FilterType;
use image::RgbaImage;
use sbx_core::dds::{DdsFormat, DdsImage};

pub struct Texture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: wgpu::Sampler,
    pub size: (u32, u32),
    pub mip_count: u32,
}

impl Texture {
    pub fn from_image_bytes(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        bytes: &[u8],
        label: &str,
    ) -> Result<Self, String> {
        let image = decode_flipped(bytes, label)?;
        Self::from_rgba_image(device, queue, &image, label)
    }

    pub fn from_rgba8(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        rgba: &[u8],
        width: u32,
        height: u32,
        label: &str,
    ) -> Result<Self, String> {
        let image = rgba_image(rgba, width, height, label)?;
        Self::from_rgba_image(device, queue, &image, label)
    }

    fn from_rgba_image(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        image: &RgbaImage,
        label: &str,
    ) -> Result<Self, String> {
        check_texture_size(
            image.width(),
            image.height(),
            device.limits().max_texture_dimension_2d,
        )
        .map_err(|e| format!("Texture '{label}': {e}"))?;
        let chain = build_mip_chain(image);
        let levels: Vec<(u32, u32, &[u8])> = chain
            .iter()
            .map(|m| (m.width(), m.height(), m.as_raw().as_slice()))
            .collect();
        Self::upload(device, queue, wgpu::TextureFormat::Rgba8UnormSrgb, &levels, label)
    }

    pub fn from_dds(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        dds: &DdsImage,
        supports_bc: bool,
        label: &str,
    ) -> Result<Self, String> {
        check_dds_uploadable(dds, supports_bc)
            .and_then(|()| {
                check_texture_size(
                    dds.width,
                    dds.height,
                    device.limits().max_texture_dimension_2d,
                )
            })
            .map_err(|e| format!("Texture '{label}': {e}"))?;
        let levels: Vec<(u32, u32, &[u8])> = dds
            .mips
            .iter()
            .map(|m| (m.width, m.height, m.data.as_slice()))
            .collect();
        Self::upload(
            device,
            queue,
            dds_texture_format(dds.format),
            &levels,
            label,
        )
    }

    /// Two-colour checkerboard of `cells x cells` squares, 8 pixels each.
    pub fn checkerboard(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        cells: u32,
        a: [u8; 4],
        b: [u8; 4],
    ) -> Result<Self, String> {
        let image = checkerboard_image(cells, a, b);
        Self::from_rgba8(
            device,
            queue,
            image.as_raw(),
            image.width(),
            image.height(),
            "Checkerboard Fallback",
        )
    }

    /// 1x1 white, bound for untextured geometry.
    pub fn white(device: &wgpu::Device, queue: &wgpu::Queue) -> Result<Self, String> {
        Self::from_rgba8(device, queue, &[255; 4], 1, 1, "White")
    }

    fn upload(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        format: wgpu::TextureFormat,
        levels: &[(u32, u32, &[u8])],
        label: &str,
    ) -> Result<Self, String> {
        let (width, height, _) = levels[0];

        // Anything the size checks missed (format features, memory) is
        // reported here instead of reaching the uncaptured-error handler.
        device.push_error_scope(wgpu::ErrorFilter::Validation);

        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: levels.len() as u32,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        for (level, &(w, h, data)) in levels.iter().enumerate() {
            let copy = copy_layout(format, w, h);
            queue.write_texture(
                wgpu::TexelCopyTextureInfo {
                    texture: &texture,
                    mip_level: level as u32,
                    origin: wgpu::Origin3d::ZERO,
                    aspect: wgpu::TextureAspect::All,
                },
                data,
                wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(copy.bytes_per_row),
                    rows_per_image: Some(copy.rows),
                },
                wgpu::Extent3d {
                    width: copy.extent.0,
                    height: copy.extent.1,
                    depth_or_array_layers: 1,
                },
            );
        }

        if let Some(err) = pollster::block_on(device.pop_error_scope()) {
            return Err(format!("Texture '{label}' rejected by device: {err}"));
        }

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some(label),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            address_mode_w: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Linear,
            anisotropy_clamp: 8,
            ..Default::default()
        });

        log::debug!(
            "Uploaded texture '{label}' {width}x{height} {format:?}, {} mips",
            levels.len()
        );

        Ok(Self {
            texture,
            view,
            sampler,
            size: (width, height),
            mip_count: levels.len() as u32,
        })
    }
}

/// Wrap tightly packed RGBA8 bytes, rejecting a length that does not match.
pub fn rgba_image(rgba: &[u8], width: u32, height: u32, label: &str) -> Result<RgbaImage, String> {
    RgbaImage::from_raw(width, height, rgba.to_vec()).ok_or_else(|| {
        format!(
            "Texture '{label}': {} bytes do not cover {width}x{height} RGBA",
            rgba.len()
        )
    })
}

pub fn check_texture_size(width: u32, height: u32, max_dimension: u32) -> Result<(), String> {
    if width == 0 || height == 0 {
        return Err(format!("size {width}x{height} is empty"));
    }
    if width > max_dimension || height > max_dimension {
        return Err(format!(
            "size {width}x{height} exceeds the device limit of {max_dimension}"
        ));
    }
    Ok(())
}

pub fn decode_flipped(bytes: &[u8], label: &str) -> Result<RgbaImage, String> {
    let mut image = image::load_from_memory(bytes)
        .map_err(|e| format!("Failed to decode image {label}: {e}"))?
        .to_rgba8();
    image::imageops::flip_vertical_in_place(&mut image);
    Ok(image)
}

pub fn mip_level_count(width: u32, height: u32) -> u32 {
    32 - width.max(height).max(1).leading_zeros()
}

/// Triangle-filtered chain from the full image down to 1x1.
pub fn build_mip_chain(base: &RgbaImage) -> Vec<RgbaImage> {
    let count = mip_level_count(base.width(), base.height());
    let mut chain = Vec::with_capacity(count as usize);
    chain.push(base.clone());
    for level in 1..count {
        let w = (base.width() >> level).max(1);
        let h = (base.height() >> level).max(1);
        let next = image::imageops::resize(&chain[level as usize - 1], w, h, FilterType::Triangle);
        chain.push(next);
    }
    chain
}

pub fn checkerboard_image(cells: u32, a: [u8; 4], b: [u8; 4]) -> RgbaImage {
    const CELL_PX: u32 = 8;
    let size = cells.max(1) * CELL_PX;
    RgbaImage::from_fn(size, size, |x, y| {
        if ((x / CELL_PX) + (y / CELL_PX)) % 2 == 0 {
            image::Rgba(a)
        } else {
            image::Rgba(b)
        }
    })
}

pub fn dds_texture_format(format: DdsFormat) -> wgpu::TextureFormat {
    match format {
        DdsFormat::Bc1 => wgpu::TextureFormat::Bc1RgbaUnormSrgb,
        DdsFormat::Bc2 => wgpu::TextureFormat::Bc2RgbaUnormSrgb,
        DdsFormat::Bc3 => wgpu::TextureFormat::Bc3RgbaUnormSrgb,
        DdsFormat::Rgba8 => wgpu::TextureFormat::Rgba8UnormSrgb,
        DdsFormat::Bgra8 => wgpu::TextureFormat::Bgra8UnormSrgb,
    }
}

/// Reject DDS images the device cannot take as-is.
pub fn check_dds_uploadable(dds: &DdsImage, supports_bc: bool) -> Result<(), String> {
    if dds.format.is_block_compressed() {
        if !supports_bc {
            return Err(format!(
                "{:?} needs BC texture compression, which this adapter lacks",
                dds.format
            ));
        }
        if dds.width % 4 != 0 || dds.height % 4 != 0 {
            return Err(format!(
                "block-compressed size {}x{} is not a multiple of 4",
                dds.width, dds.height
            ));
        }
    }
    let max_mips = mip_level_count(dds.width, dds.height) as usize;
    if dds.mips.len() > max_mips {
        return Err(format!(
            "{} mips exceed the {max_mips} possible for {}x{}",
            dds.mips.len(),
            dds.width,
            dds.height
        ));
    }
    Ok(())
}

#[derive(Debug, PartialEq, Eq)]
struct CopyLayout {
    bytes_per_row: u32,
    rows: u32,
    extent: (u32, u32),
}

/// Block formats copy whole 4x4 blocks, so small mips use the padded size.
fn copy_layout(format: wgpu::TextureFormat, width: u32, height: u32) -> CopyLayout {
    let (bw, bh) = format.block_dimensions();
    let block_bytes = format.block_copy_size(None).unwrap_or(4);
    let blocks_x = width.div_ceil(bw);
    let blocks_y = height.div_ceil(bh);
    CopyLayout {
        bytes_per_row: blocks_x * block_bytes,
        rows: blocks_y,
        extent: (blocks_x * bw, blocks_y * bh),
    }
}
