use std::path::{Path, PathBuf};

use image::imageops::FilterType;
use image::{Rgba, RgbaImage};
use tracing::{debug, warn};

use crate::error::LoadError;

/// How the texel bytes are to be interpreted when sampled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorSpace {
    Linear,
    /// Stored gamma-encoded; the sampler returns linear values.
    Srgb,
}

impl ColorSpace {
    pub fn format(self) -> wgpu::TextureFormat {
        match self {
            ColorSpace::Linear => wgpu::TextureFormat::Rgba8Unorm,
            ColorSpace::Srgb => wgpu::TextureFormat::Rgba8UnormSrgb,
        }
    }
}

pub struct Texture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: wgpu::Sampler,
}

/// Read and decode an image file into RGBA8.
pub fn decode_image(path: &Path) -> Result<RgbaImage, LoadError> {
    let image = image::open(path).map_err(|source| match source {
        image::ImageError::IoError(source) => LoadError::Io {
            path: path.to_path_buf(),
            source,
        },
        source => LoadError::Image {
            path: path.to_path_buf(),
            source,
        },
    })?;
    Ok(image.to_rgba8())
}

/// Levels down to 1x1, counting the base level.
pub fn mip_level_count(width: u32, height: u32) -> u32 {
    32 - width.max(height).max(1).leading_zeros()
}

/// Base image followed by successively halved copies.
pub fn mip_chain(base: &RgbaImage) -> Vec<RgbaImage> {
    let levels = mip_level_count(base.width(), base.height());
    let mut chain = Vec::with_capacity(levels as usize);
    chain.push(base.clone());
    for _ in 1..levels {
        let Some(prev) = chain.last() else { break };
        let width = (prev.width() / 2).max(1);
        let height = (prev.height() / 2).max(1);
        let next = image::imageops::resize(prev, width, height, FilterType::Triangle);
        chain.push(next);
    }
    chain
}

/// Magenta and black squares, the usual "missing texture" look.
pub fn checkerboard(size: u32, cell: u32) -> RgbaImage {
    let cell = cell.max(1);
    RgbaImage::from_fn(size, size, |x, y| {
        if ((x / cell) + (y / cell)) % 2 == 0 {
            Rgba([255, 0, 255, 255])
        } else {
            Rgba([0, 0, 0, 255])
        }
    })
}

fn write_level(queue: &wgpu::Queue, texture: &wgpu::Texture, image: &RgbaImage, mip_level: u32, layer: u32) {
    queue.write_texture(
        wgpu::TexelCopyTextureInfo {
            texture,
            mip_level,
            origin: wgpu::Origin3d { x: 0, y: 0, z: layer },
            aspect: wgpu::TextureAspect::All,
        },
        image.as_raw(),
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(4 * image.width()),
            rows_per_image: Some(image.height()),
        },
        wgpu::Extent3d {
            width: image.width(),
            height: image.height(),
            depth_or_array_layers: 1,
        },
    );
}

impl Texture {
    /// Upload `image` with a full mip chain, repeat addressing and
    /// trilinear filtering.
    pub fn from_image(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        image: &RgbaImage,
        space: ColorSpace,
        label: &str,
    ) -> Self {
        let chain = mip_chain(image);
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width: image.width(),
                height: image.height(),
                depth_or_array_layers: 1,
            },
            mip_level_count: chain.len() as u32,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: space.format(),
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        for (level, mip) in chain.iter().enumerate() {
            write_level(queue, &texture, mip, level as u32, 0);
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
            ..Default::default()
        });

        Self { texture, view, sampler }
    }

    /// Six equally sized square faces as one cube texture.
    pub fn cubemap(device: &wgpu::Device, queue: &wgpu::Queue, faces: &[RgbaImage], label: &str) -> Self {
        let size = faces.first().map(|f| f.width()).unwrap_or(1);
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width: size,
                height: size,
                depth_or_array_layers: 6,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: ColorSpace::Linear.format(),
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        for (layer, face) in faces.iter().enumerate() {
            write_level(queue, &texture, face, 0, layer as u32);
        }

        let view = texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some(label),
            dimension: Some(wgpu::TextureViewDimension::Cube),
            ..Default::default()
        });
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some(label),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        Self { texture, view, sampler }
    }

    pub fn placeholder(device: &wgpu::Device, queue: &wgpu::Queue, space: ColorSpace) -> Self {
        Self::from_image(device, queue, &checkerboard(64, 8), space, "placeholder")
    }

    pub fn placeholder_cubemap(device: &wgpu::Device, queue: &wgpu::Queue) -> Self {
        let face = checkerboard(64, 8);
        let faces: Vec<RgbaImage> = std::iter::repeat(face).take(6).collect();
        Self::cubemap(device, queue, &faces, "placeholder_cubemap")
    }
}

pub fn load_texture(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    path: &Path,
    space: ColorSpace,
) -> Result<Texture, LoadError> {
    let image = decode_image(path)?;
    debug!(path = %path.display(), width = image.width(), height = image.height(), ?space, "texture loaded");
    Ok(Texture::from_image(device, queue, &image, space, &path.display().to_string()))
}

/// Like [`load_texture`], but a failed load is logged and replaced by the
/// checkerboard.
pub fn load_texture_or_placeholder(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    path: &Path,
    space: ColorSpace,
) -> Texture {
    load_texture(device, queue, path, space).unwrap_or_else(|err| {
        warn!("{err}; using placeholder texture");
        Texture::placeholder(device, queue, space)
    })
}

/// Decode six faces and check they form a cube: all square, all one size.
/// Returns the face edge length.
pub fn decode_faces(paths: &[PathBuf]) -> Result<(Vec<RgbaImage>, u32), LoadError> {
    if paths.len() != 6 {
        return Err(LoadError::FaceCount(paths.len()));
    }
    let mut faces = Vec::with_capacity(6);
    let mut expected = None;
    for path in paths {
        let face = decode_image(path)?;
        let edge = *expected.get_or_insert(face.width());
        check_face(path, &face, edge)?;
        faces.push(face);
    }
    Ok((faces, expected.unwrap_or(0)))
}

fn check_face(path: &Path, face: &RgbaImage, expected: u32) -> Result<(), LoadError> {
    if face.width() != expected || face.height() != expected {
        return Err(LoadError::FaceSize {
            path: path.to_path_buf(),
            width: face.width(),
            height: face.height(),
            expected,
        });
    }
    Ok(())
}

/// Faces in +X, -X, +Y, -Y, +Z, -Z order.
pub fn load_cubemap(device: &wgpu::Device, queue: &wgpu::Queue, paths: &[PathBuf]) -> Result<Texture, LoadError> {
    let (faces, edge) = decode_faces(paths)?;
    debug!(edge, "cubemap loaded");
    Ok(Texture::cubemap(device, queue, &faces, "cubemap"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mip_count_reaches_one_pixel() {
        assert_eq!(mip_level_count(1, 1), 1);
        assert_eq!(mip_level_count(2, 2), 2);
        assert_eq!(mip_level_count(512, 512), 10);
        assert_eq!(mip_level_count(640, 10), 10);
        assert_eq!(mip_level_count(0, 0), 1);
    }

    #[test]
    fn mip_chain_halves_each_level() {
        let chain = mip_chain(&checkerboard(16, 4));
        let sizes: Vec<(u32, u32)> = chain.iter().map(|m| m.dimensions()).collect();
        assert_eq!(sizes, vec![(16, 16), (8, 8), (4, 4), (2, 2), (1, 1)]);

        let tall = mip_chain(&RgbaImage::new(4, 1));
        let sizes: Vec<(u32, u32)> = tall.iter().map(|m| m.dimensions()).collect();
        assert_eq!(sizes, vec![(4, 1), (2, 1), (1, 1)]);
    }

    #[test]
    fn checkerboard_alternates_cells() {
        let board = checkerboard(16, 8);
        assert_eq!(board.get_pixel(0, 0), &Rgba([255, 0, 255, 255]));
        assert_eq!(board.get_pixel(8, 0), &Rgba([0, 0, 0, 255]));
        assert_eq!(board.get_pixel(8, 8), &Rgba([255, 0, 255, 255]));
    }

    #[test]
    fn color_space_picks_the_texture_format() {
        assert_eq!(ColorSpace::Linear.format(), wgpu::TextureFormat::Rgba8Unorm);
        assert_eq!(ColorSpace::Srgb.format(), wgpu::TextureFormat::Rgba8UnormSrgb);
    }

    #[test]
    fn cubemap_needs_six_faces() {
        let paths = vec![PathBuf::from("right.jpg"); 5];
        assert!(matches!(decode_faces(&paths), Err(LoadError::FaceCount(5))));
    }

    #[test]
    fn missing_face_reports_its_path() {
        let paths: Vec<PathBuf> = ["right", "left", "top", "bottom", "front", "back"]
            .iter()
            .map(|name| PathBuf::from(format!("no/such/skybox/{name}.jpg")))
            .collect();
        let err = decode_faces(&paths).err().map(|e| e.path().map(Path::to_path_buf));
        assert_eq!(err, Some(Some(PathBuf::from("no/such/skybox/right.jpg"))));
    }

    #[test]
    fn non_square_face_is_rejected() {
        let err = check_face(Path::new("top.jpg"), &RgbaImage::new(32, 16), 32).unwrap_err();
        assert!(matches!(err, LoadError::FaceSize { width: 32, height: 16, expected: 32, .. }));
        assert!(check_face(Path::new("top.jpg"), &RgbaImage::new(32, 32), 32).is_ok());
    }
}
