use std::path::PathBuf;

use thiserror::Error;

/// Failure to turn a file on disk into something the GPU can use.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode image {path}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("failed to import model {path}: {source}")]
    Model {
        path: PathBuf,
        #[source]
        source: gltf::Error,
    },
    #[error("model {path} has no triangle primitives with positions")]
    EmptyModel { path: PathBuf },
    #[error("cubemap needs 6 faces, got {0}")]
    FaceCount(usize),
    #[error("cubemap face {path} is {width}x{height}, expected a {expected}x{expected} square")]
    FaceSize {
        path: PathBuf,
        width: u32,
        height: u32,
        expected: u32,
    },
    #[error("unsupported pixel layout {format} in {path}")]
    PixelFormat { path: PathBuf, format: String },
}

impl LoadError {
    pub fn path(&self) -> Option<&std::path::Path> {
        match self {
            LoadError::Io { path, .. }
            | LoadError::Image { path, .. }
            | LoadError::Model { path, .. }
            | LoadError::EmptyModel { path }
            | LoadError::FaceSize { path, .. }
            | LoadError::PixelFormat { path, .. } => Some(path),
            LoadError::FaceCount(_) => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum DemoError {
    #[error("failed to create event loop: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),
    #[error("failed to create window: {0}")]
    Window(#[from] winit::error::OsError),
    #[error("window closed before it was shown (exit code {0})")]
    WindowClosed(i32),
    #[error("failed to create surface: {0}")]
    Surface(#[from] wgpu::CreateSurfaceError),
    #[error("no suitable GPU adapter: {0}")]
    Adapter(#[from] wgpu::RequestAdapterError),
    #[error("failed to open GPU device: {0}")]
    Device(#[from] wgpu::RequestDeviceError),
    #[error("surface has no supported texture format")]
    NoSurfaceFormat,
    #[error("failed to acquire frame: {0}")]
    Frame(#[from] wgpu::SurfaceError),
    #[error("failed to read config {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error(transparent)]
    Load(#[from] LoadError),
}

impl DemoError {
    /// Errors raised while bringing up the window or graphics device,
    /// before any scene resources exist.
    pub fn is_init_failure(&self) -> bool {
        matches!(
            self,
            DemoError::EventLoop(_)
                | DemoError::Window(_)
                | DemoError::WindowClosed(_)
                | DemoError::Surface(_)
                | DemoError::Adapter(_)
                | DemoError::Device(_)
                | DemoError::NoSurfaceFormat
        )
    }
}
