use std::sync::Arc;

use tracing::{error, info, warn};
use wgpu::Device;
use winit::window::Window;

use crate::config::GraphicsConfig;
use crate::error::DemoError;

/// Device, queue and the window surface they draw into.
pub struct GpuContext {
    pub device: Arc<Device>,
    pub queue: Arc<wgpu::Queue>,
    pub surface: wgpu::Surface<'static>,
    pub format: wgpu::TextureFormat,
    pub config: wgpu::SurfaceConfiguration,
}

async fn init_device_and_queue(
    adapter: &wgpu::Adapter,
    debug: bool,
) -> Result<(Arc<Device>, Arc<wgpu::Queue>), DemoError> {
    let adapter_limits = adapter.limits();
    let limits = wgpu::Limits::downlevel_defaults().using_resolution(adapter_limits);

    let (device, queue) = adapter
        .request_device(&wgpu::DeviceDescriptor {
            label: Some("device"),
            required_features: wgpu::Features::empty(),
            required_limits: limits,
            memory_hints: wgpu::MemoryHints::default(),
            experimental_features: wgpu::ExperimentalFeatures::default(),
            trace: wgpu::Trace::default(),
        })
        .await?;

    // Validation errors nobody captured in an error scope end up here
    device.on_uncaptured_error(Arc::new(|err: wgpu::Error| {
        error!(target: "gpu", "uncaptured GPU error: {err}");
    }));
    if debug {
        info!(target: "gpu", "GPU debug output enabled");
    }

    Ok((Arc::new(device), Arc::new(queue)))
}

/// Pick the surface format. With `srgb` false a linear format is preferred
/// so the shader output reaches the screen untouched.
pub fn choose_format(formats: &[wgpu::TextureFormat], srgb: bool) -> Option<wgpu::TextureFormat> {
    formats
        .iter()
        .copied()
        .find(|f| f.is_srgb() == srgb)
        .or_else(|| formats.first().copied())
}

fn configure_surface(
    device: &Device,
    adapter: &wgpu::Adapter,
    surface: &wgpu::Surface,
    width: u32,
    height: u32,
    srgb: bool,
) -> Result<(wgpu::TextureFormat, wgpu::SurfaceConfiguration), DemoError> {
    let caps = surface.get_capabilities(adapter);
    let format = choose_format(&caps.formats, srgb).ok_or(DemoError::NoSurfaceFormat)?;
    if format.is_srgb() != srgb {
        warn!(?format, requested_srgb = srgb, "surface does not offer the requested encoding");
    }
    let alpha_mode = caps
        .alpha_modes
        .first()
        .copied()
        .unwrap_or(wgpu::CompositeAlphaMode::Auto);

    let config = wgpu::SurfaceConfiguration {
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        format,
        width: width.max(1),
        height: height.max(1),
        present_mode: wgpu::PresentMode::Fifo,
        alpha_mode,
        view_formats: vec![],
        desired_maximum_frame_latency: 2,
    };
    surface.configure(device, &config);

    Ok((format, config))
}

impl GpuContext {
    /// Bring up wgpu for `window`. Any failure here is fatal for the demo.
    pub fn new(window: Arc<Window>, graphics: &GraphicsConfig) -> Result<Self, DemoError> {
        pollster::block_on(Self::new_async(window, graphics))
    }

    async fn new_async(window: Arc<Window>, graphics: &GraphicsConfig) -> Result<Self, DemoError> {
        let size = window.inner_size();
        let flags = if graphics.debug {
            wgpu::InstanceFlags::debugging()
        } else {
            wgpu::InstanceFlags::from_build_config()
        };
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            flags,
            ..Default::default()
        });

        let surface = instance.create_surface(window)?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                force_fallback_adapter: false,
                compatible_surface: Some(&surface),
            })
            .await?;
        let adapter_info = adapter.get_info();
        info!(
            name = %adapter_info.name,
            backend = ?adapter_info.backend,
            "GPU adapter selected"
        );

        let (device, queue) = init_device_and_queue(&adapter, graphics.debug).await?;
        let (format, config) = configure_surface(
            &device,
            &adapter,
            &surface,
            size.width,
            size.height,
            graphics.srgb_surface,
        )?;
        info!(?format, width = config.width, height = config.height, "surface configured");

        Ok(GpuContext {
            device,
            queue,
            surface,
            format,
            config,
        })
    }

    pub fn size(&self) -> (u32, u32) {
        (self.config.width, self.config.height)
    }

    /// Reconfigure for a new size. Zero-sized requests are ignored.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.config.width = width;
        self.config.height = height;
        self.reconfigure();
    }

    pub fn reconfigure(&self) {
        self.surface.configure(&self.device, &self.config);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wgpu::TextureFormat;

    #[test]
    fn linear_format_is_preferred_by_default() {
        let formats = [TextureFormat::Bgra8UnormSrgb, TextureFormat::Bgra8Unorm];
        assert_eq!(choose_format(&formats, false), Some(TextureFormat::Bgra8Unorm));
        assert_eq!(choose_format(&formats, true), Some(TextureFormat::Bgra8UnormSrgb));
    }

    #[test]
    fn falls_back_to_first_format() {
        let formats = [TextureFormat::Rgba8UnormSrgb];
        assert_eq!(choose_format(&formats, false), Some(TextureFormat::Rgba8UnormSrgb));
        assert_eq!(choose_format(&[], false), None);
    }
}
