// VIEW: window, GPU and resource loading
pub mod debug;
pub mod gpu_init;
pub mod mesh;
pub mod render;
pub mod texture;
pub mod window;

pub use gpu_init::GpuContext;
pub use mesh::{Mesh, MeshBuffer, Model, Vertex};
pub use render::{Frame, GpuRenderer, Scene};
pub use texture::{ColorSpace, Texture};
pub use window::WindowHost;
