use std::f32::consts::PI;
use std::ops::Range;
use std::path::Path;

use bytemuck::{Pod, Zeroable};
use glam::{Mat3, Mat4, Vec3};
use image::RgbaImage;
use tracing::{debug, warn};
use wgpu::util::DeviceExt;

use crate::error::LoadError;

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub pos: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

impl Vertex {
    const ATTRIBUTES: [wgpu::VertexAttribute; 3] =
        wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3, 2 => Float32x2];

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

/// Indexed triangle list on the CPU side.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mesh {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

pub struct MeshBuffer {
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub index_count: u32,
}

impl MeshBuffer {
    pub fn draw(&self, pass: &mut wgpu::RenderPass<'_>, instances: Range<u32>) {
        if self.index_count == 0 {
            return;
        }
        pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        pass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        pass.draw_indexed(0..self.index_count, 0, instances);
    }
}

/// A loaded model: one merged mesh and its base colour image, if any.
#[derive(Debug, Clone)]
pub struct Model {
    pub mesh: Mesh,
    pub base_color: Option<RgbaImage>,
}

impl Mesh {
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn upload(&self, device: &wgpu::Device, label: &str) -> MeshBuffer {
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: bytemuck::cast_slice(&self.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: bytemuck::cast_slice(&self.indices),
            usage: wgpu::BufferUsages::INDEX,
        });

        MeshBuffer {
            vertex_buffer,
            index_buffer,
            index_count: self.indices.len() as u32,
        }
    }

    /// Append `other` with its positions and normals transformed.
    fn append_transformed(&mut self, other: &Mesh, transform: Mat4) {
        let normal_matrix = Mat3::from_mat4(transform).inverse().transpose();
        let base = self.vertices.len() as u32;
        self.vertices.extend(other.vertices.iter().map(|v| Vertex {
            pos: transform.transform_point3(Vec3::from(v.pos)).to_array(),
            normal: (normal_matrix * Vec3::from(v.normal)).normalize_or_zero().to_array(),
            uv: v.uv,
        }));
        self.indices.extend(other.indices.iter().map(|i| i + base));
    }

    /// Unit cube centred on the origin, counter-clockwise faces pointing out.
    pub fn cube() -> Self {
        const FACES: [([f32; 3], [f32; 3], [f32; 3]); 6] = [
            ([1.0, 0.0, 0.0], [0.0, 0.0, -1.0], [0.0, 1.0, 0.0]),
            ([-1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0, 0.0]),
            ([0.0, 1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, -1.0]),
            ([0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]),
            ([0.0, 0.0, 1.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
            ([0.0, 0.0, -1.0], [-1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
        ];
        const CORNERS: [(f32, f32); 4] = [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)];

        let mut mesh = Mesh::default();
        for (normal, u, v) in FACES {
            let (n, u, v) = (Vec3::from(normal), Vec3::from(u), Vec3::from(v));
            let base = mesh.vertices.len() as u32;
            for (su, sv) in CORNERS {
                let pos = (n + u * su + v * sv) * 0.5;
                mesh.vertices.push(Vertex {
                    pos: pos.to_array(),
                    normal,
                    uv: [(su + 1.0) * 0.5, (1.0 - sv) * 0.5],
                });
            }
            mesh.indices
                .extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
        }
        mesh
    }

    /// Upward-facing square at height `y`, `2 * half` wide, with the texture
    /// repeated `uv_repeat` times across it.
    pub fn plane(half: f32, y: f32, uv_repeat: f32) -> Self {
        let corners = [
            ([half, y, half], [uv_repeat, 0.0]),
            ([-half, y, half], [0.0, 0.0]),
            ([-half, y, -half], [0.0, uv_repeat]),
            ([half, y, -half], [uv_repeat, uv_repeat]),
        ];
        Mesh {
            vertices: corners
                .iter()
                .map(|(pos, uv)| Vertex {
                    pos: *pos,
                    normal: [0.0, 1.0, 0.0],
                    uv: *uv,
                })
                .collect(),
            indices: vec![0, 2, 1, 0, 3, 2],
        }
    }

    /// Latitude/longitude sphere; used where a model file is missing.
    pub fn uv_sphere(radius: f32, sectors: u32, stacks: u32) -> Self {
        let sectors = sectors.max(3);
        let stacks = stacks.max(2);
        let mut mesh = Mesh::default();

        for i in 0..=stacks {
            let phi = PI / 2.0 - i as f32 * PI / stacks as f32;
            for j in 0..=sectors {
                let theta = j as f32 * 2.0 * PI / sectors as f32;
                let normal = Vec3::new(phi.cos() * theta.cos(), phi.sin(), -phi.cos() * theta.sin());
                mesh.vertices.push(Vertex {
                    pos: (normal * radius).to_array(),
                    normal: normal.to_array(),
                    uv: [j as f32 / sectors as f32, i as f32 / stacks as f32],
                });
            }
        }

        for i in 0..stacks {
            let k1 = i * (sectors + 1);
            let k2 = k1 + sectors + 1;
            for j in 0..sectors {
                if i != 0 {
                    mesh.indices.extend_from_slice(&[k1 + j, k2 + j, k1 + j + 1]);
                }
                if i != stacks - 1 {
                    mesh.indices.extend_from_slice(&[k1 + j + 1, k2 + j, k2 + j + 1]);
                }
            }
        }
        mesh
    }
}

fn read_primitive(primitive: &gltf::Primitive<'_>, buffers: &[gltf::buffer::Data]) -> Option<Mesh> {
    if primitive.mode() != gltf::mesh::Mode::Triangles {
        return None;
    }
    let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(|data| &data.0[..]));
    let positions: Vec<[f32; 3]> = reader.read_positions()?.collect();
    let mut normals = reader.read_normals().map(|n| n.collect::<Vec<_>>()).unwrap_or_default();
    normals.resize(positions.len(), [0.0, 1.0, 0.0]);
    let mut uvs = reader
        .read_tex_coords(0)
        .map(|t| t.into_f32().collect::<Vec<_>>())
        .unwrap_or_default();
    uvs.resize(positions.len(), [0.0, 0.0]);
    let indices = match reader.read_indices() {
        Some(indices) => indices.into_u32().collect(),
        None => (0..positions.len() as u32).collect(),
    };

    let vertices = positions
        .into_iter()
        .zip(normals)
        .zip(uvs)
        .map(|((pos, normal), uv)| Vertex { pos, normal, uv })
        .collect();
    Some(Mesh { vertices, indices })
}

fn collect_node(
    node: gltf::Node<'_>,
    parent: Mat4,
    buffers: &[gltf::buffer::Data],
    out: &mut Mesh,
    base_color: &mut Option<usize>,
) {
    let transform = parent * Mat4::from_cols_array_2d(&node.transform().matrix());
    if let Some(mesh) = node.mesh() {
        for primitive in mesh.primitives() {
            if let Some(part) = read_primitive(&primitive, buffers) {
                out.append_transformed(&part, transform);
            }
            if base_color.is_none() {
                *base_color = primitive
                    .material()
                    .pbr_metallic_roughness()
                    .base_color_texture()
                    .map(|info| info.texture().source().index());
            }
        }
    }
    for child in node.children() {
        collect_node(child, transform, buffers, out, base_color);
    }
}

/// Expand a glTF image into RGBA8.
pub fn gltf_image_to_rgba(path: &Path, data: &gltf::image::Data) -> Result<RgbaImage, LoadError> {
    use gltf::image::Format;

    let pixels: Vec<u8> = match data.format {
        Format::R8G8B8A8 => data.pixels.clone(),
        Format::R8G8B8 => data
            .pixels
            .chunks_exact(3)
            .flat_map(|p| [p[0], p[1], p[2], 255])
            .collect(),
        Format::R8 => data.pixels.iter().flat_map(|&l| [l, l, l, 255]).collect(),
        other => {
            return Err(LoadError::PixelFormat {
                path: path.to_path_buf(),
                format: format!("{other:?}"),
            })
        }
    };
    RgbaImage::from_raw(data.width, data.height, pixels).ok_or_else(|| LoadError::PixelFormat {
        path: path.to_path_buf(),
        format: format!("{:?} with short pixel data", data.format),
    })
}

/// Import a glTF file and merge every triangle primitive of its default
/// scene into one mesh.
pub fn load_model(path: &Path) -> Result<Model, LoadError> {
    let (document, buffers, images) = gltf::import(path).map_err(|source| LoadError::Model {
        path: path.to_path_buf(),
        source,
    })?;

    let mut mesh = Mesh::default();
    let mut base_color_index = None;
    match document.default_scene().or_else(|| document.scenes().next()) {
        Some(scene) => {
            for node in scene.nodes() {
                collect_node(node, Mat4::IDENTITY, &buffers, &mut mesh, &mut base_color_index);
            }
        }
        None => {
            for node in document.nodes() {
                collect_node(node, Mat4::IDENTITY, &buffers, &mut mesh, &mut base_color_index);
            }
        }
    }
    if mesh.is_empty() {
        return Err(LoadError::EmptyModel { path: path.to_path_buf() });
    }

    let base_color = match base_color_index.and_then(|index| images.get(index)) {
        Some(data) => match gltf_image_to_rgba(path, data) {
            Ok(image) => Some(image),
            Err(err) => {
                warn!("{err}; model will use a placeholder texture");
                None
            }
        },
        None => None,
    };

    debug!(
        path = %path.display(),
        vertices = mesh.vertices.len(),
        triangles = mesh.indices.len() / 3,
        textured = base_color.is_some(),
        "model loaded"
    );
    Ok(Model { mesh, base_color })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangles(mesh: &Mesh) -> impl Iterator<Item = [Vec3; 3]> + '_ {
        mesh.indices.chunks_exact(3).map(|t| {
            [
                Vec3::from(mesh.vertices[t[0] as usize].pos),
                Vec3::from(mesh.vertices[t[1] as usize].pos),
                Vec3::from(mesh.vertices[t[2] as usize].pos),
            ]
        })
    }

    #[test]
    fn vertex_is_tightly_packed() {
        assert_eq!(std::mem::size_of::<Vertex>(), 32);
        assert_eq!(Vertex::layout().attributes[2].offset, 24);
    }

    #[test]
    fn cube_faces_wind_outward() {
        let cube = Mesh::cube();
        assert_eq!(cube.vertices.len(), 24);
        assert_eq!(cube.indices.len(), 36);
        for [a, b, c] in triangles(&cube) {
            let face_normal = (b - a).cross(c - a);
            let centre = (a + b + c) / 3.0;
            assert!(face_normal.dot(centre) > 0.0, "inward triangle {a} {b} {c}");
        }
        for v in &cube.vertices {
            assert!(v.pos.iter().all(|c| c.abs() == 0.5));
        }
    }

    #[test]
    fn plane_faces_up() {
        let plane = Mesh::plane(10.0, -0.5, 10.0);
        for [a, b, c] in triangles(&plane) {
            assert!((b - a).cross(c - a).y > 0.0);
        }
        assert!(plane.vertices.iter().all(|v| v.pos[1] == -0.5));
        assert!(plane.vertices.iter().any(|v| v.uv == [10.0, 10.0]));
    }

    #[test]
    fn sphere_points_lie_on_the_radius() {
        let sphere = Mesh::uv_sphere(2.0, 16, 8);
        for v in &sphere.vertices {
            assert!((Vec3::from(v.pos).length() - 2.0).abs() < 1e-4);
        }
        let max = sphere.vertices.len() as u32;
        assert!(sphere.indices.iter().all(|&i| i < max));
        for [a, b, c] in triangles(&sphere) {
            let face_normal = (b - a).cross(c - a);
            if face_normal.length() > 1e-6 {
                assert!(face_normal.dot(a + b + c) > 0.0);
            }
        }
    }

    #[test]
    fn append_offsets_indices_and_moves_points() {
        let mut merged = Mesh::default();
        let plane = Mesh::plane(1.0, 0.0, 1.0);
        merged.append_transformed(&plane, Mat4::IDENTITY);
        merged.append_transformed(&plane, Mat4::from_translation(Vec3::Y));
        assert_eq!(merged.vertices.len(), 8);
        assert_eq!(merged.indices[6], 4);
        assert_eq!(merged.vertices[4].pos[1], 1.0);
        assert_eq!(merged.vertices[4].normal, [0.0, 1.0, 0.0]);
    }

    #[test]
    fn rgb_images_gain_an_alpha_channel() {
        let data = gltf::image::Data {
            pixels: vec![10, 20, 30, 40, 50, 60],
            format: gltf::image::Format::R8G8B8,
            width: 2,
            height: 1,
        };
        let image = gltf_image_to_rgba(Path::new("rock.gltf"), &data).unwrap();
        assert_eq!(image.as_raw(), &vec![10, 20, 30, 255, 40, 50, 60, 255]);
    }

    #[test]
    fn missing_model_is_a_model_error() {
        let err = load_model(Path::new("no/such/rock.gltf")).unwrap_err();
        assert!(matches!(err, LoadError::Model { .. }));
    }
}
