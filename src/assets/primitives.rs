//! Built-in meshes addressable by name from a document, centred on the origin
//! and fitting a unit box.

use crate::render::{MeshData, MeshVertex};
use glam::Vec3;
use std::f32::consts::{PI, TAU};

pub const CUBE: &str = "Cube";
pub const SPHERE: &str = "Sphere";
pub const PLANE: &str = "Plane";

pub fn builtin(reference: &str) -> Option<MeshData> {
    match reference {
        CUBE => Some(cube()),
        SPHERE => Some(sphere(24, 16)),
        PLANE => Some(plane()),
        _ => None,
    }
}

#[derive(Default)]
struct MeshBuilder {
    mesh: MeshData,
}

impl MeshBuilder {
    /// Flat-shaded triangle; winding is flipped if needed so the face points
    /// away from the origin.
    fn triangle(&mut self, a: Vec3, mut b: Vec3, mut c: Vec3) {
        let mut normal = (b - a).cross(c - a).normalize_or_zero();
        if normal.dot((a + b + c) / 3.0) < 0.0 {
            std::mem::swap(&mut b, &mut c);
            normal = -normal;
        }
        let base = self.mesh.vertices.len() as u32;
        for position in [a, b, c] {
            self.mesh.vertices.push(MeshVertex {
                position: position.to_array(),
                normal: normal.to_array(),
            });
        }
        self.mesh.indices.extend_from_slice(&[base, base + 1, base + 2]);
    }

    fn quad(&mut self, a: Vec3, b: Vec3, c: Vec3, d: Vec3) {
        self.triangle(a, b, c);
        self.triangle(a, c, d);
    }

    fn finish(self) -> MeshData {
        self.mesh
    }
}

fn cube() -> MeshData {
    let mut builder = MeshBuilder::default();
    // One quad per axis direction, corners walked around the face.
    for axis in 0..3 {
        for sign in [-0.5f32, 0.5] {
            let mut corners = [Vec3::ZERO; 4];
            for (corner, (u, v)) in corners
                .iter_mut()
                .zip([(-0.5, -0.5), (0.5, -0.5), (0.5, 0.5), (-0.5, 0.5)])
            {
                let mut p = [0.0f32; 3];
                p[axis] = sign;
                p[(axis + 1) % 3] = u;
                p[(axis + 2) % 3] = v;
                *corner = Vec3::from(p);
            }
            builder.quad(corners[0], corners[1], corners[2], corners[3]);
        }
    }
    builder.finish()
}

fn plane() -> MeshData {
    let mut builder = MeshBuilder::default();
    // Lies at y = 0, so the outward check cannot decide; corners are wound
    // counter-clockwise seen from +Y.
    let a = Vec3::new(-0.5, 0.0, 0.5);
    let b = Vec3::new(0.5, 0.0, 0.5);
    let c = Vec3::new(0.5, 0.0, -0.5);
    let d = Vec3::new(-0.5, 0.0, -0.5);
    builder.quad(a, b, c, d);
    builder.finish()
}

/// Smooth-shaded UV sphere of radius 0.5.
fn sphere(longitude_segments: u32, latitude_segments: u32) -> MeshData {
    let lon = longitude_segments.max(3);
    let lat = latitude_segments.max(2);
    let mut mesh = MeshData::default();

    for y in 0..=lat {
        let phi = y as f32 / lat as f32 * PI;
        for x in 0..=lon {
            let theta = x as f32 / lon as f32 * TAU;
            let normal = Vec3::new(phi.sin() * theta.cos(), phi.cos(), phi.sin() * theta.sin());
            mesh.vertices.push(MeshVertex {
                position: (normal * 0.5).to_array(),
                normal: normal.to_array(),
            });
        }
    }

    let row = lon + 1;
    for y in 0..lat {
        for x in 0..lon {
            let i0 = y * row + x;
            let i1 = i0 + 1;
            let i2 = i0 + row;
            let i3 = i2 + 1;
            // Pole rows collapse one triangle of each quad to a point.
            if y != 0 {
                mesh.indices.extend_from_slice(&[i0, i1, i2]);
            }
            if y != lat - 1 {
                mesh.indices.extend_from_slice(&[i1, i3, i2]);
            }
        }
    }
    mesh
}
