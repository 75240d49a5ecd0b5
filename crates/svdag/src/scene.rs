//! External collaborators the voxelizer consumes: scene geometry, the
//! triangle-box intersection predicate, and lazy point streams.
//!
//! These are "external" in the sense that a full engine would supply its
//! own mesh loader and renderer-facing `Scene`; this crate defines the
//! minimal interface plus a working reference implementation so the
//! pipeline is runnable and testable standalone.

use std::io::BufRead;

use glam::Vec3;
use svdag_core::MaterialId;

/// A single triangle, defined by its three vertices.
#[derive(Clone, Copy, Debug)]
pub struct Triangle {
    pub v0: Vec3,
    pub v1: Vec3,
    pub v2: Vec3,
}

/// Read-only view over scene geometry. A `None` triangle (e.g. a degenerate
/// or deleted entry) is skipped silently by the voxelizer.
pub trait Scene {
    fn triangle_count(&self) -> usize;
    fn triangle(&self, index: usize) -> Option<Triangle>;
    fn triangle_material(&self, index: usize) -> MaterialId;
}

/// A plain in-memory scene, useful for tests and small inputs.
#[derive(Clone, Debug, Default)]
pub struct TriangleSoup {
    triangles: Vec<Triangle>,
    materials: Vec<MaterialId>,
}

impl TriangleSoup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, tri: Triangle, material: MaterialId) {
        self.triangles.push(tri);
        self.materials.push(material);
    }
}

impl Scene for TriangleSoup {
    fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    fn triangle(&self, index: usize) -> Option<Triangle> {
        self.triangles.get(index).copied()
    }

    fn triangle_material(&self, index: usize) -> MaterialId {
        self.materials.get(index).copied().unwrap_or(MaterialId::NONE)
    }
}

/// Conservative triangle/box overlap test (separating axis theorem,
/// Akenine-Möller). Used by `fromTriangles` voxelization to decide whether
/// a triangle touches a given octant's cube.
pub fn tri_box_overlap(center: Vec3, half_side: f32, tri: &Triangle) -> bool {
    let h = Vec3::splat(half_side);
    let v0 = tri.v0 - center;
    let v1 = tri.v1 - center;
    let v2 = tri.v2 - center;

    // 1. Triangle AABB vs box AABB (cheap rejection).
    let tmin = v0.min(v1).min(v2);
    let tmax = v0.max(v1).max(v2);
    if tmin.x > h.x || tmax.x < -h.x {
        return false;
    }
    if tmin.y > h.y || tmax.y < -h.y {
        return false;
    }
    if tmin.z > h.z || tmax.z < -h.z {
        return false;
    }

    // 2. Plane of the triangle vs box.
    let normal = (v1 - v0).cross(v2 - v0);
    if !plane_box_overlap(normal, v0, h) {
        return false;
    }

    // 3. Nine axis tests: cross(edge, unit axis) for each of the three
    // triangle edges against each of the three box axes.
    let edges = [v1 - v0, v2 - v1, v0 - v2];
    let verts = [v0, v1, v2];
    for edge in &edges {
        for axis in 0..3 {
            let axis_vec = match axis {
                0 => Vec3::X,
                1 => Vec3::Y,
                _ => Vec3::Z,
            };
            let a = axis_vec.cross(*edge);
            if a.length_squared() < 1e-20 {
                continue;
            }
            let mut min = f32::MAX;
            let mut max = f32::MIN;
            for v in &verts {
                let p = v.dot(a);
                min = min.min(p);
                max = max.max(p);
            }
            let r = h.x * a.x.abs() + h.y * a.y.abs() + h.z * a.z.abs();
            if min > r || max < -r {
                return false;
            }
        }
    }

    true
}

fn plane_box_overlap(normal: Vec3, vert: Vec3, half: Vec3) -> bool {
    let mut vmin = Vec3::ZERO;
    let mut vmax = Vec3::ZERO;
    for i in 0..3 {
        let n = normal[i];
        let v = vert[i];
        let h = half[i];
        if n > 0.0 {
            vmin[i] = -h - v;
            vmax[i] = h - v;
        } else {
            vmin[i] = h - v;
            vmax[i] = -h - v;
        }
    }
    if normal.dot(vmin) > 0.0 {
        return false;
    }
    normal.dot(vmax) >= 0.0
}

/// A lazy sequence of 3D points read from a geometry/point-cloud source.
pub trait PointStream: Iterator<Item = Vec3> {}
impl<T: Iterator<Item = Vec3>> PointStream for T {}

/// Reads whitespace-separated `x y z` triples (one or more per line) from
/// any buffered reader, skipping malformed lines.
pub struct TextPointStream<R: BufRead> {
    reader: R,
    pending: std::vec::IntoIter<Vec3>,
}

impl<R: BufRead> TextPointStream<R> {
    pub fn new(reader: R) -> Self {
        Self { reader, pending: Vec::new().into_iter() }
    }
}

impl<R: BufRead> Iterator for TextPointStream<R> {
    type Item = Vec3;

    fn next(&mut self) -> Option<Vec3> {
        loop {
            if let Some(p) = self.pending.next() {
                return Some(p);
            }
            let mut line = String::new();
            match self.reader.read_line(&mut line) {
                Ok(0) => return None,
                Ok(_) => {
                    let nums: Vec<f32> = line
                        .split_whitespace()
                        .filter_map(|tok| tok.parse::<f32>().ok())
                        .collect();
                    let mut points = Vec::new();
                    for chunk in nums.chunks_exact(3) {
                        points.push(Vec3::new(chunk[0], chunk[1], chunk[2]));
                    }
                    self.pending = points.into_iter();
                }
                Err(_) => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn triangle_overlapping_box_origin() {
        let tri = Triangle {
            v0: Vec3::new(-1.0, 0.0, 0.0),
            v1: Vec3::new(1.0, 0.0, 0.0),
            v2: Vec3::new(0.0, 1.0, 0.0),
        };
        assert!(tri_box_overlap(Vec3::ZERO, 0.5, &tri));
    }

    #[test]
    fn triangle_far_away_does_not_overlap() {
        let tri = Triangle {
            v0: Vec3::new(10.0, 10.0, 10.0),
            v1: Vec3::new(11.0, 10.0, 10.0),
            v2: Vec3::new(10.0, 11.0, 10.0),
        };
        assert!(!tri_box_overlap(Vec3::ZERO, 0.5, &tri));
    }

    #[test]
    fn text_point_stream_parses_triples() {
        let data = "0.0 0.0 0.0\n1.5 2.5 3.5\n\nbad line\n4 5 6";
        let stream = TextPointStream::new(Cursor::new(data));
        let points: Vec<Vec3> = stream.collect();
        assert_eq!(points.len(), 3);
        assert_eq!(points[0], Vec3::ZERO);
        assert_eq!(points[2], Vec3::new(4.0, 5.0, 6.0));
    }
}
