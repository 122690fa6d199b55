//! Height maps: a Delaunay mesh over (x, y) with z shaded through a [`ColorMap`].

use glam::{DVec2, DVec3};
use tracing::trace;

use crate::color::ColorMap;
use crate::delaunay::{Delaunay, SUPER_VERTICES};
use crate::surface::LinearGradient;

/// A triangle of the height map with its heights.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Triangle3D {
    pub vertices: [DVec3; 3],
}

impl Triangle3D {
    pub fn new(a: DVec3, b: DVec3, c: DVec3) -> Self {
        Self {
            vertices: [a, b, c],
        }
    }

    /// Normal of the triangle's plane (not normalized).
    pub fn normal(&self) -> DVec3 {
        let [a, b, c] = self.vertices;
        (b - a).cross(c - a)
    }

    /// The lowest vertex and the point where the steepest ascent from it
    /// reaches the height of the highest vertex.
    ///
    /// Both ends coincide for a flat triangle, and for one standing
    /// vertically over a line in the xy-plane.
    pub fn gradient_vector(&self) -> (DVec3, DVec3) {
        let mut low = self.vertices[0];
        let mut high = self.vertices[1];
        for vertex in self.vertices {
            if vertex.z < low.z {
                low = vertex;
            }
            if vertex.z > high.z {
                high = vertex;
            }
        }
        if low.z == high.z {
            return (low, low);
        }

        let normal = self.normal();
        if normal.z == 0.0 {
            return (low, low);
        }
        // Plane z = z0 - (n.x dx + n.y dy) / n.z has gradient -(n.x, n.y) / n.z.
        let gradient = DVec2::new(-normal.x / normal.z, -normal.y / normal.z);
        let steepness = gradient.length_squared();
        if steepness == 0.0 || !steepness.is_finite() {
            return (low, low);
        }
        let t = (high.z - low.z) / steepness;
        let end = low.truncate() + gradient * t;
        (low, end.extend(high.z))
    }

    /// In-plane direction of steepest ascent, scaled to span the height range.
    pub fn gradient(&self) -> DVec2 {
        let (low, high) = self.gradient_vector();
        (high - low).truncate()
    }
}

/// A triangle ready to fill: corners and gradient in plot units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShadedTriangle {
    pub vertices: [DVec2; 3],
    pub gradient: LinearGradient,
}

#[derive(Debug, Clone)]
pub struct HeightMapMesh {
    delaunay: Delaunay,
    /// Height per triangulation vertex index.
    heights: Vec<f64>,
    z_range: Option<(f64, f64)>,
    color_map: ColorMap,
}

impl HeightMapMesh {
    pub fn new(min_x: f64, max_x: f64, min_y: f64, max_y: f64) -> Self {
        Self {
            delaunay: Delaunay::new(min_x, max_x, min_y, max_y),
            heights: vec![0.0; SUPER_VERTICES],
            z_range: None,
            color_map: ColorMap::default(),
        }
    }

    /// Number of distinct (x, y) positions.
    pub fn len(&self) -> usize {
        self.delaunay.len()
    }

    pub fn is_empty(&self) -> bool {
        self.delaunay.is_empty()
    }

    /// Lowest and highest z seen so far.
    pub fn z_range(&self) -> Option<(f64, f64)> {
        self.z_range
    }

    pub fn color_map(&self) -> &ColorMap {
        &self.color_map
    }

    /// Add a sample. Non-finite samples and repeated positions are ignored.
    pub fn add(&mut self, x: f64, y: f64, z: f64) -> bool {
        if !(x.is_finite() && y.is_finite() && z.is_finite()) {
            trace!(x, y, z, "ignoring non-finite height map sample");
            return false;
        }
        let index = self.delaunay.insert(DVec2::new(x, y));
        if index < self.heights.len() {
            trace!(x, y, "ignoring repeated height map position");
            return false;
        }
        self.heights.push(z);
        self.z_range = Some(match self.z_range {
            Some((low, high)) => (low.min(z), high.max(z)),
            None => (z, z),
        });
        true
    }

    /// `z` mapped to `[0, 1]` over the current z range.
    pub fn normalized(&self, z: f64) -> f64 {
        match self.z_range {
            Some((low, high)) if high > low => (z - low) / (high - low),
            _ => 0.5,
        }
    }

    /// Mesh triangles, excluding those on the super-triangle.
    pub fn triangles(&self) -> impl Iterator<Item = Triangle3D> + '_ {
        self.delaunay.triangles().map(|indices| {
            let [a, b, c] = indices.map(|i| self.delaunay.vertex(i).extend(self.heights[i]));
            Triangle3D::new(a, b, c)
        })
    }

    /// Every visible triangle with a gradient from its lowest to its highest color.
    pub fn shaded_triangles(&self) -> Vec<ShadedTriangle> {
        self.triangles()
            .map(|triangle| {
                let (low, high) = triangle.gradient_vector();
                let gradient = LinearGradient::new(
                    low.truncate(),
                    high.truncate(),
                    self.color_map.color(self.normalized(low.z)),
                    self.color_map.color(self.normalized(high.z)),
                );
                ShadedTriangle {
                    vertices: triangle.vertices.map(DVec3::truncate),
                    gradient,
                }
            })
            .collect()
    }

    /// Refit the color scaling to the distribution of heights. Visits every vertex.
    pub fn calculate_height_scaling(&mut self) {
        let proportions: Vec<f64> = self
            .delaunay
            .vertices()
            .map(|(index, _)| self.normalized(self.heights[index]))
            .collect();
        self.color_map.fit(proportions);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Color;

    #[test]
    fn cross_product_of_unit_axes() {
        assert_eq!(DVec3::X.cross(DVec3::Y), DVec3::Z);
    }

    #[test]
    fn gradient_vector_spans_height_range() {
        let a = DVec3::new(1.0, 0.0, 0.0);
        let b = DVec3::new(0.0, 1.0, 0.0);
        let c = DVec3::new(1.0, 1.0, 1.0);
        for triangle in [Triangle3D::new(a, b, c), Triangle3D::new(c, a, b)] {
            let (low, high) = triangle.gradient_vector();
            assert_eq!(low, DVec3::new(1.0, 0.0, 0.0));
            assert_eq!(high, DVec3::new(1.5, 0.5, 1.0));
        }
    }

    #[test]
    fn flat_triangle_has_zero_gradient() {
        let triangle = Triangle3D::new(
            DVec3::new(0.0, 0.0, 2.0),
            DVec3::new(3.0, 0.0, 2.0),
            DVec3::new(0.0, 4.0, 2.0),
        );
        assert_eq!(triangle.gradient().length(), 0.0);
    }

    #[test]
    fn vertical_triangle_has_zero_gradient() {
        let triangle = Triangle3D::new(
            DVec3::new(0.0, 0.0, 0.0),
            DVec3::new(1.0, 1.0, 0.0),
            DVec3::new(0.5, 0.5, 3.0),
        );
        assert_eq!(triangle.gradient(), DVec2::ZERO);
    }

    #[test]
    fn mesh_tracks_heights_and_skips_super_triangle() {
        let mut mesh = HeightMapMesh::new(0.0, 1.0, 0.0, 1.0);
        assert!(mesh.add(0.0, 0.0, 1.0));
        assert!(mesh.add(1.0, 0.0, 3.0));
        assert_eq!(mesh.triangles().count(), 0);
        assert!(mesh.add(0.0, 1.0, -1.0));
        assert!(!mesh.add(0.0, 1.0, 10.0));
        assert!(!mesh.add(f64::NAN, 0.5, 0.0));

        assert_eq!(mesh.z_range(), Some((-1.0, 3.0)));
        assert_eq!(mesh.triangles().count(), 1);
        assert_eq!(mesh.normalized(1.0), 0.5);

        let shaded = mesh.shaded_triangles();
        assert_eq!(shaded.len(), 1);
        assert_eq!(shaded[0].gradient.from, Color::DARK_BLUE);
        assert_eq!(shaded[0].gradient.to, Color::RED);
    }

    #[test]
    fn height_scaling_uses_all_vertices() {
        let mut mesh = HeightMapMesh::new(0.0, 4.0, 0.0, 4.0);
        for (i, z) in [0.0, 1.0, 1.0, 1.0, 1.0, 1.0, 2.0].into_iter().enumerate() {
            mesh.add(i as f64 * 0.5, (i % 3) as f64, z);
        }
        mesh.calculate_height_scaling();
        let map = mesh.color_map();
        assert!(map.scaling);
        assert!((map.alpha - map.beta).abs() < 1e-9);
        assert!(map.alpha > 1.0);
    }
}
