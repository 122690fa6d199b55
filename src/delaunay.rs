//! Incremental Bowyer-Watson Delaunay triangulation.
//!
//! The first three vertices form a synthetic super-triangle enclosing every
//! inserted point. Triangles that use one of them are bootstrap artifacts and
//! are skipped by [`Delaunay::triangles`].

use glam::DVec2;
use indexmap::IndexMap;
use tracing::debug;

/// Number of synthetic super-triangle vertices at the front of the vertex list.
pub const SUPER_VERTICES: usize = 3;

/// How far the super-triangle reaches beyond the bounding box, in box sizes.
const SUPER_MARGIN: f64 = 20.0;

#[derive(Debug, Clone, Copy, PartialEq)]
struct Triangle {
    vertices: [usize; 3],
    circumcenter: DVec2,
    radius_squared: f64,
}

#[derive(Debug, Clone)]
pub struct Delaunay {
    vertices: Vec<DVec2>,
    triangles: Vec<Triangle>,
    min: DVec2,
    max: DVec2,
}

impl Delaunay {
    /// An empty triangulation whose super-triangle encloses the given box.
    pub fn new(min_x: f64, max_x: f64, min_y: f64, max_y: f64) -> Self {
        let mut delaunay = Self {
            vertices: Vec::new(),
            triangles: Vec::new(),
            min: DVec2::new(min_x.min(max_x), min_y.min(max_y)),
            max: DVec2::new(min_x.max(max_x), min_y.max(max_y)),
        };
        delaunay.seed();
        delaunay
    }

    /// Number of inserted (non-synthetic) vertices.
    pub fn len(&self) -> usize {
        self.vertices.len() - SUPER_VERTICES
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn vertex(&self, index: usize) -> DVec2 {
        self.vertices[index]
    }

    /// Inserted vertices, in insertion order, with their vertex indices.
    pub fn vertices(&self) -> impl Iterator<Item = (usize, DVec2)> + '_ {
        self.vertices
            .iter()
            .copied()
            .enumerate()
            .skip(SUPER_VERTICES)
    }

    /// Triangles that do not touch the super-triangle, as vertex indices.
    pub fn triangles(&self) -> impl Iterator<Item = [usize; 3]> + '_ {
        self.triangles
            .iter()
            .map(|triangle| triangle.vertices)
            .filter(|vertices| vertices.iter().all(|&v| v >= SUPER_VERTICES))
    }

    /// Insert a point and return its vertex index.
    ///
    /// A point equal to an existing vertex is not inserted again; the index
    /// of that vertex is returned instead.
    pub fn insert(&mut self, point: DVec2) -> usize {
        if let Some(existing) = self.vertices().find(|(_, v)| *v == point) {
            return existing.0;
        }
        self.vertices.push(point);
        let index = self.vertices.len() - 1;

        if point.cmplt(self.min).any() || point.cmpgt(self.max).any() {
            self.min = self.min.min(point);
            self.max = self.max.max(point);
            debug!(x = point.x, y = point.y, "point outside triangulation bounds, rebuilding");
            self.rebuild();
        } else {
            self.insert_vertex(index);
        }
        index
    }

    /// Retriangulate every vertex under a super-triangle fitted to the current bounds.
    fn rebuild(&mut self) {
        let count = self.vertices.len();
        self.seed();
        for index in SUPER_VERTICES..count {
            self.insert_vertex(index);
        }
    }

    fn seed(&mut self) {
        let extent = (self.max - self.min).max_element();
        let span = if extent > 0.0 { extent } else { 1.0 } * SUPER_MARGIN;
        let center = (self.min + self.max) / 2.0;
        let corners = [
            DVec2::new(center.x - 2.0 * span, center.y - span),
            DVec2::new(center.x + 2.0 * span, center.y - span),
            DVec2::new(center.x, center.y + 2.0 * span),
        ];
        if self.vertices.len() < SUPER_VERTICES {
            self.vertices = corners.to_vec();
        } else {
            self.vertices[..SUPER_VERTICES].copy_from_slice(&corners);
        }
        self.triangles = vec![triangle(&self.vertices, [0, 1, 2])];
    }

    fn insert_vertex(&mut self, index: usize) {
        let point = self.vertices[index];

        // Edges of the cavity left by removing every triangle whose
        // circumcircle holds the point. Shared edges cancel out.
        let mut boundary: IndexMap<(usize, usize), (usize, usize)> = IndexMap::new();
        self.triangles.retain(|triangle| {
            if point.distance_squared(triangle.circumcenter) >= triangle.radius_squared {
                return true;
            }
            let [a, b, c] = triangle.vertices;
            for (from, to) in [(a, b), (b, c), (c, a)] {
                let key = (from.min(to), from.max(to));
                if boundary.shift_remove(&key).is_none() {
                    boundary.insert(key, (from, to));
                }
            }
            false
        });

        for (from, to) in boundary.into_values() {
            self.triangles
                .push(triangle(&self.vertices, [from, to, index]));
        }
    }
}

fn triangle(vertices: &[DVec2], indices: [usize; 3]) -> Triangle {
    let [a, b, c] = indices.map(|i| vertices[i]);
    let ab = b - a;
    let ac = c - a;
    let d = 2.0 * ab.perp_dot(ac);
    // Relative to the edge lengths, so the test holds at any coordinate scale.
    if d.abs() <= f64::EPSILON * (ab.length_squared() + ac.length_squared()) {
        // Collinear: treat the circumcircle as infinite so the next insertion replaces it.
        return Triangle {
            vertices: indices,
            circumcenter: (a + b + c) / 3.0,
            radius_squared: f64::INFINITY,
        };
    }
    let offset = DVec2::new(
        ac.y * ab.length_squared() - ab.y * ac.length_squared(),
        ab.x * ac.length_squared() - ac.x * ab.length_squared(),
    ) / d;
    Triangle {
        vertices: indices,
        circumcenter: a + offset,
        radius_squared: offset.length_squared(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand_distr::{Distribution, Normal};

    #[test]
    fn square_splits_into_two_triangles() {
        let mut delaunay = Delaunay::new(0.0, 1.0, 0.0, 1.0);
        for (x, y) in [(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)] {
            delaunay.insert(DVec2::new(x, y));
        }
        assert_eq!(delaunay.len(), 4);
        assert_eq!(delaunay.triangles().count(), 2);
    }

    #[test]
    fn fewer_than_three_points_have_no_visible_triangles() {
        let mut delaunay = Delaunay::new(0.0, 1.0, 0.0, 1.0);
        delaunay.insert(DVec2::new(0.2, 0.2));
        delaunay.insert(DVec2::new(0.8, 0.3));
        assert_eq!(delaunay.triangles().count(), 0);
        delaunay.insert(DVec2::new(0.5, 0.9));
        assert_eq!(delaunay.triangles().count(), 1);
    }

    #[test]
    fn duplicate_points_reuse_their_vertex() {
        let mut delaunay = Delaunay::new(0.0, 1.0, 0.0, 1.0);
        let first = delaunay.insert(DVec2::new(0.5, 0.5));
        let second = delaunay.insert(DVec2::new(0.5, 0.5));
        assert_eq!(first, second);
        assert_eq!(delaunay.len(), 1);
    }

    #[test]
    fn random_points_satisfy_empty_circumcircle() {
        let normal = Normal::new(5.0, 2.0).unwrap();
        let mut rng = rand::rng();
        let mut delaunay = Delaunay::new(0.0, 10.0, 0.0, 10.0);
        for _ in 0..200 {
            delaunay.insert(DVec2::new(normal.sample(&mut rng), normal.sample(&mut rng)));
        }
        check_delaunay(&delaunay);
    }

    #[test]
    fn points_outside_bounds_trigger_rebuild() {
        let mut delaunay = Delaunay::new(0.0, 1.0, 0.0, 1.0);
        for (x, y) in [(0.1, 0.1), (0.9, 0.2), (0.5, 0.8), (500.0, -300.0), (-40.0, 90.0)] {
            delaunay.insert(DVec2::new(x, y));
        }
        assert_eq!(delaunay.len(), 5);
        assert!(delaunay.triangles().count() > 0);
        check_delaunay(&delaunay);
        // Indices stay stable across a rebuild.
        assert_eq!(delaunay.vertex(SUPER_VERTICES), DVec2::new(0.1, 0.1));
    }

    #[test]
    fn triangulation_does_not_depend_on_scale() {
        // A power of two, so scaled coordinates are exact.
        let tiny = 1.0 / f64::from(1u32 << 27);
        let normal = Normal::new(5.0, 2.0).unwrap();
        let mut rng = rand::rng();
        let points: Vec<DVec2> = (0..60)
            .map(|_| DVec2::new(normal.sample(&mut rng), normal.sample(&mut rng)))
            .collect();

        let triangulate = |scale: f64| {
            let mut delaunay = Delaunay::new(0.0, 10.0 * scale, 0.0, 10.0 * scale);
            for point in &points {
                delaunay.insert(*point * scale);
            }
            delaunay
        };
        let unit = triangulate(1.0);
        let small = triangulate(tiny);
        check_delaunay(&small);

        let sorted = |delaunay: &Delaunay| {
            let mut triangles: Vec<[usize; 3]> = delaunay
                .triangles()
                .map(|mut t| {
                    t.sort_unstable();
                    t
                })
                .collect();
            triangles.sort_unstable();
            triangles
        };
        assert!(unit.triangles().count() > 60);
        assert_eq!(sorted(&unit), sorted(&small));
    }

    fn check_delaunay(delaunay: &Delaunay) {
        for indices in delaunay.triangles() {
            let t = triangle(&delaunay.vertices, indices);
            for (index, vertex) in delaunay.vertices() {
                if indices.contains(&index) {
                    continue;
                }
                let distance = vertex.distance_squared(t.circumcenter);
                assert!(
                    distance >= t.radius_squared * (1.0 - 1e-9),
                    "vertex {index} lies inside the circumcircle of {indices:?}"
                );
            }
        }
    }
}
