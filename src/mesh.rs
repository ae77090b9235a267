//! A minimal triangle mesh with element and boundary markers.
use nalgebra::Point2;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

pub const DEFAULT_ELEMENT_MARKER: &str = "domain";
pub const DEFAULT_BOUNDARY_MARKER: &str = "boundary";

/// An edge belonging to exactly one triangle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundaryEdge {
    /// Vertex indices, ordered counter-clockwise with respect to the adjacent element.
    pub vertices: [usize; 2],
    pub element: usize,
    pub marker: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TriangleMesh {
    vertices: Vec<Point2<f64>>,
    connectivity: Vec<[usize; 3]>,
    element_markers: Vec<String>,
    boundary_edges: Vec<BoundaryEdge>,
}

impl TriangleMesh {
    /// Creates a mesh from counter-clockwise oriented triangles.
    ///
    /// All elements receive [`DEFAULT_ELEMENT_MARKER`]. Boundary edges are detected as the edges
    /// belonging to a single triangle and receive [`DEFAULT_BOUNDARY_MARKER`].
    ///
    /// # Panics
    ///
    /// Panics if a triangle refers to a vertex that does not exist.
    pub fn from_vertices_and_connectivity(vertices: Vec<Point2<f64>>, connectivity: Vec<[usize; 3]>) -> Self {
        for (e, triangle) in connectivity.iter().enumerate() {
            for &v in triangle {
                assert!(v < vertices.len(), "Element {e} refers to nonexistent vertex {v}");
            }
        }

        let boundary_edges = find_boundary_edges(&connectivity);
        Self {
            element_markers: vec![DEFAULT_ELEMENT_MARKER.to_string(); connectivity.len()],
            vertices,
            connectivity,
            boundary_edges,
        }
    }

    pub fn vertices(&self) -> &[Point2<f64>] {
        &self.vertices
    }

    pub fn connectivity(&self) -> &[[usize; 3]] {
        &self.connectivity
    }

    pub fn num_elements(&self) -> usize {
        self.connectivity.len()
    }

    pub fn element_vertices(&self, element: usize) -> [Point2<f64>; 3] {
        self.connectivity[element].map(|v| self.vertices[v])
    }

    pub fn element_marker(&self, element: usize) -> &str {
        &self.element_markers[element]
    }

    pub fn boundary_edges(&self) -> &[BoundaryEdge] {
        &self.boundary_edges
    }

    /// Assigns markers to elements for which `marker` returns a value.
    pub fn mark_elements(&mut self, marker: impl Fn(&[Point2<f64>; 3]) -> Option<String>) {
        for e in 0..self.num_elements() {
            if let Some(name) = marker(&self.element_vertices(e)) {
                self.element_markers[e] = name;
            }
        }
    }

    /// Assigns markers to boundary edges for which `marker` returns a value, given the edge
    /// end points.
    pub fn mark_boundary_edges(&mut self, marker: impl Fn(&Point2<f64>, &Point2<f64>) -> Option<String>) {
        for edge in &mut self.boundary_edges {
            let [a, b] = edge.vertices;
            if let Some(name) = marker(&self.vertices[a], &self.vertices[b]) {
                edge.marker = name;
            }
        }
    }
}

fn find_boundary_edges(connectivity: &[[usize; 3]]) -> Vec<BoundaryEdge> {
    let sorted = |a: usize, b: usize| if a < b { (a, b) } else { (b, a) };
    let local_edges = |triangle: &[usize; 3]| {
        let [a, b, c] = *triangle;
        [[a, b], [b, c], [c, a]]
    };

    let mut counts = FxHashMap::default();
    for triangle in connectivity {
        for [a, b] in local_edges(triangle) {
            *counts.entry(sorted(a, b)).or_insert(0usize) += 1;
        }
    }

    // Visit edges in element order for a deterministic ordering
    let mut boundary_edges = Vec::new();
    for (element, triangle) in connectivity.iter().enumerate() {
        for [a, b] in local_edges(triangle) {
            if counts[&sorted(a, b)] == 1 {
                boundary_edges.push(BoundaryEdge {
                    vertices: [a, b],
                    element,
                    marker: DEFAULT_BOUNDARY_MARKER.to_string(),
                });
            }
        }
    }
    boundary_edges
}

/// Uniform triangulation of `[0, 1]^2` with `cells_per_dim` squares per direction, each split
/// into two triangles.
///
/// Boundary edges are marked `"bottom"`, `"right"`, `"top"` and `"left"`.
pub fn create_unit_square_uniform_tri_mesh_2d(cells_per_dim: usize) -> TriangleMesh {
    if cells_per_dim == 0 {
        return TriangleMesh::from_vertices_and_connectivity(Vec::new(), Vec::new());
    }

    let n = cells_per_dim;
    let h = 1.0 / n as f64;
    let vertex_index = |i: usize, j: usize| (n + 1) * j + i;

    let mut vertices = Vec::with_capacity((n + 1) * (n + 1));
    for j in 0..=n {
        for i in 0..=n {
            vertices.push(Point2::new(i as f64 * h, j as f64 * h));
        }
    }

    let mut connectivity = Vec::with_capacity(2 * n * n);
    for j in 0..n {
        for i in 0..n {
            let a = vertex_index(i, j);
            let b = vertex_index(i + 1, j);
            let c = vertex_index(i + 1, j + 1);
            let d = vertex_index(i, j + 1);
            connectivity.push([a, b, c]);
            connectivity.push([a, c, d]);
        }
    }

    let mut mesh = TriangleMesh::from_vertices_and_connectivity(vertices, connectivity);
    let eps = 0.25 * h;
    mesh.mark_boundary_edges(|a, b| {
        let mid = nalgebra::center(a, b);
        let name = if mid.y < eps {
            "bottom"
        } else if mid.x > 1.0 - eps {
            "right"
        } else if mid.y > 1.0 - eps {
            "top"
        } else {
            "left"
        };
        Some(name.to_string())
    });
    mesh
}
