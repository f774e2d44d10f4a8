//! TIN (Triangulated Irregular Network)
//!
//! Incremental Delaunay triangulation (Bowyer-Watson) over 2-D points.
//!
//! The convex hull is closed with *ghost triangles*: every hull edge `a -> b`
//! (exterior on its left) carries a triangle `(a, b, GHOST)`. With ghosts every
//! real edge has a neighbour on both sides, so point location and cavity
//! search never need special cases for the hull.
//!
//! Point location runs through a Delaunay hierarchy: every vertex is copied
//! one level up with probability `1 / LEVEL_RATIO`, and a walk descends from
//! the sparsest level, so an insertion in any order costs `O(log n)` walk
//! steps on average.
//!
//! Coordinates are stored relative to the first inserted point.

use lidem_core::{Error, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;

/// Index of a vertex, in insertion order of distinct locations
pub type VertexId = usize;

/// Index of a triangle slot
pub type TriId = usize;

const GHOST: VertexId = usize::MAX;

/// Relative tolerance for "on a hull edge"
const HULL_EPS: f64 = 1e-12;

/// A vertex reaches the next hierarchy level with probability `1 / LEVEL_RATIO`
const LEVEL_RATIO: u32 = 30;

/// Levels above the full triangulation
const MAX_LEVELS: usize = 4;

const HIERARCHY_SEED: u64 = 0x71D0_5EED;

/// A triangle, counter-clockwise for real triangles.
///
/// `n[i]` is the neighbour across the edge opposite `v[i]`, that is the edge
/// `v[i + 1] -> v[i + 2]`. Ghost triangles keep the ghost vertex at `v[2]`.
#[derive(Debug, Clone, Copy)]
struct Triangle {
    v: [VertexId; 3],
    n: [TriId; 3],
}

impl Triangle {
    #[inline]
    fn is_ghost(&self) -> bool {
        self.v[2] == GHOST
    }

    #[inline]
    fn index_of(&self, v: VertexId) -> Option<usize> {
        self.v.iter().position(|&x| x == v)
    }

    fn rotate_left(&mut self) {
        self.v.rotate_left(1);
        self.n.rotate_left(1);
    }

    fn rotate_right(&mut self) {
        self.v.rotate_right(1);
        self.n.rotate_right(1);
    }
}

/// Starting face for a point location walk.
///
/// Any value is safe to pass back to the triangulation that produced it;
/// a stale hint only costs a longer walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FaceHint(pub(crate) TriId);

/// Result of a point location
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Location {
    /// Coincides with an existing vertex
    OnVertex(VertexId, TriId),
    /// Inside or on the boundary of a real triangle
    Inside(TriId),
    /// Strictly outside the hull, seen from this ghost triangle's hull edge
    Outside(TriId),
}

impl Location {
    fn face(self) -> TriId {
        match self {
            Location::OnVertex(_, t) | Location::Inside(t) | Location::Outside(t) => t,
        }
    }
}

/// Natural-neighbour coordinates of a query location
#[derive(Debug, Clone, PartialEq)]
pub struct NaturalCoordinates {
    /// Neighbours with weights summing to one
    pub neighbors: Vec<(VertexId, f64)>,
    /// Face reached by the location walk, reusable as the next hint
    pub face: FaceHint,
}

#[inline]
fn orient(a: [f64; 2], b: [f64; 2], c: [f64; 2]) -> f64 {
    (b[0] - a[0]) * (c[1] - a[1]) - (b[1] - a[1]) * (c[0] - a[0])
}

/// Positive when `d` lies inside the circumcircle of counter-clockwise `a, b, c`
#[inline]
fn incircle(a: [f64; 2], b: [f64; 2], c: [f64; 2], d: [f64; 2]) -> f64 {
    let (adx, ady) = (a[0] - d[0], a[1] - d[1]);
    let (bdx, bdy) = (b[0] - d[0], b[1] - d[1]);
    let (cdx, cdy) = (c[0] - d[0], c[1] - d[1]);
    let ad = adx * adx + ady * ady;
    let bd = bdx * bdx + bdy * bdy;
    let cd = cdx * cdx + cdy * cdy;
    adx * (bdy * cd - bd * cdy) - ady * (bdx * cd - bd * cdx) + ad * (bdx * cdy - bdy * cdx)
}

#[inline]
fn dist_sq(a: [f64; 2], b: [f64; 2]) -> f64 {
    let (dx, dy) = (b[0] - a[0], b[1] - a[1]);
    dx * dx + dy * dy
}

/// `p` strictly between `a` and `b`, assuming the three are collinear
#[inline]
fn strictly_between(a: [f64; 2], b: [f64; 2], p: [f64; 2]) -> bool {
    let ab = [b[0] - a[0], b[1] - a[1]];
    let dot_a = (p[0] - a[0]) * ab[0] + (p[1] - a[1]) * ab[1];
    let dot_b = (b[0] - p[0]) * ab[0] + (b[1] - p[1]) * ab[1];
    dot_a > 0.0 && dot_b > 0.0
}

/// Circumcentre of `a, b, c`, `None` for a degenerate triangle
fn circumcenter(a: [f64; 2], b: [f64; 2], c: [f64; 2]) -> Option<[f64; 2]> {
    let d = 2.0 * (a[0] * (b[1] - c[1]) + b[0] * (c[1] - a[1]) + c[0] * (a[1] - b[1]));
    if d == 0.0 {
        return None;
    }
    let a2 = a[0] * a[0] + a[1] * a[1];
    let b2 = b[0] * b[0] + b[1] * b[1];
    let c2 = c[0] * c[0] + c[1] * c[1];
    let ux = (a2 * (b[1] - c[1]) + b2 * (c[1] - a[1]) + c2 * (a[1] - b[1])) / d;
    let uy = (a2 * (c[0] - b[0]) + b2 * (a[0] - c[0]) + c2 * (b[0] - a[0])) / d;
    (ux.is_finite() && uy.is_finite()).then_some([ux, uy])
}

fn polygon_area(poly: &[[f64; 2]]) -> f64 {
    let n = poly.len();
    let twice: f64 = (0..n)
        .map(|i| {
            let (p, q) = (poly[i], poly[(i + 1) % n]);
            p[0] * q[1] - q[0] * p[1]
        })
        .sum();
    (twice / 2.0).abs()
}

/// Barycentric coordinates of `p` in triangle `a, b, c`
fn barycentric(p: [f64; 2], a: [f64; 2], b: [f64; 2], c: [f64; 2]) -> Option<[f64; 3]> {
    let area = orient(a, b, c);
    if area == 0.0 {
        return None;
    }
    let u = orient(p, b, c) / area;
    let v = orient(a, p, c) / area;
    Some([u, v, 1.0 - u - v])
}

/// A cavity edge, oriented as in the cavity triangle that owns it
#[derive(Debug, Clone, Copy)]
struct BoundaryEdge {
    from: VertexId,
    to: VertexId,
    inner: TriId,
    outer: TriId,
}

/// One level of the hierarchy: a complete Delaunay triangulation of its points
#[derive(Debug, Clone, Default)]
struct Mesh {
    points: Vec<[f64; 2]>,
    triangles: Vec<Triangle>,
    /// A triangle touching each vertex, refreshed on every retriangulation
    incident: Vec<TriId>,
    /// Vertices waiting for a first non-collinear triple
    pending: Vec<VertexId>,
    pending_index: HashMap<(u64, u64), VertexId>,
    last: TriId,
}

/// An upper level and the vertex each of its points copies one level down
#[derive(Debug, Clone, Default)]
struct Level {
    mesh: Mesh,
    down: Vec<VertexId>,
}

/// Incremental Delaunay triangulation
#[derive(Debug, Clone)]
pub struct Tin {
    origin: Option<[f64; 2]>,
    base: Mesh,
    upper: Vec<Level>,
    rng: StdRng,
}

impl Default for Tin {
    fn default() -> Self {
        Self {
            origin: None,
            base: Mesh::default(),
            upper: Vec::new(),
            rng: StdRng::seed_from_u64(HIERARCHY_SEED),
        }
    }
}

impl Tin {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct point locations inserted
    pub fn number_of_points(&self) -> usize {
        self.base.points.len()
    }

    /// Number of finite triangles
    pub fn number_of_triangles(&self) -> usize {
        self.base.triangles.iter().filter(|t| !t.is_ghost()).count()
    }

    /// Affine dimension of the point set: 0 (at most one point), 1 (collinear) or 2
    pub fn dimension(&self) -> u8 {
        if !self.base.triangles.is_empty() {
            2
        } else if self.base.points.len() > 1 {
            1
        } else {
            0
        }
    }

    /// Absolute coordinates of a vertex
    pub fn point(&self, v: VertexId) -> Option<(f64, f64)> {
        let o = self.origin?;
        self.base.points.get(v).map(|p| (p[0] + o[0], p[1] + o[1]))
    }

    fn relative(&self, x: f64, y: f64) -> [f64; 2] {
        let o = self.origin.unwrap_or([x, y]);
        // `+ 0.0` folds -0.0 into 0.0 for the duplicate index
        [x - o[0] + 0.0, y - o[1] + 0.0]
    }

    /// Insert a location, returning its vertex.
    ///
    /// Inserting an existing location returns the existing vertex.
    pub fn insert(&mut self, x: f64, y: f64) -> Result<VertexId> {
        if !x.is_finite() || !y.is_finite() {
            return Err(Error::invalid_parameter(
                "point",
                format!("({}, {})", x, y),
                "coordinates must be finite",
            ));
        }
        if self.origin.is_none() {
            self.origin = Some([x, y]);
        }
        let p = self.relative(x, y);

        let (hint, faces) = self.descend(p);
        let (id, created) = self.base.insert(p, hint);
        if created {
            self.promote(id, p, &faces);
        }
        Ok(id)
    }

    /// Walk down the upper levels towards `p`.
    ///
    /// Returns the start face for the full triangulation and the face
    /// reached on every upper level.
    fn descend(&self, p: [f64; 2]) -> (Option<TriId>, Vec<Option<TriId>>) {
        let mut faces = vec![None; self.upper.len()];
        let mut hint = None;
        for i in (0..self.upper.len()).rev() {
            let level = &self.upper[i];
            if level.mesh.triangles.is_empty() {
                hint = None;
                continue;
            }
            let below = if i == 0 { &self.base } else { &self.upper[i - 1].mesh };
            let (location, _) = level.mesh.walk(p, hint);
            faces[i] = Some(location.face());
            hint = level
                .mesh
                .nearest_vertex(p, location)
                .and_then(|v| level.down.get(v))
                .and_then(|&v| below.vertex_hint(v));
        }
        (hint, faces)
    }

    /// Copy a new vertex up the hierarchy for as long as the draw allows
    fn promote(&mut self, id: VertexId, p: [f64; 2], faces: &[Option<TriId>]) {
        let mut below = id;
        for i in 0..MAX_LEVELS {
            if !self.rng.gen_ratio(1, LEVEL_RATIO) {
                break;
            }
            if i == self.upper.len() {
                self.upper.push(Level::default());
            }
            let level = &mut self.upper[i];
            let (up, created) = level.mesh.insert(p, faces.get(i).copied().flatten());
            if !created {
                break;
            }
            debug_assert_eq!(up, level.down.len());
            level.down.push(below);
            below = up;
        }
    }

    /// Linear weights of `p` on segment `a -> b` if it lies on it
    fn on_segment(&self, a: VertexId, b: VertexId, p: [f64; 2]) -> Option<Vec<(VertexId, f64)>> {
        let (pa, pb) = (self.base.points[a], self.base.points[b]);
        let len2 = dist_sq(pa, pb);
        if orient(pa, pb, p).abs() > HULL_EPS * len2 {
            return None;
        }
        let t = ((p[0] - pa[0]) * (pb[0] - pa[0]) + (p[1] - pa[1]) * (pb[1] - pa[1])) / len2;
        if !(0.0..=1.0).contains(&t) {
            return None;
        }
        Some(vec![(a, 1.0 - t), (b, t)])
    }

    /// Natural-neighbour (Sibson) coordinates of `(x, y)`.
    ///
    /// Data sites get weight one on themselves; locations on a hull edge
    /// interpolate linearly between the edge end points. Fails with
    /// `InsufficientData` outside the convex hull or before the points span
    /// a plane.
    pub fn natural_coordinates(
        &self,
        x: f64,
        y: f64,
        hint: Option<FaceHint>,
    ) -> Result<NaturalCoordinates> {
        let mesh = &self.base;
        if mesh.triangles.is_empty() {
            return Err(Error::InsufficientData(format!(
                "{} point(s) inserted, at least 3 non-collinear points are needed",
                mesh.points.len()
            )));
        }
        let p = self.relative(x, y);
        let start = match hint {
            Some(h) => Some(h.0),
            None => self.descend(p).0,
        };
        match mesh.locate(p, start) {
            Location::OnVertex(v, t) => Ok(NaturalCoordinates {
                neighbors: vec![(v, 1.0)],
                face: FaceHint(t),
            }),
            Location::Outside(g) => {
                let tri = &mesh.triangles[g];
                match self.on_segment(tri.v[0], tri.v[1], p) {
                    Some(neighbors) => Ok(NaturalCoordinates {
                        neighbors,
                        face: FaceHint(tri.n[2]),
                    }),
                    None => Err(Error::InsufficientData(format!(
                        "({:.3}, {:.3}) lies outside the convex hull",
                        x, y
                    ))),
                }
            }
            Location::Inside(t) => {
                let tri = &mesh.triangles[t];
                for i in 0..3 {
                    if !mesh.triangles[tri.n[i]].is_ghost() {
                        continue;
                    }
                    if let Some(neighbors) =
                        self.on_segment(tri.v[(i + 1) % 3], tri.v[(i + 2) % 3], p)
                    {
                        return Ok(NaturalCoordinates {
                            neighbors,
                            face: FaceHint(t),
                        });
                    }
                }
                let neighbors = mesh
                    .sibson(p, t)
                    .or_else(|| mesh.linear(p, t))
                    .ok_or_else(|| {
                        Error::InsufficientData(format!(
                            "degenerate neighbourhood at ({:.3}, {:.3})",
                            x, y
                        ))
                    })?;
                Ok(NaturalCoordinates {
                    neighbors,
                    face: FaceHint(t),
                })
            }
        }
    }
}

impl Mesh {
    fn push_point(&mut self, p: [f64; 2]) -> VertexId {
        let id = self.points.len();
        self.points.push(p);
        self.incident.push(0);
        id
    }

    /// Insert `p`, walking from `hint`; `true` when the vertex is new
    fn insert(&mut self, p: [f64; 2], hint: Option<TriId>) -> (VertexId, bool) {
        if self.triangles.is_empty() {
            return self.insert_pending(p);
        }
        let start = match self.locate(p, hint) {
            Location::OnVertex(v, _) => return (v, false),
            Location::Inside(t) | Location::Outside(t) => t,
        };
        let id = self.push_point(p);
        self.insert_vertex(id, start);
        (id, true)
    }

    /// Start face next to vertex `v`
    fn vertex_hint(&self, v: VertexId) -> Option<TriId> {
        self.incident.get(v).copied().filter(|&t| t < self.triangles.len())
    }

    /// Vertex of the located face closest to `p`
    fn nearest_vertex(&self, p: [f64; 2], location: Location) -> Option<VertexId> {
        match location {
            Location::OnVertex(v, _) => Some(v),
            Location::Inside(t) | Location::Outside(t) => self.triangles[t]
                .v
                .iter()
                .copied()
                .filter(|&v| v != GHOST)
                .min_by(|&a, &b| {
                    dist_sq(self.points[a], p).total_cmp(&dist_sq(self.points[b], p))
                }),
        }
    }

    fn insert_pending(&mut self, p: [f64; 2]) -> (VertexId, bool) {
        let key = (p[0].to_bits(), p[1].to_bits());
        if let Some(&id) = self.pending_index.get(&key) {
            return (id, false);
        }
        let id = self.push_point(p);
        self.pending.push(id);
        self.pending_index.insert(key, id);

        // Earlier pending points are collinear, so only the new one can
        // complete a proper triangle with any two of them.
        if self.pending.len() >= 3 {
            let (a, b) = (self.pending[0], self.pending[1]);
            if orient(self.points[a], self.points[b], p) != 0.0 {
                self.bootstrap(a, b, id);
            }
        }
        (id, true)
    }

    /// First triangle plus its three ghosts, then the buffered points
    fn bootstrap(&mut self, a: VertexId, b: VertexId, c: VertexId) {
        let (b, c) = if orient(self.points[a], self.points[b], self.points[c]) > 0.0 {
            (b, c)
        } else {
            (c, b)
        };
        // 0: (a, b, c); 1: ghost on a->b; 2: ghost on b->c; 3: ghost on c->a
        self.triangles = vec![
            Triangle {
                v: [a, b, c],
                n: [2, 3, 1],
            },
            Triangle {
                v: [b, a, GHOST],
                n: [3, 2, 0],
            },
            Triangle {
                v: [c, b, GHOST],
                n: [1, 3, 0],
            },
            Triangle {
                v: [a, c, GHOST],
                n: [2, 1, 0],
            },
        ];
        self.last = 0;
        for v in [a, b, c] {
            self.incident[v] = 0;
        }

        let rest: Vec<VertexId> = std::mem::take(&mut self.pending)
            .into_iter()
            .filter(|&v| v != a && v != b && v != c)
            .collect();
        self.pending_index = HashMap::new();
        for v in rest {
            let start = match self.locate(self.points[v], None) {
                Location::OnVertex(..) => continue,
                Location::Inside(t) | Location::Outside(t) => t,
            };
            self.insert_vertex(v, start);
        }
    }

    fn conflicts(&self, t: TriId, p: [f64; 2]) -> bool {
        let tri = &self.triangles[t];
        let a = self.points[tri.v[0]];
        let b = self.points[tri.v[1]];
        if tri.is_ghost() {
            let o = orient(a, b, p);
            o > 0.0 || (o == 0.0 && strictly_between(a, b, p))
        } else {
            incircle(a, b, self.points[tri.v[2]], p) > 0.0
        }
    }

    /// Triangles whose circumcircle contains `p`, grown from `start`
    fn cavity(&self, p: [f64; 2], start: TriId) -> (Vec<TriId>, Vec<BoundaryEdge>) {
        let mut cavity = vec![start];
        let mut boundary = Vec::new();
        let mut i = 0;
        while i < cavity.len() {
            let t = cavity[i];
            let tri = self.triangles[t];
            for k in 0..3 {
                let nb = tri.n[k];
                if cavity.contains(&nb) {
                    continue;
                }
                if self.conflicts(nb, p) {
                    cavity.push(nb);
                } else {
                    boundary.push(BoundaryEdge {
                        from: tri.v[(k + 1) % 3],
                        to: tri.v[(k + 2) % 3],
                        inner: t,
                        outer: nb,
                    });
                }
            }
            i += 1;
        }
        (cavity, boundary)
    }

    /// Retriangulate the cavity of vertex `id` around `start`
    fn insert_vertex(&mut self, id: VertexId, start: TriId) {
        let p = self.points[id];
        let (cavity, boundary) = self.cavity(p, start);

        let mut slots = cavity;
        while slots.len() < boundary.len() {
            slots.push(self.triangles.len());
            self.triangles.push(Triangle {
                v: [GHOST; 3],
                n: [usize::MAX; 3],
            });
        }

        // New triangle (from, to, p) per boundary edge, linked around p.
        for (e, &t) in boundary.iter().zip(&slots) {
            let next = boundary
                .iter()
                .position(|f| f.from == e.to)
                .map(|j| slots[j])
                .unwrap_or(usize::MAX);
            let prev = boundary
                .iter()
                .position(|f| f.to == e.from)
                .map(|j| slots[j])
                .unwrap_or(usize::MAX);
            self.triangles[t] = Triangle {
                v: [e.from, e.to, id],
                n: [next, prev, e.outer],
            };
            let outer = &mut self.triangles[e.outer];
            for k in 0..3 {
                if outer.v[(k + 1) % 3] == e.to && outer.v[(k + 2) % 3] == e.from {
                    outer.n[k] = t;
                }
            }
        }

        for &t in slots.iter().take(boundary.len()) {
            let tri = &mut self.triangles[t];
            if tri.v[0] == GHOST {
                tri.rotate_left();
            } else if tri.v[1] == GHOST {
                tri.rotate_right();
            } else {
                self.last = t;
            }
            for v in self.triangles[t].v {
                if v != GHOST {
                    self.incident[v] = t;
                }
            }
        }
    }

    fn classify_inside(&self, t: TriId, p: [f64; 2]) -> Location {
        let tri = &self.triangles[t];
        for &v in &tri.v {
            if self.points[v] == p {
                return Location::OnVertex(v, t);
            }
        }
        Location::Inside(t)
    }

    fn locate(&self, p: [f64; 2], hint: Option<TriId>) -> Location {
        self.walk(p, hint).0
    }

    /// Visibility walk from `hint` (or the last created triangle), with the
    /// number of triangles visited
    fn walk(&self, p: [f64; 2], hint: Option<TriId>) -> (Location, usize) {
        let mut t = hint
            .filter(|&t| t < self.triangles.len())
            .unwrap_or(self.last);
        if self.triangles[t].is_ghost() {
            t = self.triangles[t].n[2];
        }
        let max_steps = self.triangles.len() + 8;
        for step in 0..max_steps {
            let tri = &self.triangles[t];
            let mut next = None;
            for k in 0..3 {
                // Rotating the first edge tested keeps the walk from cycling.
                let i = (k + step) % 3;
                let a = self.points[tri.v[(i + 1) % 3]];
                let b = self.points[tri.v[(i + 2) % 3]];
                if orient(a, b, p) < 0.0 {
                    next = Some(tri.n[i]);
                    break;
                }
            }
            match next {
                None => return (self.classify_inside(t, p), step + 1),
                Some(nt) if self.triangles[nt].is_ghost() => {
                    return (Location::Outside(nt), step + 1);
                }
                Some(nt) => t = nt,
            }
        }
        (self.locate_exhaustive(p), max_steps)
    }

    fn locate_exhaustive(&self, p: [f64; 2]) -> Location {
        let mut outside = None;
        for (t, tri) in self.triangles.iter().enumerate() {
            let a = self.points[tri.v[0]];
            let b = self.points[tri.v[1]];
            if tri.is_ghost() {
                if outside.is_none() && orient(a, b, p) > 0.0 {
                    outside = Some(t);
                }
            } else if orient(a, b, p) >= 0.0
                && orient(b, self.points[tri.v[2]], p) >= 0.0
                && orient(self.points[tri.v[2]], a, p) >= 0.0
            {
                return self.classify_inside(t, p);
            }
        }
        let ghost = outside
            .or_else(|| self.triangles.iter().position(Triangle::is_ghost))
            .unwrap_or(0);
        Location::Outside(ghost)
    }

    fn linear(&self, p: [f64; 2], t: TriId) -> Option<Vec<(VertexId, f64)>> {
        let v = self.triangles[t].v;
        let w = barycentric(p, self.points[v[0]], self.points[v[1]], self.points[v[2]])?;
        Some(vec![(v[0], w[0]), (v[1], w[1]), (v[2], w[2])])
    }

    /// Sibson weights: the area each neighbour's Voronoi cell would lose to `p`
    fn sibson(&self, p: [f64; 2], t: TriId) -> Option<Vec<(VertexId, f64)>> {
        let (cavity, boundary) = self.cavity(p, t);
        if boundary.iter().any(|e| e.from == GHOST || e.to == GHOST) {
            return None;
        }

        // Order the boundary counter-clockwise: x_k -> x_{k+1}
        let mut ring = Vec::with_capacity(boundary.len());
        let mut current = *boundary.first()?;
        for _ in 0..boundary.len() {
            ring.push(current);
            current = *boundary.iter().find(|e| e.from == current.to)?;
        }
        if current.from != ring[0].from {
            return None;
        }

        // Everything relative to p
        let rel = |v: VertexId| {
            let q = self.points[v];
            [q[0] - p[0], q[1] - p[1]]
        };
        let origin = [0.0, 0.0];
        let new_centers: Vec<[f64; 2]> = ring
            .iter()
            .map(|e| circumcenter(rel(e.from), rel(e.to), origin))
            .collect::<Option<_>>()?;

        let n = ring.len();
        let mut weights = Vec::with_capacity(n);
        let mut total = 0.0;
        let mut polygon = Vec::new();
        for k in 0..n {
            let incoming = ring[(k + n - 1) % n];
            let outgoing = ring[k];
            let v = outgoing.from;

            polygon.clear();
            polygon.push(new_centers[(k + n - 1) % n]);
            let mut tri_id = incoming.inner;
            for _ in 0..=cavity.len() {
                let tri = &self.triangles[tri_id];
                polygon.push(circumcenter(rel(tri.v[0]), rel(tri.v[1]), rel(tri.v[2]))?);
                if tri_id == outgoing.inner {
                    break;
                }
                let j = tri.index_of(v)?;
                tri_id = tri.n[(j + 2) % 3];
            }
            polygon.push(new_centers[k]);

            let area = polygon_area(&polygon);
            total += area;
            weights.push((v, area));
        }

        if !(total > 0.0) || !total.is_finite() {
            return None;
        }
        for w in &mut weights {
            w.1 /= total;
        }
        Some(weights)
    }
}
