//! Raster mask to polygon tracing.
//!
//! Regions are 4-connected groups of `true` pixels. Each region yields one
//! polygon whose rings run along pixel edges; background pixels enclosed by a
//! region become holes. Where two pixels of a region only touch at a corner the
//! boundary is pinched there, so diagonal neighbours never merge. A boundary
//! that touches itself at such a corner is split into an exterior ring and a
//! hole meeting at that single point.

use crate::readers::GeoProfile;
use geo::{AffineOps, Area, LineString, Polygon};
use ndarray::Array2;
use std::collections::{HashMap, VecDeque};

/// Pixel corner as `(col, row)`; `(0, 0)` is the top-left corner of the grid.
type Vertex = (usize, usize);

#[derive(Debug, Clone, Copy)]
struct Edge {
    from: Vertex,
    to: Vertex,
}

impl Edge {
    fn direction(&self) -> (i64, i64) {
        (
            self.to.0 as i64 - self.from.0 as i64,
            self.to.1 as i64 - self.from.1 as i64,
        )
    }
}

fn neighbours(
    row: usize,
    col: usize,
    rows: usize,
    cols: usize,
) -> impl Iterator<Item = (usize, usize)> {
    [
        (row.wrapping_sub(1), col),
        (row + 1, col),
        (row, col.wrapping_sub(1)),
        (row, col + 1),
    ]
    .into_iter()
    .filter(move |&(r, c)| r < rows && c < cols)
}

/// Labels 4-connected `true` regions in raster order, starting at 1.
/// Background pixels keep label 0.
pub fn label_regions(mask: &Array2<bool>) -> (Array2<usize>, usize) {
    let (rows, cols) = mask.dim();
    let mut labels = Array2::<usize>::zeros((rows, cols));
    let mut count = 0;
    let mut queue = VecDeque::new();

    for row in 0..rows {
        for col in 0..cols {
            if !mask[[row, col]] || labels[[row, col]] != 0 {
                continue;
            }

            count += 1;
            labels[[row, col]] = count;
            queue.push_back((row, col));

            while let Some((r, c)) = queue.pop_front() {
                for (nr, nc) in neighbours(r, c, rows, cols) {
                    if mask[[nr, nc]] && labels[[nr, nc]] == 0 {
                        labels[[nr, nc]] = count;
                        queue.push_back((nr, nc));
                    }
                }
            }
        }
    }

    (labels, count)
}

/// Traces every `true` region of `mask` into a polygon in pixel space
/// (`x` = column, `y` = row), in raster order of each region's first pixel.
pub fn trace_polygons(mask: &Array2<bool>) -> Vec<Polygon<f64>> {
    let (labels, count) = label_regions(mask);
    if count == 0 {
        return Vec::new();
    }

    let (rows, cols) = labels.dim();
    let mut edges: Vec<Vec<Edge>> = vec![Vec::new(); count];
    let differs = |row: Option<usize>, col: Option<usize>, label: usize| match (row, col) {
        (Some(r), Some(c)) if r < rows && c < cols => labels[[r, c]] != label,
        _ => true,
    };

    // Boundary edges run clockwise around each pixel, keeping the region on
    // their right-hand side (rows grow downwards).
    for ((row, col), &label) in labels.indexed_iter() {
        if label == 0 {
            continue;
        }
        let region = &mut edges[label - 1];

        if differs(row.checked_sub(1), Some(col), label) {
            region.push(Edge {
                from: (col, row),
                to: (col + 1, row),
            });
        }
        if differs(Some(row), Some(col + 1), label) {
            region.push(Edge {
                from: (col + 1, row),
                to: (col + 1, row + 1),
            });
        }
        if differs(Some(row + 1), Some(col), label) {
            region.push(Edge {
                from: (col + 1, row + 1),
                to: (col, row + 1),
            });
        }
        if differs(Some(row), col.checked_sub(1), label) {
            region.push(Edge {
                from: (col, row + 1),
                to: (col, row),
            });
        }
    }

    edges
        .iter()
        .filter_map(|region| assemble_polygon(trace_rings(region)))
        .collect()
}

fn trace_rings(edges: &[Edge]) -> Vec<Vec<Vertex>> {
    let mut outgoing: HashMap<Vertex, Vec<usize>> = HashMap::new();
    for (i, edge) in edges.iter().enumerate() {
        outgoing.entry(edge.from).or_default().push(i);
    }

    let mut used = vec![false; edges.len()];
    let mut rings = Vec::new();

    for start in 0..edges.len() {
        if used[start] {
            continue;
        }

        let mut ring = Vec::new();
        let mut current = start;
        loop {
            used[current] = true;
            ring.push(edges[current].from);
            match next_edge(edges, &outgoing, current) {
                Some(next) if next != start && !used[next] => current = next,
                _ => break,
            }
        }

        rings.extend(split_at_pinches(ring).into_iter().map(simplify_ring));
    }

    rings
}

// A closed walk that comes back to a vertex before its end is cut there into
// separate loops, so no ring visits a vertex twice.
fn split_at_pinches(ring: Vec<Vertex>) -> Vec<Vec<Vertex>> {
    let mut loops = Vec::new();
    let mut path: Vec<Vertex> = Vec::with_capacity(ring.len());
    let mut position: HashMap<Vertex, usize> = HashMap::new();

    for vertex in ring {
        if let Some(&start) = position.get(&vertex) {
            let closed: Vec<Vertex> = path.drain(start..).collect();
            for v in &closed {
                position.remove(v);
            }
            loops.push(closed);
        }
        position.insert(vertex, path.len());
        path.push(vertex);
    }
    loops.push(path);

    loops
}

// At a pinch vertex two edges leave; the right turn keeps to the current pixel.
fn next_edge(
    edges: &[Edge],
    outgoing: &HashMap<Vertex, Vec<usize>>,
    current: usize,
) -> Option<usize> {
    let edge = edges[current];
    let candidates = outgoing.get(&edge.to)?;
    if let [only] = candidates.as_slice() {
        return Some(*only);
    }

    let (dx, dy) = edge.direction();
    let right_turn = (-dy, dx);
    candidates
        .iter()
        .copied()
        .find(|&i| edges[i].direction() == right_turn)
}

/// Drops vertices in the middle of straight runs and closes the ring.
fn simplify_ring(ring: Vec<Vertex>) -> Vec<Vertex> {
    let n = ring.len();
    let direction = |a: Vertex, b: Vertex| {
        (
            (b.0 as i64 - a.0 as i64).signum(),
            (b.1 as i64 - a.1 as i64).signum(),
        )
    };

    let mut simplified: Vec<Vertex> = (0..n)
        .filter(|&i| {
            let prev = ring[(i + n - 1) % n];
            let next = ring[(i + 1) % n];
            direction(prev, ring[i]) != direction(ring[i], next)
        })
        .map(|i| ring[i])
        .collect();

    if let Some(&first) = simplified.first() {
        simplified.push(first);
    }
    simplified
}

fn assemble_polygon(rings: Vec<Vec<Vertex>>) -> Option<Polygon<f64>> {
    // Exterior rings run with positive signed area in (col, row) space and
    // holes with negative area.
    let mut rings: Vec<Polygon<f64>> = rings
        .into_iter()
        .map(|ring| {
            let line: LineString<f64> = ring
                .into_iter()
                .map(|(col, row)| (col as f64, row as f64))
                .collect();
            Polygon::new(line, Vec::new())
        })
        .collect();

    let outer = rings
        .iter()
        .enumerate()
        .max_by(|(_, a), (_, b)| a.signed_area().total_cmp(&b.signed_area()))
        .map(|(i, _)| i)?;
    let (exterior, _) = rings.swap_remove(outer).into_inner();
    let holes = rings
        .into_iter()
        .map(|ring| ring.into_inner().0)
        .collect();

    Some(Polygon::new(exterior, holes))
}

/// Polygons of `mask` in the map coordinates of `profile`.
pub fn polygonize(mask: &Array2<bool>, profile: &GeoProfile) -> Vec<Polygon<f64>> {
    let transform = profile.pixel_to_map();
    trace_polygons(mask)
        .iter()
        .map(|polygon| polygon.affine_transform(&transform))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use gdal::raster::GdalDataType;
    use ndarray::array;

    fn corners(ring: &LineString<f64>) -> Vec<(f64, f64)> {
        ring.coords().map(|c| (c.x, c.y)).collect()
    }

    #[test]
    fn test_single_pixel() {
        let polygons = trace_polygons(&array![[true]]);

        assert_eq!(polygons.len(), 1);
        assert_eq!(
            corners(polygons[0].exterior()),
            vec![(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0), (0.0, 0.0)]
        );
        assert!(polygons[0].interiors().is_empty());
        assert_eq!(polygons[0].unsigned_area(), 1.0);
    }

    #[test]
    fn test_empty_mask_has_no_polygons() {
        let mask = Array2::from_elem((4, 4), false);
        assert!(trace_polygons(&mask).is_empty());
    }

    #[test]
    fn test_block_is_simplified_to_corners() {
        let mask = Array2::from_elem((3, 4), true);
        let polygons = trace_polygons(&mask);

        assert_eq!(polygons.len(), 1);
        assert_eq!(
            corners(polygons[0].exterior()),
            vec![(0.0, 0.0), (4.0, 0.0), (4.0, 3.0), (0.0, 3.0), (0.0, 0.0)]
        );
        assert_eq!(polygons[0].unsigned_area(), 12.0);
    }

    #[test]
    fn test_enclosed_background_becomes_hole() {
        let mask = array![
            [true, true, true],
            [true, false, true],
            [true, true, true]
        ];
        let polygons = trace_polygons(&mask);

        assert_eq!(polygons.len(), 1);
        assert_eq!(polygons[0].interiors().len(), 1);
        assert_eq!(polygons[0].interiors()[0].0.len(), 5);
        assert_eq!(polygons[0].unsigned_area(), 8.0);
    }

    #[test]
    fn test_diagonal_pixels_stay_separate() {
        let mask = array![[true, false], [false, true]];
        let polygons = trace_polygons(&mask);

        assert_eq!(polygons.len(), 2);
        assert!(
            polygons
                .iter()
                .all(|p| p.unsigned_area() == 1.0 && p.interiors().is_empty())
        );
    }

    #[test]
    fn test_pinched_boundary_splits_into_touching_hole() {
        // (0, 1) and (1, 2) touch only at a corner but belong to the same
        // region through the left and bottom pixels. The background pixel
        // in the middle is cut off from the outside at that corner.
        let mask = array![
            [true, true, false],
            [true, false, true],
            [true, true, true]
        ];
        let polygons = trace_polygons(&mask);

        assert_eq!(polygons.len(), 1);
        let polygon = &polygons[0];
        assert_eq!(polygon.interiors().len(), 1);
        assert_eq!(polygon.unsigned_area(), 7.0);

        // Closed rings repeat their first corner, so count on the open part
        let visits = |ring: &LineString<f64>| {
            let ring = corners(ring);
            ring[..ring.len() - 1]
                .iter()
                .filter(|&&v| v == (2.0, 1.0))
                .count()
        };
        assert_eq!(visits(polygon.exterior()), 1);
        assert_eq!(visits(&polygon.interiors()[0]), 1);
        assert_eq!(
            Polygon::new(polygon.interiors()[0].clone(), Vec::new()).unsigned_area(),
            1.0
        );
    }

    #[test]
    fn test_no_ring_repeats_a_vertex() {
        let mask = array![
            [true, false, true, false],
            [false, true, true, true],
            [true, true, false, true],
            [false, true, true, false]
        ];

        for polygon in trace_polygons(&mask) {
            for ring in std::iter::once(polygon.exterior()).chain(polygon.interiors()) {
                let open = &ring.0[..ring.0.len() - 1];
                for (i, a) in open.iter().enumerate() {
                    assert!(open[i + 1..].iter().all(|b| b != a), "{:?}", ring);
                }
            }
        }
    }

    #[test]
    fn test_label_regions_in_raster_order() {
        let mask = array![[false, true, false, true], [true, true, false, false]];
        let (labels, count) = label_regions(&mask);

        assert_eq!(count, 2);
        assert_eq!(labels, array![[0, 1, 0, 2], [1, 1, 0, 0]]);
    }

    #[test]
    fn test_polygonize_uses_geotransform() {
        let profile = GeoProfile {
            width: 1,
            height: 1,
            transform: [100.0, 10.0, 0.0, 200.0, 0.0, -10.0],
            crs_wkt: String::new(),
            nodata: None,
            data_type: GdalDataType::UInt8,
            count: 1,
        };
        let polygons = polygonize(&array![[true]], &profile);

        assert_eq!(
            corners(polygons[0].exterior()),
            vec![
                (100.0, 200.0),
                (110.0, 200.0),
                (110.0, 190.0),
                (100.0, 190.0),
                (100.0, 200.0)
            ]
        );
        assert_eq!(polygons[0].unsigned_area(), 100.0);
    }
}
