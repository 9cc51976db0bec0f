//! Hierarchical navigable small-world engine.
//!
//! One vertex table shared by reference across a stack of layers; each
//! layer owns only its member list and adjacency. Layer 0 holds every
//! inserted vertex, layer `l > 0` holds the vertices whose sampled level
//! reached `l`. Graph logic is parameterized by distance closures so the
//! blob-backed engine and the in-memory baseline drive the same code.

use crate::distance::{distance_blob, distance_vec_blob};
use crate::VectorIndex;
use blobvec_core::{HnswConfig, Result};
use blobvec_store::{BlobAdapter, BlobState, VectorAdapter};
use ordered_float::OrderedFloat;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use smallvec::SmallVec;
use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, HashSet};
use tracing::{debug, info};

/// Heap entry ordered so the default `BinaryHeap` pops the smallest
/// distance first; wrap in `Reverse` for a worst-first heap.
#[derive(Debug, Copy, Clone, PartialEq)]
struct Candidate {
    distance: f32,
    vertex: usize,
}

impl Eq for Candidate {}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .distance
            .partial_cmp(&self.distance)
            .unwrap_or(Ordering::Equal)
            .then_with(|| other.vertex.cmp(&self.vertex))
    }
}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// One navigable small-world layer: its member vertices in insertion order
/// and a dense vertex-id → neighbor-list adjacency.
#[derive(Debug, Default)]
pub struct NswLayer {
    in_vertices: Vec<usize>,
    edges: Vec<SmallVec<[usize; 8]>>,
}

impl NswLayer {
    pub fn in_vertices(&self) -> &[usize] {
        &self.in_vertices
    }

    pub fn neighbors(&self, vertex: usize) -> &[usize] {
        self.edges.get(vertex).map_or(&[], SmallVec::as_slice)
    }

    /// First vertex ever inserted into this layer.
    fn default_entry_point(&self) -> usize {
        self.in_vertices[0]
    }

    fn add_vertex(&mut self, vertex: usize, expected_vertices: usize) {
        if self.edges.is_empty() {
            self.edges.reserve(expected_vertices);
        }
        if self.edges.len() <= vertex {
            self.edges.resize(vertex + 1, SmallVec::new());
        }
        self.in_vertices.push(vertex);
    }

    fn connect(&mut self, a: usize, b: usize) {
        let needed = a.max(b) + 1;
        if self.edges.len() < needed {
            self.edges.resize(needed, SmallVec::new());
        }
        self.edges[a].push(b);
        self.edges[b].push(a);
    }

    fn set_neighbors(&mut self, vertex: usize, neighbors: Vec<usize>) {
        self.edges[vertex] = SmallVec::from_vec(neighbors);
    }

    /// Greedy best-first search within this layer. Returns up to `ef`
    /// vertex ids ascending by distance.
    pub fn search_layer(
        &self,
        dist: &mut dyn FnMut(usize) -> Result<f32>,
        ef: usize,
        entry_points: &[usize],
    ) -> Result<Vec<usize>> {
        debug_assert!(ef > 0);
        let mut visited: HashSet<usize> = entry_points.iter().copied().collect();
        let mut frontier: BinaryHeap<Candidate> = BinaryHeap::new();
        let mut results: BinaryHeap<Reverse<Candidate>> = BinaryHeap::new();

        for &entry in entry_points {
            let candidate = Candidate {
                distance: dist(entry)?,
                vertex: entry,
            };
            frontier.push(candidate);
            results.push(Reverse(candidate));
        }

        while let Some(candidate) = frontier.pop() {
            let worst = results
                .peek()
                .map_or(f32::INFINITY, |Reverse(c)| c.distance);
            if candidate.distance > worst {
                break;
            }
            // A populated layer has no isolated vertices.
            debug_assert!(
                self.in_vertices.len() <= 1 || !self.neighbors(candidate.vertex).is_empty()
            );
            for &neighbor in self.neighbors(candidate.vertex) {
                if visited.insert(neighbor) {
                    let next = Candidate {
                        distance: dist(neighbor)?,
                        vertex: neighbor,
                    };
                    frontier.push(next);
                    results.push(Reverse(next));
                    while results.len() > ef {
                        results.pop();
                    }
                }
            }
        }

        let mut out: Vec<Candidate> = results.into_iter().map(|Reverse(c)| c).collect();
        out.sort_by_key(|c| (OrderedFloat(c.distance), c.vertex));
        Ok(out.into_iter().map(|c| c.vertex).collect())
    }
}

/// The `m` candidates closest to a reference payload, ascending.
pub fn select_neighbors(
    dist: &mut dyn FnMut(usize) -> Result<f32>,
    candidates: &[usize],
    m: usize,
) -> Result<Vec<usize>> {
    let mut scored = Vec::with_capacity(candidates.len());
    for &vertex in candidates {
        scored.push((OrderedFloat(dist(vertex)?), vertex));
    }
    scored.sort_unstable();
    Ok(scored.into_iter().take(m).map(|(_, v)| v).collect())
}

/// Sample a vertex level: `floor(-ln(u) * m_l)` with `u` uniform in (0, 1].
pub(crate) fn sample_level(rng: &mut StdRng, level_norm: f64) -> usize {
    let u: f64 = 1.0 - rng.gen::<f64>();
    (-u.ln() * level_norm).floor() as usize
}

/// Shared insertion driver. `dist_new(v)` is the distance from vertex `v`
/// to the vector being inserted; `dist_between(a, b)` between two inserted
/// vertices (used when pruning a neighbor's own edge list).
#[allow(clippy::too_many_arguments)]
pub(crate) fn insert_into_graph(
    layers: &mut Vec<NswLayer>,
    vertex: usize,
    total_vertices: usize,
    target_level: usize,
    config: &HnswConfig,
    dist_new: &mut dyn FnMut(usize) -> Result<f32>,
    dist_between: &mut dyn FnMut(usize, usize) -> Result<f32>,
) -> Result<()> {
    if layers[0].in_vertices().is_empty() {
        layers[0].add_vertex(vertex, total_vertices);
    } else {
        let top = layers.len() - 1;
        let mut entry_points = vec![layers[top].default_entry_point()];

        // Coarse phase: descend to the target level, carrying only the
        // single closest vertex of each layer.
        let mut level = top;
        while level > target_level {
            let nearest = layers[level].search_layer(dist_new, config.ef_search, &entry_points)?;
            entry_points = select_neighbors(dist_new, &nearest, 1)?;
            level -= 1;
        }

        // Insert phase: link into every layer from here down.
        loop {
            let nearest =
                layers[level].search_layer(dist_new, config.ef_construction, &entry_points)?;
            let neighbors = select_neighbors(dist_new, &nearest, config.m_max)?;

            layers[level].add_vertex(vertex, total_vertices);
            for &neighbor in &neighbors {
                layers[level].connect(vertex, neighbor);
            }
            for &neighbor in &neighbors {
                if layers[level].neighbors(neighbor).len() > config.m_max {
                    // Prune to the m_max closest to the neighbor itself,
                    // not to the newly inserted vector.
                    let current = layers[level].neighbors(neighbor).to_vec();
                    let pruned = select_neighbors(
                        &mut |v| dist_between(neighbor, v),
                        &current,
                        config.m_max,
                    )?;
                    layers[level].set_neighbors(neighbor, pruned);
                }
            }

            entry_points = nearest;
            if level == 0 {
                break;
            }
            level -= 1;
        }
    }

    // Grow the stack with singleton layers up to the sampled level.
    while layers.len() <= target_level {
        let mut layer = NswLayer::default();
        layer.add_vertex(vertex, total_vertices);
        layers.push(layer);
    }
    Ok(())
}

/// Shared query driver: descend the stack carrying one entry vertex, then
/// search layer 0 with budget `max(n, ef_search)` and keep the `n` closest.
pub(crate) fn query_graph(
    layers: &[NswLayer],
    config: &HnswConfig,
    n: usize,
    dist_q: &mut dyn FnMut(usize) -> Result<f32>,
) -> Result<Vec<usize>> {
    let top = layers.len() - 1;
    let mut entry_points = vec![layers[top].default_entry_point()];
    for level in (1..=top).rev() {
        let nearest = layers[level].search_layer(dist_q, config.ef_search, &entry_points)?;
        entry_points = select_neighbors(dist_q, &nearest, 1)?;
    }
    let candidates =
        layers[0].search_layer(dist_q, n.max(config.ef_search), &entry_points)?;
    select_neighbors(dist_q, &candidates, n)
}

pub struct HnswIndex {
    main_rel: VectorAdapter,
    blob: BlobAdapter,
    config: HnswConfig,
    level_norm: f64,
    vertices: Vec<BlobState>,
    layers: Vec<NswLayer>,
    rng: StdRng,
}

impl HnswIndex {
    pub fn new(main_rel: VectorAdapter, blob: BlobAdapter, config: HnswConfig) -> Result<Self> {
        config.validate()?;
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Ok(Self {
            main_rel,
            blob,
            level_norm: config.level_norm(),
            config,
            vertices: Vec::new(),
            layers: vec![NswLayer::default()],
            rng,
        })
    }

    pub fn layers(&self) -> &[NswLayer] {
        &self.layers
    }

    pub fn vertices(&self) -> &[BlobState] {
        &self.vertices
    }

    fn insert_vector_entry(&mut self, state: BlobState) -> Result<()> {
        let vertex = self.vertices.len();
        self.vertices.push(state);
        let target_level = sample_level(&mut self.rng, self.level_norm);

        insert_into_graph(
            &mut self.layers,
            vertex,
            self.vertices.len(),
            target_level,
            &self.config,
            &mut |v| distance_blob(&self.blob, &self.vertices[vertex], &self.vertices[v]),
            &mut |a, b| distance_blob(&self.blob, &self.vertices[a], &self.vertices[b]),
        )
    }
}

impl VectorIndex for HnswIndex {
    fn build(&mut self) -> Result<()> {
        let count = self.main_rel.count()? as usize;
        info!(
            num_vectors = count,
            ef_construction = self.config.ef_construction,
            ef_search = self.config.ef_search,
            m_max = self.config.m_max,
            "building hnsw index"
        );
        let mut snapshot = Vec::with_capacity(count);
        self.main_rel.scan(i32::MIN, |_, state| {
            snapshot.push(state.clone());
            Ok(true)
        })?;
        for state in snapshot {
            self.insert_vector_entry(state)?;
        }
        debug!(
            layers = self.layers.len(),
            vertices = self.vertices.len(),
            "hnsw build complete"
        );
        Ok(())
    }

    fn find_n_closest(&self, query: &[f32], n: usize) -> Result<Vec<BlobState>> {
        if self.vertices.is_empty() || n == 0 {
            return Ok(Vec::new());
        }
        let chosen = query_graph(&self.layers, &self.config, n, &mut |v| {
            distance_vec_blob(&self.blob, query, &self.vertices[v])
        })?;
        Ok(chosen
            .into_iter()
            .map(|v| self.vertices[v].clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn candidate_heap_pops_closest_first() {
        let mut heap = BinaryHeap::new();
        heap.push(Candidate {
            distance: 3.0,
            vertex: 0,
        });
        heap.push(Candidate {
            distance: 1.0,
            vertex: 1,
        });
        heap.push(Candidate {
            distance: 2.0,
            vertex: 2,
        });
        assert_eq!(heap.pop().unwrap().vertex, 1);
        assert_eq!(heap.pop().unwrap().vertex, 2);
        assert_eq!(heap.pop().unwrap().vertex, 0);
    }

    #[test]
    fn select_neighbors_ties_break_by_vertex_id() {
        let dists = [2.0f32, 1.0, 1.0, 3.0];
        let chosen =
            select_neighbors(&mut |v| Ok(dists[v]), &[0, 1, 2, 3], 3).unwrap();
        assert_eq!(chosen, vec![1, 2, 0]);
    }

    #[test]
    fn search_layer_respects_ef_budget() {
        let mut layer = NswLayer::default();
        for v in 0..5 {
            layer.add_vertex(v, 5);
        }
        // A path 0-1-2-3-4 over points on a line.
        for v in 0..4 {
            layer.connect(v, v + 1);
        }
        let positions = [0.0f32, 1.0, 2.0, 3.0, 4.0];
        let found = layer
            .search_layer(&mut |v| Ok((positions[v] - 0.2).abs()), 2, &[4])
            .unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(found, vec![0, 1]);
    }

    #[test]
    fn sampled_levels_stay_low_for_reasonable_m() {
        let mut rng = StdRng::seed_from_u64(99);
        let norm = 1.0 / 10f64.ln();
        for _ in 0..10_000 {
            assert!(sample_level(&mut rng, norm) < 16);
        }
    }
}
