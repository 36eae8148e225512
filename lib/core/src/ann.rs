use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

use ahash::{AHashMap, AHashSet};
use ordered_float::OrderedFloat;

use crate::Vector;

#[inline]
fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

#[derive(Debug)]
struct Node {
    product_id: String,
    /// Adjacency lists, one per layer the node participates in.
    layers: Vec<Vec<usize>>,
}

/// Incremental approximate nearest neighbor index over unit-normalized
/// vectors, in the HNSW family: layered greedy graph search with random
/// layer assignment.
///
/// Vectors live in one contiguous buffer for cache locality. Removal is a
/// tombstone: the slot stays in the graph as a waypoint but is dropped
/// from results, so deletes never force a rebuild. Distance is
/// `1 - dot(q, v)`, which equals cosine distance for unit vectors.
pub struct AnnIndex {
    dim: usize,
    max_connections: usize,
    max_layers: usize,
    ef_construction: usize,
    nodes: Vec<Node>,
    vectors: Vec<f32>,
    live: Vec<bool>,
    id_to_node: AHashMap<String, usize>,
    top_layer: usize,
}

impl AnnIndex {
    pub fn new(dim: usize, max_connections: usize, max_layers: usize) -> Self {
        Self {
            dim,
            max_connections,
            max_layers: max_layers.max(1),
            ef_construction: 100,
            nodes: Vec::new(),
            vectors: Vec::new(),
            live: Vec::new(),
            id_to_node: AHashMap::default(),
            top_layer: 0,
        }
    }

    /// Number of live (searchable) entries.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.id_to_node.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.id_to_node.is_empty()
    }

    /// Total graph slots, live and tombstoned.
    #[inline]
    #[must_use]
    pub fn slots(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    fn vector_of(&self, idx: usize) -> &[f32] {
        &self.vectors[idx * self.dim..(idx + 1) * self.dim]
    }

    #[inline]
    fn distance(&self, query: &[f32], idx: usize) -> f32 {
        1.0 - dot(query, self.vector_of(idx))
    }

    fn select_layer(&self) -> usize {
        let mut layer = 0;
        while layer + 1 < self.max_layers && rand::random::<f32>() < 0.5 {
            layer += 1;
        }
        layer
    }

    /// Greedy beam search at one layer, returning up to `ef` candidates
    /// sorted by distance ascending (node index breaks exact ties).
    fn search_layer(&self, query: &[f32], entry: usize, ef: usize, layer: usize) -> Vec<(usize, f32)> {
        let mut visited: AHashSet<usize> = AHashSet::default();
        let mut candidates: BinaryHeap<Reverse<(OrderedFloat<f32>, usize)>> = BinaryHeap::new();
        let mut results: BinaryHeap<(OrderedFloat<f32>, usize)> = BinaryHeap::new();

        let entry_dist = OrderedFloat(self.distance(query, entry));
        visited.insert(entry);
        candidates.push(Reverse((entry_dist, entry)));
        results.push((entry_dist, entry));

        while let Some(Reverse((dist, idx))) = candidates.pop() {
            let worst = results
                .peek()
                .map(|&(d, _)| d)
                .unwrap_or(OrderedFloat(f32::INFINITY));
            if results.len() >= ef && dist > worst {
                break;
            }
            let Some(neighbors) = self.nodes[idx].layers.get(layer) else {
                continue;
            };
            for &neighbor in neighbors {
                if !visited.insert(neighbor) {
                    continue;
                }
                let d = OrderedFloat(self.distance(query, neighbor));
                let worst = results
                    .peek()
                    .map(|&(w, _)| w)
                    .unwrap_or(OrderedFloat(f32::INFINITY));
                if results.len() < ef || d < worst {
                    candidates.push(Reverse((d, neighbor)));
                    results.push((d, neighbor));
                    if results.len() > ef {
                        results.pop();
                    }
                }
            }
        }

        let mut out: Vec<(usize, f32)> = results
            .into_iter()
            .map(|(dist, idx)| (idx, dist.0))
            .collect();
        out.sort_by(|a, b| {
            a.1.partial_cmp(&b.1)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });
        out
    }

    /// Insert a unit-normalized vector. Re-inserting an id tombstones the
    /// old slot and links a fresh one.
    pub fn insert(&mut self, product_id: &str, vector: &Vector) {
        debug_assert_eq!(vector.dim(), self.dim);
        if let Some(&old) = self.id_to_node.get(product_id) {
            self.live[old] = false;
        }

        let layer = self.select_layer();
        let idx = self.nodes.len();
        self.vectors.extend_from_slice(vector.as_slice());
        self.live.push(true);

        let mut node = Node {
            product_id: product_id.to_string(),
            layers: vec![Vec::new(); layer + 1],
        };

        if idx == 0 {
            self.nodes.push(node);
            self.top_layer = layer;
            self.id_to_node.insert(product_id.to_string(), 0);
            return;
        }

        let query = vector.as_slice().to_vec();
        let mut entry = 0usize;
        for l in ((layer + 1)..=self.top_layer).rev() {
            if let Some(&(best, _)) = self.search_layer(&query, entry, 1, l).first() {
                entry = best;
            }
        }

        for l in (0..=layer.min(self.top_layer)).rev() {
            let found = self.search_layer(&query, entry, self.ef_construction, l);
            if let Some(&(best, _)) = found.first() {
                entry = best;
            }
            let neighbors: Vec<usize> = found
                .iter()
                .take(self.max_connections)
                .map(|&(i, _)| i)
                .collect();
            node.layers[l] = neighbors.clone();
            for neighbor in neighbors {
                let needs_trim = match self.nodes[neighbor].layers.get_mut(l) {
                    Some(adj) => {
                        adj.push(idx);
                        adj.len() > self.max_connections * 2
                    }
                    None => false,
                };
                if needs_trim {
                    self.trim_neighbors(neighbor, l);
                }
            }
        }

        self.nodes.push(node);
        self.top_layer = self.top_layer.max(layer);
        self.id_to_node.insert(product_id.to_string(), idx);
    }

    /// Keep only the closest connections of an over-full adjacency list.
    fn trim_neighbors(&mut self, node_idx: usize, layer: usize) {
        let mut adj = std::mem::take(&mut self.nodes[node_idx].layers[layer]);
        let base: Vec<f32> = self.vector_of(node_idx).to_vec();
        adj.sort_by(|&a, &b| {
            let da = 1.0 - dot(&base, self.vector_of(a));
            let db = 1.0 - dot(&base, self.vector_of(b));
            da.partial_cmp(&db).unwrap_or(Ordering::Equal)
        });
        adj.truncate(self.max_connections * 2);
        self.nodes[node_idx].layers[layer] = adj;
    }

    /// Tombstone the entry for `product_id`. Returns whether it was live.
    pub fn remove(&mut self, product_id: &str) -> bool {
        match self.id_to_node.remove(product_id) {
            Some(idx) => {
                self.live[idx] = false;
                true
            }
            None => false,
        }
    }

    /// Up to `k` live nearest neighbors of a unit-normalized query, as
    /// `(product_id, cosine similarity)` with similarity descending.
    pub fn search(&self, query: &Vector, k: usize) -> Vec<(String, f32)> {
        if self.nodes.is_empty() || k == 0 {
            return Vec::new();
        }
        let ef = (k + k / 2).max(16);
        let query = query.as_slice();

        let mut entry = 0usize;
        for l in (1..=self.top_layer).rev() {
            if let Some(&(best, _)) = self.search_layer(query, entry, 1, l).first() {
                entry = best;
            }
        }

        self.search_layer(query, entry, ef, 0)
            .into_iter()
            .filter(|&(idx, _)| self.live[idx])
            .take(k)
            .map(|(idx, dist)| (self.nodes[idx].product_id.clone(), 1.0 - dist))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit(angle: f32) -> Vector {
        Vector::new(vec![angle.cos(), angle.sin()])
    }

    fn build(n: usize) -> AnnIndex {
        let mut index = AnnIndex::new(2, 16, 4);
        for i in 0..n {
            let v = unit(i as f32 * 0.1);
            index.insert(&format!("p{}", i), &v);
        }
        index
    }

    #[test]
    fn test_insert_search() {
        let index = build(30);
        assert_eq!(index.len(), 30);

        let results = index.search(&unit(0.5), 3);
        assert!(!results.is_empty());
        assert_eq!(results[0].0, "p5");
        assert!(results[0].1 > 0.999);
    }

    #[test]
    fn test_remove_is_tombstone() {
        let mut index = build(10);
        assert!(index.remove("p3"));
        assert!(!index.remove("p3"));
        assert_eq!(index.len(), 9);
        assert_eq!(index.slots(), 10);

        let results = index.search(&unit(0.3), 10);
        assert!(results.iter().all(|(id, _)| id != "p3"));
    }

    #[test]
    fn test_reinsert_replaces() {
        let mut index = build(10);
        index.insert("p0", &unit(2.0));
        assert_eq!(index.len(), 10);
        assert_eq!(index.slots(), 11);

        let results = index.search(&unit(2.0), 1);
        assert_eq!(results[0].0, "p0");
        assert!(results[0].1 > 0.999);
    }

    #[test]
    fn test_scores_descend() {
        let index = build(30);
        let results = index.search(&unit(1.0), 10);
        for pair in results.windows(2) {
            assert!(pair[0].1 >= pair[1].1);
        }
    }
}
