//! Multipartite graph keyphrase ranking
//!
//! Unsupervised keyphrase extraction in the TopicRank family:
//! 1. Candidates are noun-phrase-like content word runs
//! 2. Candidates are grouped into topics by average-linkage clustering over
//!    stem-set Jaccard distance
//! 3. A directed multipartite graph connects candidates of different topics,
//!    weighted by the inverse distance between their occurrences
//! 4. Edges into the first-occurring candidate of each topic are boosted
//! 5. Candidates are scored with weighted PageRank

use std::collections::BTreeSet;

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;

use crate::noun_phrase::NounPhraseChunker;
use crate::stopwords::StopwordSet;
use crate::tokenize::light_stem;

/// A keyphrase candidate aggregated over its occurrences
#[derive(Debug, Clone)]
struct Candidate {
    /// Surface form of the first occurrence
    surface: String,
    stems: BTreeSet<String>,
    /// Word positions of every occurrence, ascending
    positions: Vec<usize>,
}

/// Multipartite keyphrase ranker
#[derive(Debug, Clone)]
pub struct MultipartiteRanker {
    chunker: NounPhraseChunker,
    /// Clustering distance threshold
    threshold: f32,
    /// Boost for the first candidate of each topic
    alpha: f32,
    damping: f32,
    max_iterations: usize,
    tolerance: f32,
}

impl MultipartiteRanker {
    pub fn new(stopwords: StopwordSet) -> Self {
        Self {
            chunker: NounPhraseChunker::new(stopwords),
            threshold: 0.74,
            alpha: 1.1,
            damping: 0.85,
            max_iterations: 100,
            tolerance: 1e-6,
        }
    }

    /// Top `n` keyphrases, best first
    pub fn keyphrases(&self, text: &str, n: usize) -> Vec<String> {
        self.rank(text)
            .into_iter()
            .take(n)
            .map(|(phrase, _)| phrase)
            .collect()
    }

    /// Every candidate with its score, best first
    pub fn rank(&self, text: &str) -> Vec<(String, f32)> {
        let candidates = self.candidates(text);
        if candidates.is_empty() {
            return Vec::new();
        }

        let stems: Vec<&BTreeSet<String>> = candidates.iter().map(|c| &c.stems).collect();
        let topics = cluster_topics(&stems, self.threshold);

        let mut topic_of = vec![0usize; candidates.len()];
        for (t, members) in topics.iter().enumerate() {
            for &m in members {
                topic_of[m] = t;
            }
        }

        let (mut graph, nodes) = build_graph(&candidates, &topic_of);
        self.adjust_weights(&mut graph, &nodes, &candidates, &topics);
        let scores = pagerank(&graph, self.damping, self.max_iterations, self.tolerance);

        let mut ranked: Vec<(usize, f32)> = nodes
            .iter()
            .enumerate()
            .map(|(i, node)| (i, scores[node.index()]))
            .collect();
        // Ties keep first-occurrence order
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));

        ranked
            .into_iter()
            .map(|(i, score)| (candidates[i].surface.clone(), score))
            .collect()
    }

    fn candidates(&self, text: &str) -> Vec<Candidate> {
        let mut candidates: Vec<Candidate> = Vec::new();
        let mut keys: Vec<String> = Vec::new();

        for span in self.chunker.spans(text) {
            let key = span.words.join(" ");
            match keys.iter().position(|k| *k == key) {
                Some(i) => candidates[i].positions.push(span.position),
                None => {
                    keys.push(key);
                    candidates.push(Candidate {
                        surface: span.text,
                        stems: span.words.iter().map(|w| light_stem(w)).collect(),
                        positions: vec![span.position],
                    });
                }
            }
        }

        candidates
    }

    /// Boost edges pointing at the first-occurring candidate of each topic
    fn adjust_weights(
        &self,
        graph: &mut DiGraph<usize, f32>,
        nodes: &[NodeIndex],
        candidates: &[Candidate],
        topics: &[Vec<usize>],
    ) {
        let mut boosts: Vec<(usize, usize, f32)> = Vec::new();

        for variants in topics.iter().filter(|v| v.len() > 1) {
            let Some(&first) = variants
                .iter()
                .min_by_key(|&&v| (candidates[v].positions[0], v))
            else {
                continue;
            };

            for edge in graph.edges(nodes[first]) {
                let end = nodes[edge.target().index()];
                let boosters: f32 = variants
                    .iter()
                    .filter(|&&v| v != first)
                    .filter_map(|&v| graph.find_edge(nodes[v], end))
                    .filter_map(|e| graph.edge_weight(e))
                    .sum();
                if boosters > 0.0 {
                    boosts.push((first, end.index(), boosters));
                }
            }
        }

        for (first, end, boosters) in boosts {
            let position = (1.0 / (1.0 + candidates[first].positions[0] as f32)).exp();
            if let Some(edge) = graph.find_edge(nodes[end], nodes[first]) {
                if let Some(weight) = graph.edge_weight_mut(edge) {
                    *weight += boosters * self.alpha * position;
                }
            }
        }
    }
}

impl Default for MultipartiteRanker {
    fn default() -> Self {
        Self::new(StopwordSet::english())
    }
}

/// Average-linkage agglomerative clustering over Jaccard distance
///
/// Clusters merge while their average pairwise distance is within
/// `threshold`. Returns member indices per topic in ascending order.
pub(crate) fn cluster_topics(stems: &[&BTreeSet<String>], threshold: f32) -> Vec<Vec<usize>> {
    let n = stems.len();
    let mut distance = vec![vec![0.0f32; n]; n];
    for i in 0..n {
        for j in (i + 1)..n {
            let d = jaccard_distance(stems[i], stems[j]);
            distance[i][j] = d;
            distance[j][i] = d;
        }
    }

    let mut clusters: Vec<Vec<usize>> = (0..n).map(|i| vec![i]).collect();

    while clusters.len() > 1 {
        let mut best: Option<(usize, usize, f32)> = None;

        for a in 0..clusters.len() {
            for b in (a + 1)..clusters.len() {
                let total: f32 = clusters[a]
                    .iter()
                    .flat_map(|&i| clusters[b].iter().map(move |&j| (i, j)))
                    .map(|(i, j)| distance[i][j])
                    .sum();
                let avg = total / (clusters[a].len() * clusters[b].len()) as f32;
                if best.map_or(true, |(_, _, d)| avg < d) {
                    best = Some((a, b, avg));
                }
            }
        }

        match best {
            Some((a, b, d)) if d <= threshold => {
                let merged = clusters.remove(b);
                clusters[a].extend(merged);
                clusters[a].sort_unstable();
            }
            _ => break,
        }
    }

    clusters
}

fn jaccard_distance(a: &BTreeSet<String>, b: &BTreeSet<String>) -> f32 {
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    1.0 - a.intersection(b).count() as f32 / union as f32
}

/// Connect candidates of different topics in both directions
fn build_graph(
    candidates: &[Candidate],
    topic_of: &[usize],
) -> (DiGraph<usize, f32>, Vec<NodeIndex>) {
    let mut graph = DiGraph::new();
    let nodes: Vec<NodeIndex> = (0..candidates.len()).map(|i| graph.add_node(i)).collect();

    for i in 0..candidates.len() {
        for j in (i + 1)..candidates.len() {
            if topic_of[i] == topic_of[j] {
                continue;
            }
            let weight: f32 = candidates[i]
                .positions
                .iter()
                .flat_map(|&p| candidates[j].positions.iter().map(move |&q| (p, q)))
                .filter(|(p, q)| p != q)
                .map(|(p, q)| 1.0 / p.abs_diff(q) as f32)
                .sum();
            graph.add_edge(nodes[i], nodes[j], weight);
            graph.add_edge(nodes[j], nodes[i], weight);
        }
    }

    (graph, nodes)
}

/// Weighted PageRank; dangling mass is spread uniformly
fn pagerank(
    graph: &DiGraph<usize, f32>,
    damping: f32,
    max_iterations: usize,
    tolerance: f32,
) -> Vec<f32> {
    let n = graph.node_count();
    if n == 0 {
        return Vec::new();
    }

    let out_weight: Vec<f32> = graph
        .node_indices()
        .map(|node| graph.edges(node).map(|e| *e.weight()).sum::<f32>())
        .collect();

    let uniform = 1.0 / n as f32;
    let mut scores = vec![uniform; n];

    for _ in 0..max_iterations {
        let dangling: f32 = graph
            .node_indices()
            .filter(|node| out_weight[node.index()] == 0.0)
            .map(|node| scores[node.index()])
            .sum();

        let next: Vec<f32> = graph
            .node_indices()
            .map(|node| {
                let incoming: f32 = graph
                    .edges_directed(node, Direction::Incoming)
                    .filter(|e| out_weight[e.source().index()] > 0.0)
                    .map(|e| {
                        let source = e.source().index();
                        scores[source] * e.weight() / out_weight[source]
                    })
                    .sum();
                (1.0 - damping) * uniform + damping * (incoming + dangling * uniform)
            })
            .collect();

        let delta: f32 = next.iter().zip(&scores).map(|(a, b)| (a - b).abs()).sum();
        scores = next;
        if delta < n as f32 * tolerance {
            break;
        }
    }

    scores
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEXT: &str = "Paris is the capital of France. The Eiffel Tower is located in Paris. \
        The tower attracts millions of visitors to Paris every year.";

    fn stems(words: &[&str]) -> BTreeSet<String> {
        words.iter().map(|w| light_stem(w)).collect()
    }

    #[test]
    fn test_cluster_shared_stems() {
        let a = stems(&["eiffel", "tower"]);
        let b = stems(&["towers"]);
        let c = stems(&["france"]);
        let topics = cluster_topics(&[&a, &b, &c], 0.74);

        assert_eq!(topics, vec![vec![0, 1], vec![2]]);
    }

    #[test]
    fn test_cluster_disjoint() {
        let a = stems(&["paris"]);
        let b = stems(&["france"]);
        assert_eq!(cluster_topics(&[&a, &b], 0.74).len(), 2);
    }

    #[test]
    fn test_rank_is_deterministic() {
        let ranker = MultipartiteRanker::default();
        let first = ranker.rank(TEXT);
        let second = ranker.rank(TEXT);

        assert!(!first.is_empty());
        assert_eq!(first, second);
        assert!(first.windows(2).all(|w| w[0].1 >= w[1].1));
    }

    #[test]
    fn test_central_candidate_ranks_high() {
        let ranker = MultipartiteRanker::default();
        let top = ranker.keyphrases(
            "Paris is the capital of France. The Eiffel Tower is located in Paris.",
            2,
        );

        assert_eq!(top.len(), 2);
        assert!(top.contains(&"France".to_string()));
    }

    #[test]
    fn test_empty_text() {
        let ranker = MultipartiteRanker::default();
        assert!(ranker.rank("").is_empty());
        assert!(ranker.keyphrases("the of and", 5).is_empty());
    }

    #[test]
    fn test_pagerank_sums_to_one() {
        let mut graph = DiGraph::new();
        let a = graph.add_node(0);
        let b = graph.add_node(1);
        let c = graph.add_node(2);
        graph.add_edge(a, b, 1.0);
        graph.add_edge(b, a, 1.0);
        graph.add_edge(b, c, 2.0);

        let scores = pagerank(&graph, 0.85, 100, 1e-6);
        let total: f32 = scores.iter().sum();
        assert!((total - 1.0).abs() < 1e-3);
    }
}
