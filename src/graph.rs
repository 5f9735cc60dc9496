use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::Context as _;
use petgraph::graph::{NodeIndex, UnGraph};
use petgraph::visit::EdgeRef as _;
use plotters::prelude::*;

use crate::cli::GraphArgs;
use crate::formats::BookRecord;
use crate::harvest;

/// Only the top of the ranking feeds the graph.
pub const GRAPH_RECORDS: usize = 25;

const LAYOUT_ITERATIONS: usize = 85;
const LAYOUT_K: f64 = 0.25;
const LAYOUT_SCALE: f64 = 2.0;

const CANVAS: (u32, u32) = (1200, 1200);
const CANVAS_MARGIN: f64 = 80.0;
const LABEL_SIZE: i32 = 15;

const PALETTE: [RGBColor; 10] = [
    RGBColor(0xe2, 0xe2, 0xdf),
    RGBColor(0xd2, 0xd2, 0xcf),
    RGBColor(0xe2, 0xcf, 0xc4),
    RGBColor(0xf7, 0xd9, 0xc4),
    RGBColor(0xfa, 0xed, 0xcb),
    RGBColor(0xc9, 0xe4, 0xde),
    RGBColor(0xc6, 0xde, 0xf1),
    RGBColor(0xdb, 0xcd, 0xf0),
    RGBColor(0xf2, 0xc6, 0xde),
    RGBColor(0xf9, 0xc6, 0xc9),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Author,
    Keyword,
}

#[derive(Debug, Clone)]
pub struct Node {
    pub label: String,
    pub kind: NodeKind,
}

/// Undirected author–keyword graph over the top of one harvest.
/// Ephemeral: built per request, discarded once the artifact is written.
pub struct RelationshipGraph {
    graph: UnGraph<Node, ()>,
}

impl RelationshipGraph {
    /// Build from the first [`GRAPH_RECORDS`] records: one node per
    /// distinct non-empty author, one per distinct keyword, one edge per
    /// (author, keyword) pair of a record. Duplicate pairs stay one edge.
    pub fn build(records: &[BookRecord]) -> Self {
        let mut graph = UnGraph::new_undirected();
        let mut authors: HashMap<String, NodeIndex> = HashMap::new();
        let mut keywords: HashMap<String, NodeIndex> = HashMap::new();

        for record in records.iter().take(GRAPH_RECORDS) {
            let author = if record.author.is_empty() {
                None
            } else {
                Some(*authors.entry(record.author.clone()).or_insert_with(|| {
                    graph.add_node(Node {
                        label: record.author.clone(),
                        kind: NodeKind::Author,
                    })
                }))
            };

            for keyword in &record.keywords {
                let keyword_node = *keywords.entry(keyword.clone()).or_insert_with(|| {
                    graph.add_node(Node {
                        label: keyword.clone(),
                        kind: NodeKind::Keyword,
                    })
                });
                if let Some(author_node) = author {
                    graph.update_edge(author_node, keyword_node, ());
                }
            }
        }

        Self { graph }
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    fn degree(&self, node: NodeIndex) -> usize {
        self.graph.edges(node).count()
    }

    /// Louvain community id per node, contiguous from 0, deterministic.
    pub fn communities(&self) -> Vec<usize> {
        let adjacency: Vec<Vec<usize>> = self
            .graph
            .node_indices()
            .map(|node| self.graph.neighbors(node).map(NodeIndex::index).collect())
            .collect();
        louvain_communities(&adjacency)
    }

    /// Force-directed 2-D layout with fixed constants, coordinates within
    /// `[-LAYOUT_SCALE, LAYOUT_SCALE]`. Zero and one node are fine.
    pub fn layout(&self) -> Vec<(f64, f64)> {
        let n = self.graph.node_count();
        if n == 0 {
            return Vec::new();
        }
        if n == 1 {
            return vec![(0.0, 0.0)];
        }

        // Deterministic start: nodes spread on a unit circle.
        let mut positions: Vec<(f64, f64)> = (0..n)
            .map(|i| {
                let angle = std::f64::consts::TAU * i as f64 / n as f64;
                (angle.cos(), angle.sin())
            })
            .collect();

        let edges: Vec<(usize, usize)> = self
            .graph
            .edge_references()
            .map(|edge| (edge.source().index(), edge.target().index()))
            .collect();

        let mut temperature = 0.2;
        let cooling = temperature / (LAYOUT_ITERATIONS as f64 + 1.0);

        for _ in 0..LAYOUT_ITERATIONS {
            let mut displacement = vec![(0.0_f64, 0.0_f64); n];

            for i in 0..n {
                for j in (i + 1)..n {
                    let dx = positions[i].0 - positions[j].0;
                    let dy = positions[i].1 - positions[j].1;
                    let dist = (dx * dx + dy * dy).sqrt().max(1e-9);
                    let repulse = LAYOUT_K * LAYOUT_K / dist;
                    let (ux, uy) = (dx / dist, dy / dist);
                    displacement[i].0 += ux * repulse;
                    displacement[i].1 += uy * repulse;
                    displacement[j].0 -= ux * repulse;
                    displacement[j].1 -= uy * repulse;
                }
            }

            for &(a, b) in &edges {
                let dx = positions[a].0 - positions[b].0;
                let dy = positions[a].1 - positions[b].1;
                let dist = (dx * dx + dy * dy).sqrt().max(1e-9);
                let attract = dist * dist / LAYOUT_K;
                let (ux, uy) = (dx / dist, dy / dist);
                displacement[a].0 -= ux * attract;
                displacement[a].1 -= uy * attract;
                displacement[b].0 += ux * attract;
                displacement[b].1 += uy * attract;
            }

            for i in 0..n {
                let (dx, dy) = displacement[i];
                let length = (dx * dx + dy * dy).sqrt().max(1e-9);
                let step = length.min(temperature);
                positions[i].0 += dx / length * step;
                positions[i].1 += dy / length * step;
            }

            temperature -= cooling;
        }

        rescale(positions, LAYOUT_SCALE)
    }

    /// Render to `out`, or to a uniquely named SVG in the OS temp
    /// directory. The file is kept; the caller owns its lifetime.
    pub fn render(&self, out: Option<&Path>) -> anyhow::Result<PathBuf> {
        let path = match out {
            Some(path) => path.to_path_buf(),
            None => tempfile::Builder::new()
                .prefix("booktop-graph-")
                .suffix(".svg")
                .tempfile()
                .context("create graph output file")?
                .into_temp_path()
                .keep()
                .context("persist graph output file")?,
        };
        self.render_to(&path)
            .with_context(|| format!("render graph: {}", path.display()))?;
        Ok(path)
    }

    fn render_to(&self, path: &Path) -> anyhow::Result<()> {
        let positions = self.layout();
        let communities = self.communities();

        let root = SVGBackend::new(path, CANVAS).into_drawing_area();
        root.fill(&WHITE).context("fill background")?;

        let half_w = CANVAS.0 as f64 / 2.0;
        let half_h = CANVAS.1 as f64 / 2.0;
        let to_pixel = |(x, y): (f64, f64)| -> (i32, i32) {
            let px = half_w + x / LAYOUT_SCALE * (half_w - CANVAS_MARGIN);
            let py = half_h - y / LAYOUT_SCALE * (half_h - CANVAS_MARGIN);
            (px as i32, py as i32)
        };

        for edge in self.graph.edge_references() {
            let a = to_pixel(positions[edge.source().index()]);
            let b = to_pixel(positions[edge.target().index()]);
            root.draw(&PathElement::new(vec![a, b], &BLACK.mix(0.5)))
                .context("draw edge")?;
        }

        for node in self.graph.node_indices() {
            let i = node.index();
            let (x, y) = to_pixel(positions[i]);
            let radius = (6 + 2 * self.degree(node)).min(28) as i32;
            let color = PALETTE[communities[i] % PALETTE.len()];

            root.draw(&Circle::new((x, y), radius, color.filled()))
                .context("draw node")?;
            root.draw(&Text::new(
                self.graph[node].label.clone(),
                (x + radius + 2, y),
                ("sans-serif", LABEL_SIZE),
            ))
            .context("draw label")?;
        }

        root.present().context("write svg")?;
        Ok(())
    }
}

fn rescale(mut positions: Vec<(f64, f64)>, scale: f64) -> Vec<(f64, f64)> {
    let n = positions.len() as f64;
    let cx = positions.iter().map(|p| p.0).sum::<f64>() / n;
    let cy = positions.iter().map(|p| p.1).sum::<f64>() / n;

    let mut extent = 0.0_f64;
    for position in &mut positions {
        position.0 -= cx;
        position.1 -= cy;
        extent = extent.max(position.0.abs()).max(position.1.abs());
    }
    if extent > 0.0 {
        for position in &mut positions {
            position.0 *= scale / extent;
            position.1 *= scale / extent;
        }
    }
    positions
}

/// Louvain modularity optimization: local moving plus aggregation until
/// modularity stops improving. Node order drives iteration, so the result
/// is deterministic for a given graph.
fn louvain_communities(adjacency: &[Vec<usize>]) -> Vec<usize> {
    let n = adjacency.len();
    if n == 0 {
        return Vec::new();
    }

    let total_edges: usize = adjacency.iter().map(Vec::len).sum::<usize>() / 2;
    if total_edges == 0 {
        return (0..n).collect();
    }
    let m = total_edges as f64;

    let mut graph: Vec<HashMap<usize, f64>> = adjacency
        .iter()
        .map(|neighbors| neighbors.iter().map(|&j| (j, 1.0)).collect())
        .collect();
    let mut self_loops = vec![0.0_f64; n];
    let mut assignment: Vec<usize> = (0..n).collect();

    loop {
        let (labels, improved) = local_moving(&graph, &self_loops, m);
        let (labels, count) = renumber(&labels);

        for slot in assignment.iter_mut() {
            *slot = labels[*slot];
        }

        if !improved || count == graph.len() {
            return assignment;
        }

        (graph, self_loops) = aggregate(&graph, &self_loops, &labels, count);
    }
}

fn local_moving(
    graph: &[HashMap<usize, f64>],
    self_loops: &[f64],
    m: f64,
) -> (Vec<usize>, bool) {
    let n = graph.len();
    let degree: Vec<f64> = (0..n)
        .map(|i| graph[i].values().sum::<f64>() + 2.0 * self_loops[i])
        .collect();

    let mut community: Vec<usize> = (0..n).collect();
    let mut sum_tot = degree.clone();
    let mut improved = false;

    loop {
        let mut moved = false;

        for i in 0..n {
            let current = community[i];
            sum_tot[current] -= degree[i];

            let mut weights: HashMap<usize, f64> = HashMap::new();
            weights.insert(current, 0.0);
            for (&j, &w) in &graph[i] {
                if j != i {
                    *weights.entry(community[j]).or_insert(0.0) += w;
                }
            }

            // Smallest community id wins ties, keeping the result stable.
            let mut candidates: Vec<usize> = weights.keys().copied().collect();
            candidates.sort_unstable();

            let mut best = current;
            let mut best_gain = f64::NEG_INFINITY;
            for c in candidates {
                let gain = weights[&c] - sum_tot[c] * degree[i] / (2.0 * m);
                if gain > best_gain + 1e-12 {
                    best_gain = gain;
                    best = c;
                }
            }

            sum_tot[best] += degree[i];
            if best != current {
                community[i] = best;
                moved = true;
                improved = true;
            }
        }

        if !moved {
            return (community, improved);
        }
    }
}

fn renumber(labels: &[usize]) -> (Vec<usize>, usize) {
    let mut ids: HashMap<usize, usize> = HashMap::new();
    let mut next = 0;
    let renumbered = labels
        .iter()
        .map(|&label| {
            *ids.entry(label).or_insert_with(|| {
                let id = next;
                next += 1;
                id
            })
        })
        .collect();
    (renumbered, next)
}

fn aggregate(
    graph: &[HashMap<usize, f64>],
    self_loops: &[f64],
    labels: &[usize],
    count: usize,
) -> (Vec<HashMap<usize, f64>>, Vec<f64>) {
    let mut new_graph: Vec<HashMap<usize, f64>> = vec![HashMap::new(); count];
    let mut new_loops = vec![0.0_f64; count];

    for (i, neighbors) in graph.iter().enumerate() {
        let ci = labels[i];
        new_loops[ci] += self_loops[i];

        for (&j, &w) in neighbors {
            let cj = labels[j];
            if ci == cj {
                // Each undirected edge shows up from both endpoints.
                if i < j {
                    new_loops[ci] += w;
                }
            } else {
                *new_graph[ci].entry(cj).or_insert(0.0) += w;
            }
        }
    }

    (new_graph, new_loops)
}

pub fn run(args: GraphArgs) -> anyhow::Result<()> {
    let records =
        harvest::harvest_records(args.category, args.window, args.config.as_deref(), None)?;

    let graph = RelationshipGraph::build(&records);
    tracing::info!(
        nodes = graph.node_count(),
        edges = graph.edge_count(),
        "built relation graph"
    );

    let path = graph.render(args.out.as_deref().map(Path::new))?;
    println!("{}", path.display());
    Ok(())
}
