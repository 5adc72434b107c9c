// src/doubling.rs

// Prefix doubling over path nodes: join rounds, external sorted runs and pruning.

use log::{debug, info, warn};
use rayon::prelude::*;
use std::cmp::Ordering;
use std::ops::Range;
use std::path::PathBuf;

use crate::codec::Node;
use crate::config::ConstructionParameters;
use crate::error::{ConstructionError, Result};
use crate::kmer::KMer;
use crate::lcp::{LcpPair, LCP};
use crate::path_node::{PathNode, LABEL_LENGTH};
use crate::priority_queue::PriorityQueue;
use crate::progress::{count_progress_bar, spinner_progress};
use crate::read_buffer::{write_records, ReadBuffer};
use crate::sl_array::SLArray;
use crate::value_index::ValueIndex;

/// Total order used for path nodes: label, then `from`, then `to`.
pub fn node_order(a: &PathNode, b: &PathNode) -> Ordering {
    a.cmp_label(b)
        .then(a.from.cmp(&b.from))
        .then(a.to().cmp(&b.to()))
}

/// Head of a sorted run during the k-way merge. Ties go to the earlier run.
#[derive(Copy, Clone, Debug)]
struct MergeHead {
    node: PathNode,
    run: usize,
}

impl Ord for MergeHead {
    fn cmp(&self, other: &Self) -> Ordering {
        node_order(&self.node, &other.node).then(self.run.cmp(&other.run))
    }
}

impl PartialOrd for MergeHead {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for MergeHead {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for MergeHead {}

/// Path nodes being extended by prefix doubling.
///
/// After [`PathGraph::prune`] the nodes are in [`node_order`]. A node becomes
/// sorted once its label range does not intersect the ranges of its
/// neighbours and every node with the same label starts from the same
/// position.
#[derive(Clone, Debug, Default)]
pub struct PathGraph {
    nodes: Vec<PathNode>,
    rounds: usize,
}

impl PathGraph {
    /// Order-1 path nodes for k-mers whose keys already carry their ranks.
    pub fn new(kmers: &[KMer]) -> Self {
        PathGraph {
            nodes: kmers.par_iter().map(PathNode::from_kmer).collect(),
            rounds: 0,
        }
    }

    /// Runs the doubling rounds and returns the graph of sorted path nodes.
    pub fn build(kmers: &[KMer], lcp: &LCP, params: &ConstructionParameters) -> Result<Self> {
        let mut graph = PathGraph::new(kmers);
        info!("Initial path graph: {} nodes", graph.len());
        graph.prune(lcp);

        while graph.unsorted() > 0 && graph.rounds < params.doubling_steps() {
            graph.join(params)?;
            graph.prune(lcp);
            info!(
                "Doubling round {}: {} nodes, {} unsorted, order {}",
                graph.rounds,
                graph.len(),
                graph.unsorted(),
                graph.max_order()
            );
        }

        graph.finalize();
        if params.should_verify() {
            graph.verify(lcp)?;
            info!("Verified {} path nodes", graph.len());
        }
        Ok(graph)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> &[PathNode] {
        &self.nodes
    }

    pub fn into_nodes(self) -> Vec<PathNode> {
        self.nodes
    }

    /// Number of join rounds performed.
    pub fn rounds(&self) -> usize {
        self.rounds
    }

    pub fn unsorted(&self) -> usize {
        self.nodes.iter().filter(|node| !node.sorted()).count()
    }

    pub fn max_order(&self) -> usize {
        self.nodes.iter().map(PathNode::order).max().unwrap_or(0)
    }

    //------------------------------------------------------------------------------

    /// Sorts the nodes and merges nodes with the same label, start and end.
    fn sort_and_merge(&mut self) {
        self.nodes.par_sort_unstable_by(node_order);
        self.nodes.dedup_by(|next, prev| {
            if next.same_label(prev) && next.from == prev.from && next.to() == prev.to() {
                prev.add_predecessors(next);
                true
            } else {
                false
            }
        });
    }

    /// Sorts the nodes and marks every label that is now unique as sorted.
    ///
    /// Sorted nodes with the same label and start are merged into one node.
    pub fn prune(&mut self, lcp: &LCP) {
        self.sort_and_merge();

        let runs = label_runs(&self.nodes);
        let mut newly_sorted = 0;
        for (i, run) in runs.iter().enumerate() {
            let members = &self.nodes[run.clone()];
            if members.iter().all(PathNode::sorted) {
                continue;
            }
            let from = members[0].from;
            if members.iter().any(|node| node.from != from) {
                continue;
            }
            let separate_prev = i == 0 || separated(lcp, &self.nodes[runs[i - 1].end - 1], &members[0]);
            let separate_next = i + 1 == runs.len()
                || separated(lcp, &members[members.len() - 1], &self.nodes[runs[i + 1].start]);
            if separate_prev && separate_next {
                for node in self.nodes[run.clone()].iter_mut().filter(|node| !node.sorted()) {
                    node.make_sorted();
                    newly_sorted += 1;
                }
            }
        }

        if newly_sorted > 0 {
            self.sort_and_merge();
        }
        debug!(
            "Pruning: {} newly sorted, {} nodes, {} unsorted",
            newly_sorted,
            self.len(),
            self.unsorted()
        );
    }

    /// One doubling round. Every unsorted node that can still grow is replaced by
    /// its joins with the nodes starting where it ends. The joined nodes are
    /// written as sorted runs and merged back.
    pub fn join(&mut self, params: &ConstructionParameters) -> Result<()> {
        let mut by_from = self.nodes.clone();
        by_from.par_sort_unstable_by_key(|node| node.from);
        let index = ValueIndex::new(&by_from, |node| node.from as usize);

        let scratch = params.scratch_dir()?;
        let progress = count_progress_bar(
            format!("Round {}", self.rounds + 1),
            "nodes",
            Some(self.len() as u64),
        );
        let runs = self
            .nodes
            .par_chunks(params.run_size())
            .enumerate()
            .map(|(run, chunk)| -> Result<(PathBuf, usize)> {
                let mut joined = Vec::with_capacity(chunk.len());
                let mut dead_ends = 0;
                for left in chunk {
                    if !extend(left, &by_from, &index, &mut joined) {
                        dead_ends += 1;
                    }
                }
                joined.sort_unstable_by(node_order);
                let path = scratch.path().join(format!("run_{}.bin", run));
                write_records(&path, &joined)?;
                progress.inc(chunk.len() as u64);
                Ok((path, dead_ends))
            })
            .collect::<Result<Vec<_>>>()?;
        progress.finish_and_clear();

        let dead_ends: usize = runs.iter().map(|(_, count)| count).sum();
        if dead_ends > 0 {
            warn!("Round {}: {} unsorted nodes have no successors", self.rounds + 1, dead_ends);
        }
        let paths: Vec<PathBuf> = runs.into_iter().map(|(path, _)| path).collect();
        self.nodes = merge_runs(&paths, params.buffer_size())?;
        self.rounds += 1;
        Ok(())
    }

    /// Marks the remaining unsorted nodes as sorted.
    pub fn finalize(&mut self) {
        let unsorted = self.unsorted();
        if unsorted > 0 {
            warn!(
                "{} path nodes are still unsorted after {} rounds; their labels may not be unique",
                unsorted, self.rounds
            );
            for node in self.nodes.iter_mut().filter(|node| !node.sorted()) {
                node.make_sorted();
            }
            self.sort_and_merge();
        }
    }

    //------------------------------------------------------------------------------

    /// Checks that the nodes are sorted and that adjacent label ranges are disjoint.
    pub fn verify(&self, lcp: &LCP) -> Result<()> {
        for (i, pair) in self.nodes.windows(2).enumerate() {
            let (a, b) = (&pair[0], &pair[1]);
            if !a.sorted() || !b.sorted() {
                return Err(ConstructionError::Invariant(format!("node {} is not sorted", i)));
            }
            if a.same_label(b) {
                continue;
            }
            if a.cmp_label(b) != Ordering::Less {
                return Err(ConstructionError::Invariant(format!(
                    "nodes {} and {} are out of order: {} / {}",
                    i,
                    i + 1,
                    a,
                    b
                )));
            }
            if a.intersect(b) {
                return Err(ConstructionError::Invariant(format!(
                    "nodes {} and {} have overlapping label ranges: {} / {}",
                    i,
                    i + 1,
                    a,
                    b
                )));
            }

            let (min, max) = (lcp.min_lcp(a, b), lcp.max_lcp(a, b));
            if min > max {
                return Err(ConstructionError::Invariant(format!(
                    "nodes {} and {}: min lcp {:?} exceeds max lcp {:?}",
                    i,
                    i + 1,
                    min,
                    max
                )));
            }
            let left = a.last_label[max.0];
            let right = b.first_label[max.0];
            let band = lcp.extend_range((left, left), max.1 + 1);
            if left >= right || band.1 >= right {
                return Err(ConstructionError::Invariant(format!(
                    "nodes {} and {}: rank {} falls within the band {:?} of rank {}",
                    i,
                    i + 1,
                    right,
                    band,
                    left
                )));
            }
        }
        Ok(())
    }

    /// For each node, the shortest prefix of its label that separates it from the
    /// nodes with other labels, as (full k-mer ranks, additional characters).
    pub fn distinguishing_prefixes(&self, lcp: &LCP) -> Vec<LcpPair> {
        let runs = label_runs(&self.nodes);
        let mut result = vec![(0, 0); self.len()];
        for (i, run) in runs.iter().enumerate() {
            let mut longest: LcpPair = (0, 0);
            if i > 0 {
                longest = longest.max(lcp.max_lcp(&self.nodes[runs[i - 1].end - 1], &self.nodes[run.start]));
            }
            if i + 1 < runs.len() {
                longest = longest.max(lcp.max_lcp(&self.nodes[run.end - 1], &self.nodes[runs[i + 1].start]));
            }
            let prefix = lcp.increment(longest);
            result[run.clone()].iter_mut().for_each(|value| *value = prefix);
        }
        result
    }

    /// Number of nodes whose label starts with each unique k-mer.
    pub fn nodes_per_key(&self, lcp: &LCP) -> SLArray {
        let mut counts = SLArray::new(lcp.total_keys);
        for node in self.nodes.iter() {
            counts.increment(node.first_label[0] as usize);
        }
        counts
    }
}

/// Ranges of nodes with identical labels.
fn label_runs(nodes: &[PathNode]) -> Vec<Range<usize>> {
    let mut runs = Vec::new();
    let mut start = 0;
    for i in 1..=nodes.len() {
        if i == nodes.len() || !nodes[i].same_label(&nodes[start]) {
            runs.push(start..i);
            start = i;
        }
    }
    runs
}

/// Do the labels of adjacent nodes `a < b` diverge within their common order?
fn separated(lcp: &LCP, a: &PathNode, b: &PathNode) -> bool {
    lcp.max_lcp(a, b).0 < a.order().min(b.order())
}

/// Appends the extensions of `left` to `out`. Sorted and full-length nodes are
/// copied as they are. Returns `false` if an unsorted node had no successors.
fn extend(left: &PathNode, by_from: &[PathNode], index: &ValueIndex, out: &mut Vec<PathNode>) -> bool {
    if left.sorted() || left.order() >= LABEL_LENGTH {
        out.push(*left);
        return true;
    }

    let to = left.to();
    let start = out.len();
    let mut pos = index.find(to as usize);
    while pos < by_from.len() && by_from[pos].from == to {
        if let Some(joined) = PathNode::join(left, &by_from[pos]) {
            out.push(joined);
        }
        pos += 1;
    }
    if out.len() == start {
        debug!("Path node {} has no successors at {}", left, Node::decode(to));
        out.push(*left);
        return false;
    }
    true
}

/// K-way merge of sorted run files.
fn merge_runs(paths: &[PathBuf], buffer_size: usize) -> Result<Vec<PathNode>> {
    let spinner = spinner_progress("Merging", format!("{} runs", paths.len()));
    let mut buffers = Vec::with_capacity(paths.len());
    let mut queue = PriorityQueue::with_capacity(paths.len());
    for (run, path) in paths.iter().enumerate() {
        let mut buffer = ReadBuffer::<PathNode>::open(path, buffer_size)?;
        if let Some(node) = buffer.pop()? {
            queue.push(MergeHead { node, run });
        }
        buffers.push(buffer);
    }
    queue.heapify();

    let total: usize = buffers.iter().map(ReadBuffer::len).sum();
    let mut result = Vec::with_capacity(total);
    while !queue.is_empty() {
        let run = queue[0].run;
        result.push(queue[0].node);
        match buffers[run].pop()? {
            Some(node) => {
                queue[0] = MergeHead { node, run };
                queue.down(0);
            }
            None => {
                queue.remove_root();
            }
        }
    }
    spinner.finish_and_clear();
    debug!("Merged {} path nodes from {} runs", result.len(), paths.len());
    Ok(result)
}
