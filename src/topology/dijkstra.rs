use std::cmp::Ordering;
use std::collections::BinaryHeap;

use log::trace;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
#[cfg(feature = "tracing")]
use tracing::Level;

use crate::topology::{Bound, Cost, Edge, EdgePoint, Graph, Routed, Router};

/// A label of the search, being an edge entered (in full, or up to a target
/// on it) from the previous edge at the given cost and bounding cost.
#[derive(Debug, Clone, Copy)]
struct Mark {
    edge: usize,
    previous: Option<usize>,
    cost: f64,
    bound: f64,
}

#[derive(Debug)]
struct SmallestHolder {
    cost: f64,
    index: usize,
}

impl PartialEq for SmallestHolder {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for SmallestHolder {}

impl PartialOrd for SmallestHolder {
    #[inline]
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SmallestHolder {
    #[inline]
    fn cmp(&self, other: &Self) -> Ordering {
        // Smallest cost first, then the earliest mark.
        other
            .cost
            .total_cmp(&self.cost)
            .then_with(|| other.index.cmp(&self.index))
    }
}

/// Per-call search state, so that concurrent searches
/// share nothing but the graph.
#[derive(Default)]
struct Search {
    marks: Vec<Mark>,
    queue: BinaryHeap<SmallestHolder>,
    entries: FxHashMap<usize, usize>,
    reaches: FxHashMap<usize, usize>,
    starts: FxHashMap<usize, usize>,
    finishes: FxHashMap<usize, usize>,
}

impl Search {
    fn push(&mut self, mark: Mark) -> usize {
        let index = self.marks.len();
        self.marks.push(mark);
        self.queue.push(SmallestHolder {
            cost: mark.cost,
            index,
        });
        index
    }
}

/// Label-setting Dijkstra over the edges of a graph, between points on edges.
///
/// Each edge is entered at most once, from the cheapest label reaching it. Targets
/// are reached by separate labels carrying the cost up to the target's fraction, such
/// that the first of these taken from the queue is the optimal path to that target.
#[derive(Debug, Clone, Copy, Default)]
pub struct Dijkstra;

impl<E: Edge> Router<E> for Dijkstra {
    #[cfg_attr(feature = "tracing", tracing::instrument(level = Level::DEBUG, skip_all))]
    fn route_many(
        &self,
        graph: &Graph<E>,
        sources: &[EdgePoint],
        targets: &[EdgePoint],
        cost: &dyn Cost<E>,
        bound: Option<Bound<'_, E>>,
    ) -> Vec<Option<Routed>> {
        let bounding = |edge: &E, fraction: Option<f64>| match (bound, fraction) {
            (Some(bound), Some(fraction)) => bound.cost.cost_fraction(edge, fraction),
            (Some(bound), None) => bound.cost.cost(edge),
            (None, _) => 0.0,
        };

        let mut target_edges: FxHashMap<usize, SmallVec<[usize; 2]>> = FxHashMap::default();
        for (index, target) in targets.iter().enumerate() {
            match graph.index_of(target.edge) {
                Some(edge) => target_edges.entry(edge).or_default().push(index),
                None => trace!("target edge {} is not part of the graph", target.edge),
            }
        }

        let mut search = Search::default();

        for (index, source) in sources.iter().enumerate() {
            let Some((edge_index, edge)) = graph
                .index_of(source.edge)
                .and_then(|index| graph.at(index).map(|edge| (index, edge)))
            else {
                trace!("source edge {} is not part of the graph", source.edge);
                continue;
            };

            let start_cost = cost.cost_fraction(edge, 1.0 - source.fraction);
            let start_bound = bounding(edge, Some(1.0 - source.fraction));

            if let Some(reached) = target_edges.get(&edge_index) {
                for target_index in reached {
                    let target = &targets[*target_index];
                    if target.fraction < source.fraction {
                        continue;
                    }

                    let remainder = 1.0 - target.fraction;
                    let reach = search.push(Mark {
                        edge: edge_index,
                        previous: None,
                        cost: start_cost - cost.cost_fraction(edge, remainder),
                        bound: start_bound - bounding(edge, Some(remainder)),
                    });

                    trace!(
                        "reached target {} on start edge {} from {} to {}",
                        target_index,
                        source.edge,
                        source.fraction,
                        target.fraction
                    );

                    search.reaches.insert(reach, *target_index);
                    search.starts.insert(reach, index);
                }
            }

            let improves = match search.entries.get(&edge_index) {
                Some(existing) => start_cost < search.marks[*existing].cost,
                None => true,
            };

            if improves {
                trace!(
                    "add source {} on edge {} at {} with {} cost",
                    index,
                    source.edge,
                    source.fraction,
                    start_cost
                );

                let start = search.push(Mark {
                    edge: edge_index,
                    previous: None,
                    cost: start_cost,
                    bound: start_bound,
                });

                search.entries.insert(edge_index, start);
                search.starts.insert(start, index);
            }
        }

        while let Some(SmallestHolder { index: current, .. }) = search.queue.pop() {
            if target_edges.is_empty() {
                trace!("finished all targets");
                break;
            }

            let mark = search.marks[current];

            if let Some(bound) = bound {
                if mark.bound > bound.max {
                    trace!("reached maximum bound");
                    break;
                }
            }

            if let Some(target_index) = search.reaches.get(&current).copied() {
                if search.finishes.contains_key(&target_index) {
                    continue;
                }

                trace!(
                    "finished target {} on edge index {} with {} cost",
                    target_index,
                    mark.edge,
                    mark.cost
                );

                search.finishes.insert(target_index, current);
                if let Some(remaining) = target_edges.get_mut(&mark.edge) {
                    remaining.retain(|index| *index != target_index);
                    if remaining.is_empty() {
                        target_edges.remove(&mark.edge);
                    }
                }

                continue;
            }

            for successor_index in graph.successor_indices(mark.edge) {
                let Some(successor) = graph.at(*successor_index) else {
                    continue;
                };

                let successor_cost = mark.cost + cost.cost(successor);
                let successor_bound = mark.bound + bounding(successor, None);

                if let Some(reached) = target_edges.get(successor_index) {
                    for target_index in reached {
                        let remainder = 1.0 - targets[*target_index].fraction;
                        let reach = search.push(Mark {
                            edge: *successor_index,
                            previous: Some(mark.edge),
                            cost: successor_cost - cost.cost_fraction(successor, remainder),
                            bound: successor_bound - bounding(successor, Some(remainder)),
                        });

                        search.reaches.insert(reach, *target_index);
                    }
                }

                if !search.entries.contains_key(successor_index) {
                    trace!(
                        "added successor edge {} with {} cost",
                        successor.id(),
                        successor_cost
                    );

                    let entry = search.push(Mark {
                        edge: *successor_index,
                        previous: Some(mark.edge),
                        cost: successor_cost,
                        bound: successor_bound,
                    });
                    search.entries.insert(*successor_index, entry);
                }
            }
        }

        (0..targets.len())
            .map(|target_index| {
                let finish = *search.finishes.get(&target_index)?;

                let mut edges = Vec::new();
                let mut iterator = Some(finish);
                let mut start = finish;

                while let Some(index) = iterator {
                    let mark = &search.marks[index];
                    edges.push(graph.at(mark.edge)?.id());
                    start = index;
                    iterator = mark
                        .previous
                        .and_then(|previous| search.entries.get(&previous).copied());
                }

                edges.reverse();
                let source = sources[*search.starts.get(&start)?];
                Some((source, edges))
            })
            .collect()
    }
}
