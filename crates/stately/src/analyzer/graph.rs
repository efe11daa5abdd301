use std::collections::{BTreeMap, BTreeSet};

/// Directed graph with deterministic iteration order.
///
/// An edge `a -> b` reads "a depends on b" for signal graphs and "a can go to
/// b" for state graphs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Graph<T: Ord + Copy> {
    edges: BTreeMap<T, BTreeSet<T>>,
}

impl<T: Ord + Copy> Default for Graph<T> {
    fn default() -> Self {
        Self {
            edges: BTreeMap::new(),
        }
    }
}

struct CycleSearch<T> {
    stack: Vec<T>,
    explored: BTreeSet<T>,
    cycles: Vec<Vec<T>>,
}

impl<T: Ord + Copy> Graph<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, node: T) {
        self.edges.entry(node).or_default();
    }

    pub fn add_edge(&mut self, from: T, to: T) {
        self.add_node(to);
        self.edges.entry(from).or_default().insert(to);
    }

    pub fn contains(&self, node: T) -> bool {
        self.edges.contains_key(&node)
    }

    pub fn has_edge(&self, from: T, to: T) -> bool {
        self.edges.get(&from).is_some_and(|succ| succ.contains(&to))
    }

    pub fn nodes(&self) -> impl Iterator<Item = T> + '_ {
        self.edges.keys().copied()
    }

    pub fn successors(&self, node: T) -> impl Iterator<Item = T> + '_ {
        self.edges.get(&node).into_iter().flatten().copied()
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Depth-first search for cycles.
    ///
    /// Reaching a node that is on the current path records the path from that
    /// node onwards as one cycle. Returns at least one cycle whenever the graph
    /// has any, but not necessarily all of them.
    pub fn find_cycles(&self) -> Vec<Vec<T>> {
        let mut search = CycleSearch {
            stack: Vec::new(),
            explored: BTreeSet::new(),
            cycles: Vec::new(),
        };
        for node in self.nodes() {
            self.search_from(node, &mut search);
        }
        search.cycles
    }

    fn search_from(&self, node: T, search: &mut CycleSearch<T>) {
        if let Some(pos) = search.stack.iter().position(|n| *n == node) {
            search.cycles.push(search.stack[pos..].to_vec());
            return;
        }
        if !search.explored.insert(node) {
            return;
        }
        search.stack.push(node);
        for next in self.successors(node) {
            self.search_from(next, search);
        }
        search.stack.pop();
    }

    /// Orders nodes so that every edge target precedes its source. Nodes only
    /// reachable through a cycle are missing, so check
    /// [`Graph::find_cycles`] first.
    pub fn toposort_no_cycles(&self) -> Vec<T> {
        let targets: BTreeSet<T> = self.edges.values().flatten().copied().collect();
        let mut visited = BTreeSet::new();
        let mut order = Vec::with_capacity(self.len());
        for root in self.nodes().filter(|n| !targets.contains(n)) {
            self.post_order(root, &mut visited, &mut order);
        }
        order
    }

    fn post_order(&self, node: T, visited: &mut BTreeSet<T>, order: &mut Vec<T>) {
        if !visited.insert(node) {
            return;
        }
        for next in self.successors(node) {
            self.post_order(next, visited, order);
        }
        order.push(node);
    }
}
