use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt::Write;

use serde::Serialize;

use crate::container::key::Key;
use crate::container::registry::BindingRegistry;
use crate::container::scope::Scope;
use crate::errors::CoreError;

/// Whether an edge comes from a constructor dependency or a member (wire)
/// dependency.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeKind {
    Constructor,
    Member,
}

impl EdgeKind {
    fn as_str(&self) -> &'static str {
        match self {
            EdgeKind::Constructor => "constructor",
            EdgeKind::Member => "member",
        }
    }
}

#[derive(Debug, Clone)]
struct NodeInfo {
    scope: Scope,
    strategy: &'static str,
    module: Option<&'static str>,
}

/// Serializable node in the JSON export
#[derive(Debug, Clone, Serialize)]
pub struct GraphNode {
    pub key: String,
    pub scope: String,
    pub strategy: String,
    pub module: Option<String>,
}

/// Serializable edge in the JSON export
#[derive(Debug, Clone, Serialize)]
pub struct GraphEdge {
    pub from: String,
    pub to: String,
    pub kind: String,
}

/// Summary statistics attached to the JSON export
#[derive(Debug, Clone, Serialize)]
pub struct GraphStats {
    pub node_count: usize,
    pub edge_count: usize,
    pub singleton_count: usize,
    pub cycle_count: usize,
}

#[derive(Debug, Serialize)]
struct GraphExport {
    nodes: Vec<GraphNode>,
    edges: Vec<GraphEdge>,
    stats: GraphStats,
}

/// Read-only dependency-graph view over a frozen registry.
///
/// Built from every binding's dependency descriptor (constructor plus member
/// keys). Cycle enumeration here is diagnostic only: whether a cycle is fatal
/// is decided during resolution, because interface bindings with cycle
/// proxies make their cycles legal.
#[derive(Debug)]
pub struct DependencyGraph {
    nodes: HashMap<Key, NodeInfo>,
    edges: HashMap<Key, Vec<(Key, EdgeKind)>>,
    dependents: HashMap<Key, Vec<Key>>,
}

impl DependencyGraph {
    /// Build the graph view from a registry's bindings
    pub fn from_registry(registry: &BindingRegistry) -> Self {
        let mut nodes = HashMap::new();
        let mut edges: HashMap<Key, Vec<(Key, EdgeKind)>> = HashMap::new();
        let mut dependents: HashMap<Key, Vec<Key>> = HashMap::new();

        for binding in registry.bindings() {
            let key = binding.key().clone();
            nodes.insert(
                key.clone(),
                NodeInfo {
                    scope: binding.scope(),
                    strategy: binding.strategy_kind(),
                    module: binding.module(),
                },
            );

            let mut outgoing = Vec::new();
            for dep in binding.dependencies() {
                outgoing.push((dep.clone(), EdgeKind::Constructor));
                dependents.entry(dep.clone()).or_default().push(key.clone());
            }
            for dep in binding.member_dependencies() {
                outgoing.push((dep.clone(), EdgeKind::Member));
                dependents.entry(dep.clone()).or_default().push(key.clone());
            }
            edges.insert(key, outgoing);
        }

        Self {
            nodes,
            edges,
            dependents,
        }
    }

    /// Number of bindings in the view
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of declared dependency edges
    pub fn edge_count(&self) -> usize {
        self.edges.values().map(Vec::len).sum()
    }

    /// Declared dependencies of a key, constructor edges first
    pub fn dependencies_of(&self, key: &Key) -> Vec<Key> {
        self.edges
            .get(key)
            .map(|outgoing| outgoing.iter().map(|(dep, _)| dep.clone()).collect())
            .unwrap_or_default()
    }

    /// Keys that declare a dependency on `key`
    pub fn dependents_of(&self, key: &Key) -> Vec<Key> {
        self.dependents.get(key).cloned().unwrap_or_default()
    }

    /// Topological order over the acyclic portion of the graph:
    /// dependencies come before their dependents. Keys involved in a cycle
    /// are omitted; compare the result length with [`node_count`] to notice.
    ///
    /// [`node_count`]: DependencyGraph::node_count
    pub fn sorted_keys(&self) -> Vec<Key> {
        // Kahn over in-degrees; edges to unbound keys do not count.
        let mut in_degree: HashMap<&Key, usize> = HashMap::new();
        for key in self.nodes.keys() {
            in_degree.insert(key, 0);
        }
        for outgoing in self.edges.values() {
            for (dep, _) in outgoing {
                if let Some(degree) = in_degree.get_mut(dep) {
                    *degree += 1;
                }
            }
        }

        let mut queue: VecDeque<&Key> = in_degree
            .iter()
            .filter(|(_, degree)| **degree == 0)
            .map(|(key, _)| *key)
            .collect();
        let mut order = Vec::new();
        while let Some(key) = queue.pop_front() {
            order.push(key.clone());
            if let Some(outgoing) = self.edges.get(key) {
                for (dep, _) in outgoing {
                    if let Some(degree) = in_degree.get_mut(dep) {
                        *degree -= 1;
                        if *degree == 0 {
                            queue.push_back(dep);
                        }
                    }
                }
            }
        }

        // Dependents were processed before dependencies; flip so leaves lead.
        order.reverse();
        order
    }

    /// Report declared cycles, each as the key path that closes it.
    ///
    /// A diagnostic view, not an exhaustive enumeration: the traversal skips
    /// fully-explored nodes, so of several cycles sharing a node at least one
    /// path per reachable loop is reported. An empty result means the graph
    /// is acyclic.
    pub fn cycles(&self) -> Vec<Vec<Key>> {
        let mut found = Vec::new();
        let mut seen_forms = HashSet::new();
        let mut visited = HashSet::new();

        for start in self.nodes.keys() {
            if !visited.contains(start) {
                let mut stack = Vec::new();
                self.collect_cycles(start, &mut stack, &mut visited, &mut seen_forms, &mut found);
            }
        }
        found
    }

    fn collect_cycles(
        &self,
        key: &Key,
        stack: &mut Vec<Key>,
        visited: &mut HashSet<Key>,
        seen_forms: &mut HashSet<String>,
        found: &mut Vec<Vec<Key>>,
    ) {
        if let Some(position) = stack.iter().position(|entry| entry == key) {
            let cycle: Vec<Key> = stack[position..].to_vec();
            if seen_forms.insert(normalize_cycle(&cycle)) {
                found.push(cycle);
            }
            return;
        }
        if visited.contains(key) {
            return;
        }

        stack.push(key.clone());
        if let Some(outgoing) = self.edges.get(key) {
            for (dep, _) in outgoing {
                if self.nodes.contains_key(dep) {
                    self.collect_cycles(dep, stack, visited, seen_forms, found);
                }
            }
        }
        stack.pop();
        visited.insert(key.clone());
    }

    /// Render the graph as Graphviz DOT; singleton nodes are filled
    pub fn to_dot(&self) -> String {
        let mut dot = String::new();
        writeln!(dot, "digraph dependencies {{").unwrap();
        writeln!(dot, "    rankdir=TB;").unwrap();
        writeln!(dot, "    node [shape=rectangle];").unwrap();
        writeln!(dot).unwrap();

        let escape = |key: &Key| key.to_string().replace('"', "\\\"");
        let mut keys: Vec<&Key> = self.nodes.keys().collect();
        keys.sort_by_key(|key| key.to_string());
        for key in &keys {
            let info = &self.nodes[*key];
            let mut attrs = vec![format!("label=\"{}\\n({})\"", escape(key), info.scope)];
            if info.scope.is_singleton() {
                attrs.push("style=filled".to_string());
                attrs.push("fillcolor=lightblue".to_string());
            }
            writeln!(dot, "    \"{}\" [{}];", escape(key), attrs.join(", ")).unwrap();
        }

        writeln!(dot).unwrap();
        for key in &keys {
            if let Some(outgoing) = self.edges.get(*key) {
                for (dep, kind) in outgoing {
                    let attrs = match kind {
                        EdgeKind::Constructor => "",
                        EdgeKind::Member => " [style=dashed]",
                    };
                    writeln!(dot, "    \"{}\" -> \"{}\"{};", escape(key), escape(dep), attrs)
                        .unwrap();
                }
            }
        }
        writeln!(dot, "}}").unwrap();
        dot
    }

    /// Serialize the graph (nodes, edges, stats) as pretty-printed JSON
    pub fn to_json(&self) -> Result<String, CoreError> {
        let mut nodes: Vec<GraphNode> = self
            .nodes
            .iter()
            .map(|(key, info)| GraphNode {
                key: key.to_string(),
                scope: info.scope.to_string(),
                strategy: info.strategy.to_string(),
                module: info.module.map(str::to_string),
            })
            .collect();
        nodes.sort_by(|a, b| a.key.cmp(&b.key));

        let mut edges = Vec::new();
        for (key, outgoing) in &self.edges {
            for (dep, kind) in outgoing {
                edges.push(GraphEdge {
                    from: key.to_string(),
                    to: dep.to_string(),
                    kind: kind.as_str().to_string(),
                });
            }
        }
        edges.sort_by(|a, b| (&a.from, &a.to).cmp(&(&b.from, &b.to)));

        let stats = GraphStats {
            node_count: self.node_count(),
            edge_count: self.edge_count(),
            singleton_count: self
                .nodes
                .values()
                .filter(|info| info.scope.is_singleton())
                .count(),
            cycle_count: self.cycles().len(),
        };

        let export = GraphExport {
            nodes,
            edges,
            stats,
        };
        Ok(serde_json::to_string_pretty(&export)?)
    }
}

/// Rotate a cycle so its lexicographically-smallest key leads, giving every
/// traversal of the same loop one canonical form.
fn normalize_cycle(cycle: &[Key]) -> String {
    let rendered: Vec<String> = cycle.iter().map(|key| key.to_string()).collect();
    let smallest = rendered
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| a.cmp(b))
        .map(|(index, _)| index)
        .unwrap_or(0);
    let mut rotated = rendered[smallest..].to_vec();
    rotated.extend_from_slice(&rendered[..smallest]);
    rotated.join(" -> ")
}
