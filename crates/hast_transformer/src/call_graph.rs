//! The member call graph and invocation instance-count propagation.

use crate::tree::{Expression, Member, Statement, SyntaxTree};
use hast_config::TransformerConfig;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::{Bfs, EdgeRef};
use petgraph::Direction;
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::ops::Range;

/// Directed graph of calls between members, keyed by full member name.
///
/// An edge's weight is the largest number of invocations of the callee the
/// caller keeps running at the same time: 1 for a plain call, the degree
/// for a parallel invocation.
#[derive(Debug, Clone, Default)]
pub struct CallGraph {
    graph: DiGraph<String, u32>,
    nodes: BTreeMap<String, NodeIndex>,
}

impl CallGraph {
    /// Builds the graph of every member in `tree`. Aliases are resolved to
    /// full names; calls to unknown members are skipped.
    pub fn from_tree(tree: &SyntaxTree) -> Self {
        let mut call_graph = Self::default();
        let mut members: Vec<&Member> = tree.members.iter().collect();
        members.sort_by(|a, b| a.full_name.cmp(&b.full_name));
        for member in &members {
            call_graph.node(&member.full_name);
        }
        for member in members {
            for (callee, concurrent) in direct_calls(member) {
                if let Some(callee) = tree.member(callee) {
                    call_graph.add_call(&member.full_name, &callee.full_name, concurrent);
                }
            }
        }
        call_graph
    }

    fn node(&mut self, name: &str) -> NodeIndex {
        if let Some(index) = self.nodes.get(name) {
            return *index;
        }
        let index = self.graph.add_node(name.to_string());
        self.nodes.insert(name.to_string(), index);
        index
    }

    /// Records that `caller` runs up to `concurrent` invocations of `callee`
    /// at once. Repeated calls keep the largest count.
    pub fn add_call(&mut self, caller: &str, callee: &str, concurrent: u32) {
        let from = self.node(caller);
        let to = self.node(callee);
        match self.graph.find_edge(from, to) {
            Some(edge) => {
                let weight = &mut self.graph[edge];
                *weight = (*weight).max(concurrent);
            }
            None => {
                self.graph.add_edge(from, to, concurrent);
            }
        }
    }

    /// Number of members.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` if the graph has no members.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Members called by `member` with their concurrency, sorted by name.
    pub fn callees(&self, member: &str) -> Vec<(&str, u32)> {
        self.neighbors(member, Direction::Outgoing)
    }

    /// Members calling `member` with their concurrency, sorted by name.
    pub fn callers(&self, member: &str) -> Vec<(&str, u32)> {
        self.neighbors(member, Direction::Incoming)
    }

    fn neighbors(&self, member: &str, direction: Direction) -> Vec<(&str, u32)> {
        let Some(&index) = self.nodes.get(member) else {
            return Vec::new();
        };
        let mut neighbors: Vec<(&str, u32)> = self
            .graph
            .edges_directed(index, direction)
            .map(|edge| {
                let other = match direction {
                    Direction::Outgoing => edge.target(),
                    Direction::Incoming => edge.source(),
                };
                (self.graph[other].as_str(), *edge.weight())
            })
            .collect();
        neighbors.sort_unstable();
        neighbors
    }

    /// Whether a member other than `member` itself calls it.
    pub fn is_called_by_other_members(&self, member: &str) -> bool {
        self.callers(member).iter().any(|(caller, _)| *caller != member)
    }

    /// Every member reachable from `roots`, the roots included.
    pub fn reachable_from<'a>(&self, roots: impl IntoIterator<Item = &'a str>) -> BTreeSet<String> {
        let mut reachable = BTreeSet::new();
        for root in roots {
            let Some(&start) = self.nodes.get(root) else {
                continue;
            };
            let mut bfs = Bfs::new(&self.graph, start);
            while let Some(node) = bfs.next(&self.graph) {
                reachable.insert(self.graph[node].clone());
            }
        }
        reachable
    }

    /// Computes how many hardware instances every member needs.
    ///
    /// Starting from each member's configured count, a callee is raised to
    /// the count of every caller and to the concurrency of every call edge
    /// until nothing changes. Self-calls never raise counts; recursion depth
    /// is part of the configured count. Members in `interface_members` that
    /// other members also call get one extra instance, reserved for the
    /// host.
    pub fn propagate_instance_counts(
        &self,
        config: &TransformerConfig,
        interface_members: &BTreeSet<String>,
    ) -> InstanceCounts {
        let mut counts: BTreeMap<String, u32> = self
            .nodes
            .keys()
            .map(|name| {
                let configured = config
                    .instance_count_configuration_for(name)
                    .max_invocation_instance_count();
                (name.clone(), configured.max(1))
            })
            .collect();

        let mut worklist: VecDeque<NodeIndex> = self.nodes.values().copied().collect();
        while let Some(node) = worklist.pop_front() {
            let caller_count = counts[&self.graph[node]];
            for edge in self.graph.edges(node) {
                let target = edge.target();
                if target == node {
                    continue;
                }
                let required = caller_count.max(*edge.weight());
                if let Some(count) = counts.get_mut(&self.graph[target]) {
                    if required > *count {
                        *count = required;
                        worklist.push_back(target);
                    }
                }
            }
        }

        let mut reserved_for_host = BTreeSet::new();
        for name in interface_members {
            if self.is_called_by_other_members(name) {
                if let Some(count) = counts.get_mut(name) {
                    *count += 1;
                    reserved_for_host.insert(name.clone());
                }
            }
        }

        InstanceCounts {
            counts,
            reserved_for_host,
        }
    }
}

/// Calls made directly by `member` with their concurrency.
fn direct_calls(member: &Member) -> Vec<(&str, u32)> {
    let mut calls = Vec::new();
    member.for_each_statement(&mut |statement| {
        match statement {
            Statement::Call { member, .. } => calls.push((member.as_str(), 1)),
            Statement::Parallel { member, degree, .. } => calls.push((member.as_str(), *degree)),
            _ => {}
        }
        for expression in statement.expressions() {
            expression.for_each(&mut |nested| {
                if let Expression::Call { member, .. } = nested {
                    calls.push((member.as_str(), 1));
                }
            });
        }
    });
    calls
}

/// Result of instance-count propagation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstanceCounts {
    counts: BTreeMap<String, u32>,
    reserved_for_host: BTreeSet<String>,
}

impl InstanceCounts {
    /// Total number of instances of `member`; 1 for unknown members.
    pub fn count(&self, member: &str) -> u32 {
        self.counts.get(member).copied().unwrap_or(1)
    }

    /// Whether instance 0 of `member` is driven by the host only.
    pub fn is_reserved_for_host(&self, member: &str) -> bool {
        self.reserved_for_host.contains(member)
    }

    /// Instances other members may call.
    pub fn internal_instances(&self, member: &str) -> Range<u32> {
        let first = u32::from(self.is_reserved_for_host(member));
        first..self.count(member)
    }

    /// Every member with its count, sorted by name.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.counts.iter().map(|(name, count)| (name.as_str(), *count))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hast_config::MemberInvocationInstanceCountConfiguration;

    fn chain() -> CallGraph {
        let mut graph = CallGraph::default();
        graph.add_call("A", "B", 1);
        graph.add_call("B", "C", 1);
        graph
    }

    fn interfaces(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|name| name.to_string()).collect()
    }

    #[test]
    fn parallelism_propagates_down_the_chain() {
        let mut config = TransformerConfig::default();
        config.add_or_replace(
            MemberInvocationInstanceCountConfiguration::new("A").with_max_degree_of_parallelism(5),
        );
        let counts = chain().propagate_instance_counts(&config, &interfaces(&["A"]));
        assert_eq!(counts.count("A"), 5);
        assert!(counts.count("B") >= 5);
        assert!(counts.count("C") >= 5);
    }

    #[test]
    fn parallel_edges_raise_callee() {
        let mut graph = CallGraph::default();
        graph.add_call("A", "Task", 1);
        graph.add_call("A", "Task", 4);
        assert_eq!(graph.callees("A"), vec![("Task", 4)]);
        let counts = graph.propagate_instance_counts(&TransformerConfig::default(), &interfaces(&["A"]));
        assert_eq!(counts.count("A"), 1);
        assert_eq!(counts.count("Task"), 4);
    }

    #[test]
    fn self_calls_do_not_raise_counts() {
        let mut graph = CallGraph::default();
        graph.add_call("Fib", "Fib", 1);
        let mut config = TransformerConfig::default();
        config.add_or_replace(MemberInvocationInstanceCountConfiguration::new("Fib").with_max_recursion_depth(3));
        let counts = graph.propagate_instance_counts(&config, &interfaces(&["Fib"]));
        assert_eq!(counts.count("Fib"), 4);
        assert!(!counts.is_reserved_for_host("Fib"));
        assert_eq!(counts.internal_instances("Fib"), 0..4);
    }

    #[test]
    fn internally_called_interface_member_reserves_instance_zero() {
        let mut graph = CallGraph::default();
        graph.add_call("Run", "Helper", 1);
        let counts = graph.propagate_instance_counts(&TransformerConfig::default(), &interfaces(&["Run", "Helper"]));
        assert_eq!(counts.count("Run"), 1);
        assert_eq!(counts.count("Helper"), 2);
        assert!(counts.is_reserved_for_host("Helper"));
        assert_eq!(counts.internal_instances("Helper"), 1..2);
    }

    #[test]
    fn cycles_reach_a_fixed_point() {
        let mut graph = CallGraph::default();
        graph.add_call("A", "B", 1);
        graph.add_call("B", "A", 1);
        graph.add_call("B", "C", 3);
        let counts = graph.propagate_instance_counts(&TransformerConfig::default(), &BTreeSet::new());
        assert_eq!(counts.count("A"), 1);
        assert_eq!(counts.count("B"), 1);
        assert_eq!(counts.count("C"), 3);
    }

    #[test]
    fn reachability() {
        let mut graph = chain();
        graph.add_call("Unused", "C", 1);
        let reachable = graph.reachable_from(["B"]);
        assert_eq!(reachable, interfaces(&["B", "C"]));
        assert_eq!(graph.callers("C"), vec![("B", 1), ("Unused", 1)]);
        assert!(graph.is_called_by_other_members("C"));
        assert!(!graph.is_called_by_other_members("A"));
    }

    #[test]
    fn built_from_tree_with_aliases() {
        let mut callee = Member::new("Samples.Calc::Add()");
        callee.aliases.push("Samples.Calc::AddAsync()".to_string());
        let mut caller = Member::new("Samples.Calc::Run()");
        caller.body = vec![Statement::Parallel {
            member: "Samples.Calc::AddAsync()".to_string(),
            degree: 3,
            arguments: Vec::new(),
            results: Vec::new(),
            pass_index: true,
        }];
        let tree = SyntaxTree {
            types: Vec::new(),
            members: vec![caller, callee],
        };
        let graph = CallGraph::from_tree(&tree);
        assert_eq!(graph.len(), 2);
        assert_eq!(graph.callees("Samples.Calc::Run()"), vec![("Samples.Calc::Add()", 3)]);
    }
}
