use crate::config::ServiceDescriptor;
use crate::error::{Error, Result, UnknownDependency};
use std::collections::{BTreeMap, BTreeSet, HashSet};

/// Lifecycle of a node within one resolution/start pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeStatus {
    Pending,
    Starting,
    Ready,
    Failed,
}

impl std::fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NodeStatus::Pending => write!(f, "pending"),
            NodeStatus::Starting => write!(f, "starting"),
            NodeStatus::Ready => write!(f, "ready"),
            NodeStatus::Failed => write!(f, "failed"),
        }
    }
}

/// A descriptor plus its reverse edges.
#[derive(Debug, Clone)]
pub struct ServiceNode {
    pub descriptor: ServiceDescriptor,
    /// Services that directly depend on this one.
    pub dependents: BTreeSet<String>,
    pub status: NodeStatus,
}

/// Dependency graph for one project, built fresh for every plan request.
///
/// Construction validates references and rejects cycles, so every graph
/// that exists can be layered into phases.
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    nodes: BTreeMap<String, ServiceNode>,
}

impl DependencyGraph {
    /// Build and validate a graph from a flat descriptor list.
    pub fn build(descriptors: &[ServiceDescriptor]) -> Result<Self> {
        let mut nodes = BTreeMap::new();
        for descriptor in descriptors {
            let node = ServiceNode {
                descriptor: descriptor.clone(),
                dependents: BTreeSet::new(),
                status: NodeStatus::Pending,
            };
            if nodes.insert(descriptor.name.clone(), node).is_some() {
                return Err(Error::DuplicateService(descriptor.name.clone()));
            }
        }

        let mut unknown = Vec::new();
        for descriptor in descriptors {
            for dep in &descriptor.dependencies {
                match nodes.get_mut(dep) {
                    Some(target) => {
                        target.dependents.insert(descriptor.name.clone());
                    }
                    None => unknown.push(UnknownDependency {
                        service: descriptor.name.clone(),
                        dependency: dep.clone(),
                    }),
                }
            }
        }
        if !unknown.is_empty() {
            return Err(Error::UnknownDependencies(unknown));
        }

        let graph = Self { nodes };
        if let Some(cycle) = graph.find_cycle() {
            return Err(Error::CircularDependency(cycle));
        }

        tracing::debug!("Built dependency graph with {} service(s)", graph.len());
        Ok(graph)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, name: &str) -> Option<&ServiceNode> {
        self.nodes.get(name)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &ServiceNode> {
        self.nodes.values()
    }

    pub fn status(&self, name: &str) -> Option<NodeStatus> {
        self.nodes.get(name).map(|n| n.status)
    }

    pub fn set_status(&mut self, name: &str, status: NodeStatus) {
        if let Some(node) = self.nodes.get_mut(name) {
            node.status = status;
        }
    }

    /// Direct dependents only.
    pub fn dependents(&self, name: &str) -> Vec<String> {
        self.nodes
            .get(name)
            .map(|n| n.dependents.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// True when none of `name`'s direct dependents are in `running`.
    ///
    /// Not transitive: intended for stopping one service interactively.
    pub fn can_stop_safely<S: AsRef<str>>(&self, name: &str, running: &[S]) -> bool {
        self.running_dependents(name, running).is_empty()
    }

    pub fn running_dependents<S: AsRef<str>>(&self, name: &str, running: &[S]) -> Vec<String> {
        let running: HashSet<&str> = running.iter().map(AsRef::as_ref).collect();
        self.dependents(name)
            .into_iter()
            .filter(|d| running.contains(d.as_str()))
            .collect()
    }

    /// Layer the graph into phases (Kahn-style).
    pub fn startup_plan(&self) -> Result<StartupPlan> {
        let mut placed: HashSet<&str> = HashSet::with_capacity(self.nodes.len());
        let mut phases: Vec<Vec<ServiceDescriptor>> = Vec::new();

        while placed.len() < self.nodes.len() {
            let phase: Vec<&ServiceNode> = self
                .nodes
                .values()
                .filter(|node| !placed.contains(node.descriptor.name.as_str()))
                .filter(|node| {
                    node.descriptor
                        .dependencies
                        .iter()
                        .all(|dep| placed.contains(dep.as_str()))
                })
                .collect();

            if phase.is_empty() {
                let stuck: Vec<String> = self
                    .nodes
                    .keys()
                    .filter(|name| !placed.contains(name.as_str()))
                    .cloned()
                    .collect();
                return Err(Error::UnplaceableServices(stuck));
            }

            // Placement happens after the whole phase is chosen so that a
            // node cannot satisfy a dependent in the same iteration.
            for node in &phase {
                placed.insert(node.descriptor.name.as_str());
            }
            phases.push(phase.into_iter().map(|n| n.descriptor.clone()).collect());
        }

        Ok(StartupPlan { phases })
    }

    /// Find a cycle via DFS with an explicit recursion stack.
    ///
    /// The returned path starts and ends with the same service.
    fn find_cycle(&self) -> Option<Vec<String>> {
        let mut visited = HashSet::new();
        let mut rec_stack = HashSet::new();
        let mut path = Vec::new();

        for name in self.nodes.keys() {
            if !visited.contains(name.as_str()) {
                if let Some(cycle) =
                    self.find_cycle_dfs(name, &mut visited, &mut rec_stack, &mut path)
                {
                    return Some(cycle);
                }
            }
        }
        None
    }

    fn find_cycle_dfs<'a>(
        &'a self,
        name: &'a str,
        visited: &mut HashSet<&'a str>,
        rec_stack: &mut HashSet<&'a str>,
        path: &mut Vec<&'a str>,
    ) -> Option<Vec<String>> {
        visited.insert(name);
        rec_stack.insert(name);
        path.push(name);

        if let Some(node) = self.nodes.get(name) {
            for dep in &node.descriptor.dependencies {
                if rec_stack.contains(dep.as_str()) {
                    let start = path.iter().position(|n| *n == dep.as_str()).unwrap_or(0);
                    let mut cycle: Vec<String> =
                        path[start..].iter().map(|n| n.to_string()).collect();
                    cycle.push(dep.clone());
                    return Some(cycle);
                }
                if !visited.contains(dep.as_str()) {
                    if let Some(cycle) = self.find_cycle_dfs(dep, visited, rec_stack, path) {
                        return Some(cycle);
                    }
                }
            }
        }

        rec_stack.remove(name);
        path.pop();
        None
    }
}

/// Resolve descriptors straight into a startup plan.
pub fn create_startup_plan(descriptors: &[ServiceDescriptor]) -> Result<StartupPlan> {
    DependencyGraph::build(descriptors)?.startup_plan()
}

/// Ordered phases; everything in a phase may start concurrently.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartupPlan {
    phases: Vec<Vec<ServiceDescriptor>>,
}

impl StartupPlan {
    pub fn phases(&self) -> &[Vec<ServiceDescriptor>] {
        &self.phases
    }

    pub fn phase_count(&self) -> usize {
        self.phases.len()
    }

    pub fn total_services(&self) -> usize {
        self.phases.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.phases.is_empty()
    }

    /// Every descriptor, phase by phase.
    pub fn services(&self) -> impl Iterator<Item = &ServiceDescriptor> {
        self.phases.iter().flatten()
    }

    pub fn phase_of(&self, name: &str) -> Option<usize> {
        self.phases
            .iter()
            .position(|phase| phase.iter().any(|s| s.name == name))
    }

    /// Phase contents as names only.
    pub fn phase_names(&self) -> Vec<Vec<String>> {
        self.phases
            .iter()
            .map(|phase| phase.iter().map(|s| s.name.clone()).collect())
            .collect()
    }

    /// The startup phases in reverse; never computed independently.
    pub fn shutdown_plan(&self) -> ShutdownPlan {
        let mut phases = self.phase_names();
        phases.reverse();
        ShutdownPlan { phases }
    }
}

/// Reverse of a [`StartupPlan`]: dependents are stopped before dependencies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShutdownPlan {
    phases: Vec<Vec<String>>,
}

impl ShutdownPlan {
    pub fn phases(&self) -> &[Vec<String>] {
        &self.phases
    }

    pub fn phase_count(&self) -> usize {
        self.phases.len()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.phases.iter().flatten().any(|n| n == name)
    }
}
