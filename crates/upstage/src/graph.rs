//! Dependency graph validation and ordering.

use std::cmp::Reverse;
use std::collections::{BTreeSet, BinaryHeap, HashMap};
use upstage_core::{Migration, MigrationError, StepName};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    InProgress,
    Done,
}

/// Steps as nodes, "requires" as edges. Node ids are declaration indices.
#[derive(Debug)]
pub(crate) struct DependencyGraph {
    names: Vec<StepName>,
    index: HashMap<StepName, usize>,
    requires: Vec<Vec<usize>>,
}

impl DependencyGraph {
    /// Builds and validates the graph of a catalog.
    ///
    /// Fails on duplicate names, unknown dependencies and cycles.
    pub(crate) fn new(steps: &[Box<dyn Migration>]) -> Result<Self, MigrationError> {
        let names: Vec<StepName> = steps.iter().map(|step| step.name()).collect();
        let mut index = HashMap::with_capacity(names.len());
        for (i, name) in names.iter().enumerate() {
            if index.insert(name.clone(), i).is_some() {
                return Err(MigrationError::DuplicateStep(name.clone()));
            }
        }

        let mut requires = Vec::with_capacity(steps.len());
        for (step, name) in steps.iter().zip(&names) {
            let mut edges: Vec<usize> = Vec::new();
            for dependency in step.dependencies() {
                let target = *index.get(&dependency).ok_or_else(|| {
                    MigrationError::UnresolvedDependency {
                        step: name.clone(),
                        dependency: dependency.clone(),
                    }
                })?;
                if !edges.contains(&target) {
                    edges.push(target);
                }
            }
            requires.push(edges);
        }

        let graph = Self {
            names,
            index,
            requires,
        };
        graph.check_acyclic()?;
        Ok(graph)
    }

    pub(crate) fn index_of(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub(crate) fn name(&self, node: usize) -> &StepName {
        &self.names[node]
    }

    fn check_acyclic(&self) -> Result<(), MigrationError> {
        let mut marks = vec![Mark::Unvisited; self.names.len()];
        let mut path = Vec::new();
        for node in 0..self.names.len() {
            self.visit(node, &mut marks, &mut path)?;
        }
        Ok(())
    }

    fn visit(&self, node: usize, marks: &mut [Mark], path: &mut Vec<usize>) -> Result<(), MigrationError> {
        match marks[node] {
            Mark::Done => return Ok(()),
            Mark::InProgress => {
                let start = path.iter().position(|&n| n == node).unwrap_or(0);
                let cycle = path[start..]
                    .iter()
                    .chain(std::iter::once(&node))
                    .map(|&n| self.names[n].clone())
                    .collect();
                return Err(MigrationError::CyclicDependency { cycle });
            }
            Mark::Unvisited => {}
        }

        marks[node] = Mark::InProgress;
        path.push(node);
        for &dependency in &self.requires[node] {
            self.visit(dependency, marks, path)?;
        }
        path.pop();
        marks[node] = Mark::Done;
        Ok(())
    }

    /// Topological order; among steps ready at the same time the one declared
    /// first comes first.
    pub(crate) fn order(&self) -> Vec<usize> {
        let count = self.names.len();
        let mut pending: Vec<usize> = self.requires.iter().map(Vec::len).collect();
        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); count];
        for (node, edges) in self.requires.iter().enumerate() {
            for &dependency in edges {
                dependents[dependency].push(node);
            }
        }

        let mut ready: BinaryHeap<Reverse<usize>> = (0..count)
            .filter(|&node| pending[node] == 0)
            .map(Reverse)
            .collect();
        let mut order = Vec::with_capacity(count);
        while let Some(Reverse(node)) = ready.pop() {
            order.push(node);
            for &dependent in &dependents[node] {
                pending[dependent] -= 1;
                if pending[dependent] == 0 {
                    ready.push(Reverse(dependent));
                }
            }
        }
        order
    }

    /// The given nodes plus everything they transitively require.
    pub(crate) fn closure(&self, roots: &[usize]) -> BTreeSet<usize> {
        let mut seen = BTreeSet::new();
        let mut stack = roots.to_vec();
        while let Some(node) = stack.pop() {
            if seen.insert(node) {
                stack.extend(self.requires[node].iter().copied());
            }
        }
        seen
    }
}
