use std::collections::{HashMap, HashSet};

use crate::error::SchedulerError;

use super::task::TaskLike;

/// A validated graph flattened for execution: tasks in insertion order and,
/// per task, the indices of the tasks that depend on it.
#[derive(Debug)]
pub struct IndexedGraph<T> {
    pub tasks: Vec<T>,
    pub dependents: Vec<Vec<usize>>,
}

/// Task dependency graph (DAG)
#[derive(Debug)]
pub struct TaskGraph<T: TaskLike> {
    /// Task nodes: task_id -> Task
    nodes: HashMap<String, T>,

    /// Reverse edges: task_id -> tasks that depend on it
    reverse_edges: HashMap<String, Vec<String>>,

    /// Original insertion order (scheduling priority)
    insertion_order: Vec<String>,
}

impl<T: TaskLike> Default for TaskGraph<T> {
    fn default() -> Self {
        Self {
            nodes: HashMap::new(),
            reverse_edges: HashMap::new(),
            insertion_order: Vec::new(),
        }
    }
}

impl<T: TaskLike> TaskGraph<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&T> {
        self.nodes.get(id)
    }

    /// Tasks that declared a dependency on `id`, in the order the edges
    /// were added.
    pub fn dependents(&self, id: &str) -> &[String] {
        self.reverse_edges
            .get(id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn add_node(&mut self, task: T) -> Result<(), SchedulerError> {
        let task_id = task.id().to_string();
        if self.nodes.contains_key(&task_id) {
            return Err(SchedulerError::DuplicateTaskId(task_id));
        }

        for dep in task.dependencies() {
            self.reverse_edges
                .entry(dep.clone())
                .or_default()
                .push(task_id.clone());
        }
        self.insertion_order.push(task_id.clone());
        self.nodes.insert(task_id, task);
        Ok(())
    }

    /// Adds `task_id -> dep` edges. Every id must already be registered;
    /// nothing is changed when one is not.
    pub fn add_edges<I, S>(&mut self, task_id: &str, dependencies: I) -> Result<(), SchedulerError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        if !self.nodes.contains_key(task_id) {
            return Err(SchedulerError::TaskNotFound(task_id.to_string()));
        }

        let deps: Vec<String> = dependencies
            .into_iter()
            .map(|d| d.as_ref().to_string())
            .collect();
        if let Some(missing) = deps.iter().find(|d| !self.nodes.contains_key(d.as_str())) {
            return Err(SchedulerError::DependencyNotFound {
                task_id: task_id.to_string(),
                missing_dep: missing.clone(),
            });
        }

        let Some(task) = self.nodes.get_mut(task_id) else {
            return Err(SchedulerError::TaskNotFound(task_id.to_string()));
        };
        for dep in deps {
            if task.add_dependency(dep.clone()) {
                self.reverse_edges
                    .entry(dep)
                    .or_default()
                    .push(task_id.to_string());
            }
        }
        Ok(())
    }

    /// Validate dependency relationships
    pub fn validate(&self) -> Result<(), SchedulerError> {
        // Check all dependencies exist
        for task_id in &self.insertion_order {
            for dep in self.nodes[task_id].dependencies() {
                if !self.nodes.contains_key(dep) {
                    return Err(SchedulerError::DependencyNotFound {
                        task_id: task_id.clone(),
                        missing_dep: dep.clone(),
                    });
                }
            }
        }

        // Detect circular dependencies
        if let Some(cycle) = self.detect_cycle() {
            return Err(SchedulerError::CircularDependency(cycle));
        }

        Ok(())
    }

    pub fn into_indexed(mut self) -> IndexedGraph<T> {
        let position: HashMap<&str, usize> = self
            .insertion_order
            .iter()
            .enumerate()
            .map(|(i, id)| (id.as_str(), i))
            .collect();

        let dependents: Vec<Vec<usize>> = self
            .insertion_order
            .iter()
            .map(|id| {
                self.dependents(id)
                    .iter()
                    .filter_map(|d| position.get(d.as_str()).copied())
                    .collect()
            })
            .collect();

        let order = std::mem::take(&mut self.insertion_order);
        let tasks = order
            .iter()
            .filter_map(|id| self.nodes.remove(id))
            .collect();

        IndexedGraph { tasks, dependents }
    }

    /// Topological sort using Kahn's algorithm
    ///
    /// Returns levels where every task only depends on tasks of earlier
    /// levels. Used for the execution plan printed in verbose mode; the
    /// scheduler itself does not wait for whole levels.
    ///
    /// # Time Complexity
    ///
    /// O(V + E) where V = number of tasks, E = number of dependencies
    pub fn topological_sort(&self) -> Result<Vec<Vec<String>>, SchedulerError> {
        let position: HashMap<&str, usize> = self
            .insertion_order
            .iter()
            .enumerate()
            .map(|(i, id)| (id.as_str(), i))
            .collect();

        let mut in_degree: HashMap<&str, usize> = self
            .nodes
            .iter()
            .map(|(id, task)| (id.as_str(), task.dependencies().len()))
            .collect();

        let mut current_stage: Vec<String> = self
            .insertion_order
            .iter()
            .filter(|id| in_degree[id.as_str()] == 0)
            .cloned()
            .collect();

        let mut stages: Vec<Vec<String>> = Vec::new();
        let mut processed = 0;

        while !current_stage.is_empty() {
            processed += current_stage.len();

            let mut next_stage = Vec::new();
            for task_id in &current_stage {
                for dependent in self.dependents(task_id) {
                    if let Some(degree) = in_degree.get_mut(dependent.as_str()) {
                        *degree -= 1;
                        if *degree == 0 {
                            next_stage.push(dependent.clone());
                        }
                    }
                }
            }

            // Preserve input order
            next_stage.sort_by_key(|id| position.get(id.as_str()).copied().unwrap_or(usize::MAX));

            stages.push(std::mem::replace(&mut current_stage, next_stage));
        }

        // Verify all nodes processed (no cycles)
        if processed != self.nodes.len() {
            return Err(SchedulerError::CircularDependency(
                "unable to complete topological sort".to_string(),
            ));
        }

        Ok(stages)
    }

    /// Detect circular dependencies using DFS
    ///
    /// Roots are visited in insertion order so the reported cycle is stable
    /// across runs.
    fn detect_cycle(&self) -> Option<String> {
        let mut visited = HashSet::new();
        let mut stack = Vec::new();

        for task_id in &self.insertion_order {
            if !visited.contains(task_id) && self.dfs_cycle(task_id, &mut visited, &mut stack) {
                return Some(format_cycle_path(&stack));
            }
        }

        None
    }

    fn dfs_cycle(
        &self,
        node: &str,
        visited: &mut HashSet<String>,
        stack: &mut Vec<String>,
    ) -> bool {
        visited.insert(node.to_string());
        stack.push(node.to_string());

        if let Some(task) = self.nodes.get(node) {
            for dep in task.dependencies() {
                // Check if dependency is in current path (cycle detected)
                if let Some(pos) = stack.iter().position(|x| x == dep) {
                    stack.push(dep.clone());
                    *stack = stack[pos..].to_vec();
                    return true;
                }

                // Recursively check unvisited dependencies
                if !visited.contains(dep) && self.dfs_cycle(dep, visited, stack) {
                    return true;
                }
            }
        }

        stack.pop();
        false
    }
}

fn format_cycle_path(stack: &[String]) -> String {
    stack.join(" -> ")
}
