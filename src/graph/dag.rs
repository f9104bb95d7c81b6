// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::collections::{BTreeMap, VecDeque};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use crate::corpus::{Corpus, Document};
use crate::errors::{ResolutionError, TaskContext};
use crate::registry::ParamValue;
use crate::traits::Annotator;

/// Index of a task in its [`DependencyGraph`].
pub type TaskId = usize;

/// One annotator bound to one document with concrete parameter values.
pub struct TaskNode {
    pub id: TaskId,
    pub annotator: Arc<dyn Annotator>,
    pub document: Arc<Document>,
    pub parameters: BTreeMap<String, ParamValue>,
    /// Raw file inputs: declared relative path -> resolved path.
    pub files: BTreeMap<String, PathBuf>,
    pub dependencies: Vec<TaskId>,
    pub dependents: Vec<TaskId>,
    /// Longest dependency chain below this task.
    pub depth: usize,
}

impl TaskNode {
    pub fn annotator_name(&self) -> &str {
        self.annotator.name()
    }

    pub fn document_id(&self) -> &str {
        self.document.id()
    }

    pub fn context(&self) -> TaskContext {
        TaskContext {
            document_id: self.document.id().to_string(),
            annotator: self.annotator.name().to_string(),
            version: self.annotator.spec().version.clone(),
            parameters: self.parameters.clone(),
        }
    }

    /// `annotator@document`, used in logs and cycle reports.
    pub fn label(&self) -> String {
        format!("{}@{}", self.annotator_name(), self.document_id())
    }
}

impl fmt::Debug for TaskNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskNode")
            .field("id", &self.id)
            .field("annotator", &self.annotator_name())
            .field("document", &self.document_id())
            .field("parameters", &self.parameters)
            .field("dependencies", &self.dependencies)
            .field("dependents", &self.dependents)
            .finish()
    }
}

/// Arena of tasks with integer edge lists.
///
/// Tasks are only ever added after all of their dependencies, so ids are
/// already a valid execution order; [`DependencyGraph::topological_order`]
/// still verifies acyclicity independently of that construction.
#[derive(Debug)]
pub struct DependencyGraph {
    nodes: Vec<TaskNode>,
    requested: Vec<String>,
    corpus: Arc<Corpus>,
}

impl DependencyGraph {
    pub(crate) fn new(corpus: Arc<Corpus>, requested: Vec<String>) -> Self {
        Self {
            nodes: Vec::new(),
            requested,
            corpus,
        }
    }

    pub(crate) fn add_task(
        &mut self,
        annotator: Arc<dyn Annotator>,
        document: Arc<Document>,
        parameters: BTreeMap<String, ParamValue>,
        files: BTreeMap<String, PathBuf>,
        mut dependencies: Vec<TaskId>,
    ) -> TaskId {
        let id = self.nodes.len();
        dependencies.sort_unstable();
        dependencies.dedup();

        let depth = dependencies
            .iter()
            .map(|&dep| self.nodes[dep].depth + 1)
            .max()
            .unwrap_or(0);
        for &dep in &dependencies {
            self.nodes[dep].dependents.push(id);
        }

        self.nodes.push(TaskNode {
            id,
            annotator,
            document,
            parameters,
            files,
            dependencies,
            dependents: Vec::new(),
            depth,
        });
        id
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: TaskId) -> &TaskNode {
        &self.nodes[id]
    }

    pub fn nodes(&self) -> &[TaskNode] {
        &self.nodes
    }

    pub fn requested_outputs(&self) -> &[String] {
        &self.requested
    }

    pub fn corpus(&self) -> &Arc<Corpus> {
        &self.corpus
    }

    /// Tasks without dependencies.
    pub fn roots(&self) -> Vec<TaskId> {
        self.nodes
            .iter()
            .filter(|n| n.dependencies.is_empty())
            .map(|n| n.id)
            .collect()
    }

    /// The task producing `output` for `document_id`, if one was planned.
    pub fn producer_of(&self, document_id: &str, output: &str) -> Option<TaskId> {
        self.nodes
            .iter()
            .find(|n| n.document_id() == document_id && n.annotator.spec().produces(output))
            .map(|n| n.id)
    }

    /// Kahn's algorithm over the arena. Fails if any task is left with
    /// unresolved dependencies, naming the tasks involved.
    pub fn topological_order(&self) -> Result<Vec<TaskId>, ResolutionError> {
        Ok(self.levels()?.into_iter().flatten().collect())
    }

    /// Tasks grouped into levels: level 0 holds the roots and every task in
    /// level N depends only on tasks in levels below N.
    pub fn levels(&self) -> Result<Vec<Vec<TaskId>>, ResolutionError> {
        let mut in_degree: Vec<usize> = self.nodes.iter().map(|n| n.dependencies.len()).collect();
        let mut current: VecDeque<TaskId> = self.roots().into();
        let mut levels = Vec::new();
        let mut visited = 0;

        while !current.is_empty() {
            let mut next = VecDeque::new();
            let mut level = Vec::with_capacity(current.len());
            while let Some(id) = current.pop_front() {
                visited += 1;
                level.push(id);
                for &dependent in &self.nodes[id].dependents {
                    in_degree[dependent] -= 1;
                    if in_degree[dependent] == 0 {
                        next.push_back(dependent);
                    }
                }
            }
            levels.push(level);
            current = next;
        }

        if visited != self.nodes.len() {
            let cycle = self
                .nodes
                .iter()
                .filter(|n| in_degree[n.id] > 0)
                .map(TaskNode::label)
                .collect();
            return Err(ResolutionError::CyclicDependency { cycle });
        }

        Ok(levels)
    }

    /// Length of the longest chain of dependents hanging off each task.
    /// Tasks on long chains are scheduled first.
    pub fn heights(&self) -> Vec<usize> {
        let mut heights = vec![0; self.nodes.len()];
        for node in self.nodes.iter().rev() {
            heights[node.id] = node
                .dependents
                .iter()
                .map(|&d| heights[d] + 1)
                .max()
                .unwrap_or(0);
        }
        heights
    }

    /// Distinct annotator names in execution order.
    pub fn annotator_plan(&self) -> Vec<&str> {
        let mut plan: Vec<&str> = Vec::new();
        for node in &self.nodes {
            if !plan.contains(&node.annotator_name()) {
                plan.push(node.annotator_name());
            }
        }
        plan
    }
}
