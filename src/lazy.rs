//! Deferred execution as an explicit task DAG.
//!
//! In lazy mode every call produces a [`Placeholder`]: an opaque handle
//! owning a task graph whose nodes are plans plus upstream task keys.
//! Eager values entering a lazy call become constant tasks. Keys are
//! deterministic hashes of `(plan, arg keys)`, so structurally equal
//! pending computations collide onto one task and merging graphs
//! deduplicates shared upstream work. Placeholders are only ever built from
//! existing placeholders, which keeps the graph acyclic by construction.

use crate::dispatch::{self, ArgClass, CallArg, ExecuteError};
use crate::plan::{Plan, ReturnType};
use crate::properties::PropertyMap;
use crate::resolver::Resolver;
use crate::types::{ConcreteTypeId, TypeInfo};
use crate::value::{ScalarType, Value};
use rayon::prelude::*;
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

pub type TaskKey = u64;

#[derive(Debug, thiserror::Error)]
pub enum TaskGraphError {
    #[error("task graph has no entry for key {0:#x}")]
    MissingTask(TaskKey),
    #[error("task graph made no progress; {remaining} tasks unresolved")]
    Stalled { remaining: usize },
    #[error(transparent)]
    Execute(#[from] ExecuteError),
}

/// One node of the deferred DAG.
#[derive(Debug, Clone)]
pub enum Task {
    /// An eager value wrapped into the graph.
    Constant(Value),
    /// A dispatched call awaiting its upstream results.
    Call { plan: Arc<Plan>, args: Vec<TaskKey> },
}

impl Task {
    fn upstream(&self) -> &[TaskKey] {
        match self {
            Task::Constant(_) => &[],
            Task::Call { args, .. } => args,
        }
    }
}

/// Key-addressed task store. Merging is idempotent per key: equal keys mean
/// structurally equal pending computations.
#[derive(Debug, Clone, Default)]
pub struct TaskGraph {
    tasks: HashMap<TaskKey, Task>,
}

impl TaskGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn get(&self, key: TaskKey) -> Option<&Task> {
        self.tasks.get(&key)
    }

    pub fn insert(&mut self, key: TaskKey, task: Task) {
        self.tasks.entry(key).or_insert(task);
    }

    pub fn merge(&mut self, other: &TaskGraph) {
        for (key, task) in &other.tasks {
            self.tasks.entry(*key).or_insert_with(|| task.clone());
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = TaskKey> + '_ {
        self.tasks.keys().copied()
    }
}

/// Deterministic key of an eager value wrapped as a constant task. Scalars
/// hash by content; plugin objects by the shared `Arc` identity, so the same
/// object wrapped twice lands on the same task.
fn constant_key(value: &Value) -> TaskKey {
    let mut h = DefaultHasher::new();
    match value {
        Value::Bool(v) => ("bool", v).hash(&mut h),
        Value::Int(v) => ("int", v).hash(&mut h),
        Value::Float(v) => ("float", v.to_bits()).hash(&mut h),
        Value::Str(v) => ("str", v).hash(&mut h),
        Value::NodeId(v) => ("node", v).hash(&mut h),
        Value::Object(_) => ("object", value.object_identity()).hash(&mut h),
    }
    h.finish()
}

fn call_key(plan: &Plan, arg_keys: &[TaskKey]) -> TaskKey {
    let mut h = DefaultHasher::new();
    plan.hash(&mut h);
    arg_keys.hash(&mut h);
    h.finish()
}

/// What a placeholder will be once materialized.
#[derive(Debug, Clone)]
enum PlaceholderReturn {
    Concrete {
        concrete: ConcreteTypeId,
        abstract_props: PropertyMap,
    },
    Scalar(ScalarType),
}

/// Opaque handle to a pending computation. Owns the task subgraph that
/// produces it, like a deferred collection owns its own task dictionary.
#[derive(Debug, Clone)]
pub struct Placeholder {
    key: TaskKey,
    ret: PlaceholderReturn,
    graph: TaskGraph,
}

impl Placeholder {
    /// Defer a dispatched call. `bound` is one argument per parameter in
    /// signature order; eager values become constant tasks, placeholders
    /// contribute their subgraphs.
    pub(crate) fn from_call(plan: Plan, bound: &[CallArg]) -> Self {
        let mut graph = TaskGraph::new();
        let mut arg_keys = Vec::with_capacity(bound.len());
        for arg in bound {
            match arg {
                CallArg::Value(v) => {
                    let key = constant_key(v);
                    graph.insert(key, Task::Constant(v.clone()));
                    arg_keys.push(key);
                }
                CallArg::Deferred(p) => {
                    graph.merge(&p.graph);
                    arg_keys.push(p.key);
                }
            }
        }
        let ret = match &plan.ret {
            ReturnType::Concrete {
                concrete,
                constraints,
            } => PlaceholderReturn::Concrete {
                concrete: *concrete,
                abstract_props: constraints.clone(),
            },
            ReturnType::Scalar(kind) => PlaceholderReturn::Scalar(*kind),
        };
        let key = call_key(&plan, &arg_keys);
        graph.insert(
            key,
            Task::Call {
                plan: Arc::new(plan),
                args: arg_keys,
            },
        );
        Self { key, ret, graph }
    }

    pub fn key(&self) -> TaskKey {
        self.key
    }

    /// The concrete type this placeholder materializes to, `None` for
    /// scalar-returning calls.
    pub fn concrete_type(&self) -> Option<ConcreteTypeId> {
        match &self.ret {
            PlaceholderReturn::Concrete { concrete, .. } => Some(*concrete),
            PlaceholderReturn::Scalar(_) => None,
        }
    }

    pub fn scalar_type(&self) -> Option<ScalarType> {
        match &self.ret {
            PlaceholderReturn::Concrete { .. } => None,
            PlaceholderReturn::Scalar(kind) => Some(*kind),
        }
    }

    /// Keys of the tasks this placeholder's own task depends on.
    pub fn upstream_keys(&self) -> Vec<TaskKey> {
        self.graph
            .get(self.key)
            .map(|task| task.upstream().to_vec())
            .unwrap_or_default()
    }

    pub fn graph(&self) -> &TaskGraph {
        &self.graph
    }

    /// Classification used by dispatch when this placeholder flows into a
    /// later call: the declared return type plus its declared abstract
    /// property constraints.
    pub(crate) fn type_class(&self) -> ArgClass {
        match &self.ret {
            PlaceholderReturn::Concrete {
                concrete,
                abstract_props,
            } => ArgClass::Typed {
                concrete: *concrete,
                info: TypeInfo::new(abstract_props.clone(), PropertyMap::new()),
            },
            PlaceholderReturn::Scalar(kind) => ArgClass::Scalar(*kind),
        }
    }

    /// Materialize on demand: depth-first evaluation of the owned subgraph.
    pub fn compute(&self, resolver: &Resolver) -> Result<Value, TaskGraphError> {
        let mut done: HashMap<TaskKey, Value> = HashMap::new();
        let mut stack = vec![self.key];
        while let Some(&key) = stack.last() {
            if done.contains_key(&key) {
                stack.pop();
                continue;
            }
            let task = self
                .graph
                .get(key)
                .ok_or(TaskGraphError::MissingTask(key))?;
            match task {
                Task::Constant(v) => {
                    done.insert(key, v.clone());
                    stack.pop();
                }
                Task::Call { plan, args } => {
                    let pending: Vec<TaskKey> = args
                        .iter()
                        .copied()
                        .filter(|k| !done.contains_key(k))
                        .collect();
                    if pending.is_empty() {
                        let values: Vec<Value> =
                            args.iter().map(|k| done[k].clone()).collect();
                        let value = dispatch::execute(
                            resolver.registry(),
                            plan,
                            &values,
                            resolver.config().strict_return_type_check,
                        )?;
                        done.insert(key, value);
                        stack.pop();
                    } else {
                        stack.extend(pending);
                    }
                }
            }
        }
        done.remove(&self.key)
            .ok_or(TaskGraphError::MissingTask(self.key))
    }
}

/// Materialize several placeholders through one merged graph. Independent
/// tasks of each ready wave run on the rayon pool; shared upstream tasks are
/// evaluated exactly once.
pub fn execute_all(
    resolver: &Resolver,
    placeholders: &[&Placeholder],
) -> Result<Vec<Value>, TaskGraphError> {
    let mut graph = TaskGraph::new();
    for p in placeholders {
        graph.merge(&p.graph);
    }

    let mut done: HashMap<TaskKey, Value> = HashMap::new();
    while done.len() < graph.len() {
        let wave: Vec<(TaskKey, &Task)> = graph
            .tasks
            .iter()
            .filter(|(key, task)| {
                !done.contains_key(*key)
                    && task.upstream().iter().all(|dep| done.contains_key(dep))
            })
            .map(|(key, task)| (*key, task))
            .collect();
        if wave.is_empty() {
            return Err(TaskGraphError::Stalled {
                remaining: graph.len() - done.len(),
            });
        }
        let results: Vec<(TaskKey, Value)> = wave
            .into_par_iter()
            .map(|(key, task)| -> Result<(TaskKey, Value), TaskGraphError> {
                let value = match task {
                    Task::Constant(v) => v.clone(),
                    Task::Call { plan, args } => {
                        let values: Vec<Value> = args.iter().map(|k| done[k].clone()).collect();
                        dispatch::execute(
                            resolver.registry(),
                            plan,
                            &values,
                            resolver.config().strict_return_type_check,
                        )?
                    }
                };
                Ok((key, value))
            })
            .collect::<Result<Vec<_>, _>>()?;
        done.extend(results);
    }

    placeholders
        .iter()
        .map(|p| {
            done.get(&p.key)
                .cloned()
                .ok_or(TaskGraphError::MissingTask(p.key))
        })
        .collect()
}
