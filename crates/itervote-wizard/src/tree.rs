//! The creation tree.
//!
//! The steps of the creation procedure form a static tree, assembled once from
//! a declarative [`StepSpec`] and never reshaped afterwards. Nodes live in an
//! arena and refer to their parent by key, so the back-link is a plain index
//! with no ownership attached.
//!
//! Each node carries two pieces of mutable state: its slice of the creation
//! query, and the set of fields the currently mounted step claims. Both are
//! only mutated through the wizard controller, and both are cleared together
//! by [`CreationTree::reset`].
//!
//! # Node Kinds
//!
//! - **Linear**: exactly one successor, unconditional
//! - **Final**: a leaf; moving forward from it submits
//! - **Conditional**: the successor is picked among its branches by a pure
//!   function of the node's query
//!
//! # Example
//!
//! ```
//! use itervote_wizard::{CreationTree, StepSpec};
//!
//! let tree = CreationTree::build(StepSpec::linear(
//!     "root",
//!     "Root",
//!     StepSpec::final_step("leaf", "Leaf"),
//! ))
//! .unwrap();
//!
//! let status = tree.make_status(tree.root());
//! assert_eq!(status.current, 0);
//! assert_eq!(status.steps, vec!["Root", "Leaf"]);
//! assert!(!status.may_have_more);
//! ```
//!
//! # Status Stability
//!
//! [`CreationTree::make_status`] recomputes the forward part of the path on
//! every call. With conditional nodes the reachable labels follow whatever
//! the queries currently hold, so two calls separated by an edit may differ.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::ops::Index;
use std::sync::Arc;

use itervote_core::logging::targets;
use parking_lot::RwLock;
use slotmap::{SlotMap, new_key_type};

use crate::error::{Result, WizardError};
use crate::query::{Query, SharedQuery};
use crate::status::StepStatus;

new_key_type! {
    /// Identifies a step within its [`CreationTree`].
    pub struct StepId;
}

/// Picks a branch index from a conditional node's query.
///
/// Must be a pure function of the query. Returning `None` or an index out of
/// range means "no successor", which for a non-final node is a malformed tree.
pub type BranchDecider = Arc<dyn Fn(&Query) -> Option<usize> + Send + Sync>;

/// Declarative description of a step and everything after it.
pub struct StepSpec {
    segment: String,
    label: String,
    kind: SpecKind,
}

enum SpecKind {
    Linear(Box<StepSpec>),
    Final,
    Conditional {
        branches: Vec<StepSpec>,
        decide: BranchDecider,
    },
}

impl StepSpec {
    /// A step with exactly one successor.
    pub fn linear(segment: impl Into<String>, label: impl Into<String>, next: StepSpec) -> Self {
        Self {
            segment: segment.into(),
            label: label.into(),
            kind: SpecKind::Linear(Box::new(next)),
        }
    }

    /// A leaf step; moving forward from it submits.
    pub fn final_step(segment: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            segment: segment.into(),
            label: label.into(),
            kind: SpecKind::Final,
        }
    }

    /// A step whose successor is chosen among `branches` by `decide`.
    pub fn conditional<F>(
        segment: impl Into<String>,
        label: impl Into<String>,
        branches: Vec<StepSpec>,
        decide: F,
    ) -> Self
    where
        F: Fn(&Query) -> Option<usize> + Send + Sync + 'static,
    {
        Self {
            segment: segment.into(),
            label: label.into(),
            kind: SpecKind::Conditional {
                branches,
                decide: Arc::new(decide),
            },
        }
    }

    /// The segment of this step.
    pub fn segment(&self) -> &str {
        &self.segment
    }
}

/// The shape of a node once attached to a tree.
#[derive(Clone)]
pub enum StepKind {
    /// Exactly one successor.
    Linear(StepId),
    /// No successor.
    Final,
    /// Successor chosen by `decide` among `branches`.
    Conditional {
        branches: Vec<StepId>,
        decide: BranchDecider,
    },
}

impl fmt::Debug for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Linear(next) => f.debug_tuple("Linear").field(next).finish(),
            Self::Final => f.write_str("Final"),
            Self::Conditional { branches, .. } => f
                .debug_struct("Conditional")
                .field("branches", branches)
                .finish_non_exhaustive(),
        }
    }
}

/// One step of the creation procedure.
pub struct StepNode {
    segment: String,
    label: String,
    parent: Option<StepId>,
    kind: StepKind,
    query: SharedQuery,
    handled_fields: RwLock<BTreeSet<String>>,
}

impl StepNode {
    /// Route leaf identifying this step.
    pub fn segment(&self) -> &str {
        &self.segment
    }

    /// Display name of this step.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// The step this one is attached under, if any.
    pub fn parent(&self) -> Option<StepId> {
        self.parent
    }

    /// The shape of this step.
    pub fn kind(&self) -> &StepKind {
        &self.kind
    }

    /// Whether moving forward from this step submits.
    pub fn is_final(&self) -> bool {
        matches!(self.kind, StepKind::Final)
    }

    /// Children in declaration order.
    pub fn children(&self) -> Vec<StepId> {
        match &self.kind {
            StepKind::Linear(next) => vec![*next],
            StepKind::Final => Vec::new(),
            StepKind::Conditional { branches, .. } => branches.clone(),
        }
    }

    /// The successor for `query`, or for this node's own query when `None`.
    ///
    /// Side-effect free.
    pub fn next(&self, query: Option<&Query>) -> Option<StepId> {
        match &self.kind {
            StepKind::Linear(next) => Some(*next),
            StepKind::Final => None,
            StepKind::Conditional { branches, decide } => {
                let index = match query {
                    Some(query) => decide(query),
                    None => self.query.with(|own| decide(own)),
                };
                index.and_then(|i| branches.get(i).copied())
            }
        }
    }

    /// Copy of this step's partial query.
    pub fn query_snapshot(&self) -> Query {
        self.query.snapshot()
    }

    /// Fields the mounted step currently claims.
    pub fn handled_fields(&self) -> BTreeSet<String> {
        self.handled_fields.read().clone()
    }

    pub(crate) fn query(&self) -> &SharedQuery {
        &self.query
    }

    pub(crate) fn claim_fields<I>(&self, fields: I)
    where
        I: IntoIterator<Item = String>,
    {
        self.handled_fields.write().extend(fields);
    }

    pub(crate) fn release_fields(&self) {
        self.handled_fields.write().clear();
    }

    fn clear(&self) {
        self.query.clear();
        self.handled_fields.write().clear();
    }
}

impl fmt::Debug for StepNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StepNode")
            .field("segment", &self.segment)
            .field("label", &self.label)
            .field("parent", &self.parent)
            .field("kind", &self.kind)
            .field("handled_fields", &*self.handled_fields.read())
            .field("query", &self.query)
            .finish()
    }
}

/// The static tree of steps.
pub struct CreationTree {
    nodes: SlotMap<StepId, StepNode>,
    root: StepId,
    by_segment: HashMap<String, StepId>,
}

impl CreationTree {
    /// Attach every step of `spec` and validate the result.
    ///
    /// Fails on empty or duplicate segments and on conditional steps without
    /// branches.
    pub fn build(spec: StepSpec) -> Result<Self> {
        let mut nodes = SlotMap::with_key();
        let mut by_segment = HashMap::new();
        let root = attach(&mut nodes, &mut by_segment, spec, None)?;
        tracing::debug!(
            target: targets::TREE,
            steps = nodes.len(),
            "creation tree built"
        );
        Ok(Self {
            nodes,
            root,
            by_segment,
        })
    }

    /// The first step.
    pub fn root(&self) -> StepId {
        self.root
    }

    /// Look up a step.
    pub fn node(&self, id: StepId) -> Option<&StepNode> {
        self.nodes.get(id)
    }

    /// Find a step by segment.
    pub fn find(&self, segment: &str) -> Option<StepId> {
        self.by_segment.get(segment).copied()
    }

    /// Number of steps.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the tree has no steps. Never true for a built tree.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Iterate over every step, in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (StepId, &StepNode)> {
        self.nodes.iter()
    }

    /// The successor of `id` for `query` (or the node's own query).
    pub fn successor(&self, id: StepId, query: Option<&Query>) -> Option<StepId> {
        self.nodes.get(id).and_then(|node| node.next(query))
    }

    /// Number of parent hops from `id` to the root.
    pub fn depth(&self, id: StepId) -> usize {
        self.ancestors(id).count()
    }

    /// Strict ancestors of `id`, nearest first.
    pub fn ancestors(&self, id: StepId) -> impl Iterator<Item = StepId> + '_ {
        let mut cursor = self.nodes.get(id).and_then(StepNode::parent);
        std::iter::from_fn(move || {
            let current = cursor?;
            cursor = self.nodes.get(current).and_then(StepNode::parent);
            Some(current)
        })
    }

    /// Compute the status shown while `id` is the active step.
    ///
    /// `steps` holds the ancestor labels (root first), then the label of `id`
    /// and of every step reached by following successors from it.
    pub fn make_status(&self, id: StepId) -> StepStatus {
        let mut ancestors: Vec<StepId> = self.ancestors(id).collect();
        ancestors.reverse();
        let current = ancestors.len();

        let mut steps: Vec<String> = ancestors
            .iter()
            .map(|&a| self[a].label.clone())
            .collect();

        let mut last = id;
        let mut cursor = Some(id);
        // Bounded by the node count: a forward walk in a tree never repeats.
        for _ in 0..self.nodes.len() {
            let Some(step) = cursor else { break };
            steps.push(self[step].label.clone());
            last = step;
            cursor = self.successor(step, None);
        }

        StepStatus {
            current,
            steps,
            may_have_more: !self[last].is_final(),
        }
    }

    /// Clear every step's query and handled fields, from the root down.
    pub fn reset(&self) {
        debug_assert!(self[self.root].parent.is_none(), "root step has a parent");
        self.reset_from(self.root);
        tracing::debug!(target: targets::TREE, "creation tree reset");
    }

    /// Only ever entered from [`reset`](Self::reset); resetting a subtree
    /// alone would leave ancestors and siblings stale.
    fn reset_from(&self, id: StepId) {
        let node = &self[id];
        node.clear();
        for child in node.children() {
            self.reset_from(child);
        }
    }
}

impl Index<StepId> for CreationTree {
    type Output = StepNode;

    /// # Panics
    ///
    /// Panics if `id` does not belong to this tree.
    fn index(&self, id: StepId) -> &StepNode {
        &self.nodes[id]
    }
}

impl fmt::Debug for CreationTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CreationTree")
            .field("root", &self.root)
            .field("steps", &self.nodes.len())
            .finish()
    }
}

fn attach(
    nodes: &mut SlotMap<StepId, StepNode>,
    by_segment: &mut HashMap<String, StepId>,
    spec: StepSpec,
    parent: Option<StepId>,
) -> Result<StepId> {
    let StepSpec {
        segment,
        label,
        kind,
    } = spec;

    if segment.trim().is_empty() {
        return Err(WizardError::EmptySegment { label });
    }
    if by_segment.contains_key(&segment) {
        return Err(WizardError::DuplicateSegment(segment));
    }

    // Children need the parent key, so the node goes in first and receives
    // its final kind once they are attached.
    let id = nodes.insert(StepNode {
        segment: segment.clone(),
        label,
        parent,
        kind: StepKind::Final,
        query: SharedQuery::new(),
        handled_fields: RwLock::new(BTreeSet::new()),
    });
    by_segment.insert(segment.clone(), id);

    let kind = match kind {
        SpecKind::Final => StepKind::Final,
        SpecKind::Linear(next) => StepKind::Linear(attach(nodes, by_segment, *next, Some(id))?),
        SpecKind::Conditional { branches, decide } => {
            if branches.is_empty() {
                return Err(WizardError::NoBranches(segment));
            }
            let branches = branches
                .into_iter()
                .map(|branch| attach(nodes, by_segment, branch, Some(id)))
                .collect::<Result<Vec<_>>>()?;
            StepKind::Conditional { branches, decide }
        }
    };
    nodes[id].kind = kind;
    Ok(id)
}

static_assertions::assert_impl_all!(CreationTree: Send, Sync);
