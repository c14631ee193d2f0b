//! Tree search skeleton.
//!
//! Owns the node arenas and the root, and implements the four phases shared
//! by every UCT variant: `select`, `expand`, `propagate`, and `descend`.
//! Policy-specific behavior enters exclusively through the [`TreePolicy`]
//! hooks.
//!
//! Nodes live in `slab` arenas and reference each other by index, so parent
//! back-references never own and destroying the abandoned part of the tree
//! on descent is an iterative walk that frees each slot exactly once.

use crate::node::{ActionId, ActionNode, OutcomeStats, StateId, StateNode};
use crate::policy::TreePolicy;
use cmdp_core::{CmdpError, EnvHandler, Environment, Outcome, Result};
use slab::Slab;
use std::fmt;
use std::hash::Hash;

/// The search tree of one agent.
///
/// Generic over the state type `S`, action type `A`, and the policy value
/// payloads `V` (state nodes) and `Q` (action nodes).
#[derive(Clone, Debug)]
pub struct SearchTree<S, A, V, Q> {
    states: Slab<StateNode<S, A, V>>,
    actions: Slab<ActionNode<S, A, Q>>,
    root: StateId,
    gamma: f32,
    max_depth: u32,
}

impl<S, A, V, Q> SearchTree<S, A, V, Q>
where
    S: Clone + Eq + Hash + fmt::Debug,
    A: Copy + Eq + fmt::Debug,
    V: Clone + Default + fmt::Debug,
    Q: Clone + Default + fmt::Debug,
{
    /// Create a tree holding a single root node for `root_state`.
    pub fn new(root_state: S, gamma: f32, max_depth: u32) -> Self {
        let mut states = Slab::new();
        let root = StateId(states.insert(StateNode {
            state: root_state,
            parent: None,
            actions: Vec::new(),
            children: Vec::new(),
            num_visits: 0,
            v: V::default(),
            terminal: false,
            depth: 0,
            observed: OutcomeStats::default(),
        }));
        Self {
            states,
            actions: Slab::new(),
            root,
            gamma,
            max_depth,
        }
    }

    /// The current root.
    pub fn root(&self) -> StateId {
        self.root
    }

    /// Discount factor used by propagation.
    pub fn gamma(&self) -> f32 {
        self.gamma
    }

    /// Selection depth limit.
    pub fn max_depth(&self) -> u32 {
        self.max_depth
    }

    /// State node by handle.
    ///
    /// # Panics
    /// Panics if the handle refers to a freed node.
    pub fn state(&self, id: StateId) -> &StateNode<S, A, V> {
        self.states.get(id.0).expect("BUG: stale state handle")
    }

    /// Mutable state node by handle.
    ///
    /// # Panics
    /// Panics if the handle refers to a freed node.
    pub fn state_mut(&mut self, id: StateId) -> &mut StateNode<S, A, V> {
        self.states.get_mut(id.0).expect("BUG: stale state handle")
    }

    /// Action node by handle.
    ///
    /// # Panics
    /// Panics if the handle refers to a freed node.
    pub fn action(&self, id: ActionId) -> &ActionNode<S, A, Q> {
        self.actions.get(id.0).expect("BUG: stale action handle")
    }

    /// Mutable action node by handle.
    ///
    /// # Panics
    /// Panics if the handle refers to a freed node.
    pub fn action_mut(&mut self, id: ActionId) -> &mut ActionNode<S, A, Q> {
        self.actions.get_mut(id.0).expect("BUG: stale action handle")
    }

    /// Number of live state nodes.
    pub fn num_states(&self) -> usize {
        self.states.len()
    }

    /// Number of live action nodes.
    pub fn num_action_nodes(&self) -> usize {
        self.actions.len()
    }

    /// Descend from the root to a leaf, simulating one step per level.
    ///
    /// At each expanded, non-terminal node above the depth limit the policy
    /// picks an action, the handler simulates it, the realized outcome is
    /// attached under the action node, and the policy's descent callback
    /// runs. Returns the node the descent stopped at. The simulation
    /// session is left open so that expansion and leaf evaluation observe
    /// the leaf state.
    pub fn select<P, E>(&mut self, policy: &mut P, handler: &mut EnvHandler<E>) -> StateId
    where
        P: TreePolicy<S, A, V = V, Q = Q>,
        E: Environment<State = S, Action = A>,
    {
        let mut sid = self.root;
        loop {
            let node = self.state(sid);
            if node.is_leaf() || node.terminal || node.depth >= self.max_depth {
                return sid;
            }
            let idx = policy.select_action(self, sid, true);
            let aid = self.state(sid).children[idx];
            let action = self.action(aid).action;
            let outcome = handler.sim_action(action);
            let child = self.add_outcome(aid, &outcome);
            policy.descend_update(self, aid, child, true);
            sid = child;
        }
    }

    /// Attach a realized outcome under an action node.
    ///
    /// Updates the action's aggregate outcome means and either refreshes the
    /// existing child state node keyed by the outcome state or creates a new
    /// one. Returns the child's handle.
    pub fn add_outcome(&mut self, aid: ActionId, outcome: &Outcome<S>) -> StateId {
        self.action_mut(aid)
            .outcome
            .record(outcome.reward, outcome.penalty, outcome.done);

        match self.action(aid).child(&outcome.state) {
            Some(child) => {
                let node = self.state_mut(child);
                node.observed
                    .record(outcome.reward, outcome.penalty, outcome.done);
                node.terminal = outcome.done;
                child
            }
            None => self.insert_child(aid, outcome),
        }
    }

    /// Allocate one action child per possible action of a leaf.
    ///
    /// A no-op on already expanded nodes. Outcomes are not realized; action
    /// payloads start at their defaults.
    ///
    /// # Errors
    /// Fails with `EmptyActionSet` if the environment enumerates no actions.
    pub fn expand(&mut self, sid: StateId, actions: Vec<A>) -> Result<()> {
        if !self.state(sid).children.is_empty() {
            return Ok(());
        }
        if actions.is_empty() {
            return Err(CmdpError::EmptyActionSet);
        }
        for action in actions {
            let aid = ActionId(self.actions.insert(ActionNode {
                action,
                parent: sid,
                children: Vec::new(),
                num_visits: 0,
                q: Q::default(),
                outcome: OutcomeStats::default(),
            }));
            let node = self.state_mut(sid);
            node.actions.push(action);
            node.children.push(aid);
        }
        Ok(())
    }

    /// Propagate one simulation pass from `leaf` back to the root.
    ///
    /// At each action node on the path the payload receives the discounted
    /// sample `observed(edge) + γ · value(child state)`; at each state node
    /// it receives `outcome(action) + γ · visit-weighted value(action's
    /// children)`. Visit counts along the path, including the leaf, grow by
    /// one.
    pub fn propagate<P>(&mut self, policy: &mut P, leaf: StateId)
    where
        P: TreePolicy<S, A, V = V, Q = Q>,
    {
        let gamma = self.gamma;
        let mut sid = leaf;
        self.state_mut(sid).num_visits += 1;

        while let Some(aid) = self.state(sid).parent {
            let (vr, vp) = policy.value_estimate(&self.state(sid).v);
            let edge = self.state(sid).observed;
            let disc_r = edge.reward + gamma * vr;
            let disc_p = edge.penalty + gamma * vp;
            self.action_mut(aid).num_visits += 1;
            policy.propagate_q(&mut self.action_mut(aid).q, disc_r, disc_p);

            let (wr, wp) = self.weighted_child_value(&*policy, aid);
            let aggregate = self.action(aid).outcome;
            let disc_r = aggregate.reward + gamma * wr;
            let disc_p = aggregate.penalty + gamma * wp;
            let parent = self.action(aid).parent;
            self.state_mut(parent).num_visits += 1;
            policy.propagate_v(&mut self.state_mut(parent).v, disc_r, disc_p);
            sid = parent;
        }
    }

    /// Visit-weighted mean of the scalar values of an action's children.
    fn weighted_child_value<P>(&self, policy: &P, aid: ActionId) -> (f32, f32)
    where
        P: TreePolicy<S, A, V = V, Q = Q>,
    {
        let mut total = 0.0f32;
        let mut reward = 0.0f32;
        let mut penalty = 0.0f32;
        for (_, sid) in &self.action(aid).children {
            let node = self.state(*sid);
            if node.num_visits == 0 {
                continue;
            }
            let weight = node.num_visits as f32;
            let (vr, vp) = policy.value_estimate(&node.v);
            reward += weight * vr;
            penalty += weight * vp;
            total += weight;
        }
        if total > 0.0 {
            (reward / total, penalty / total)
        } else {
            (0.0, 0.0)
        }
    }

    /// Commit a real step: promote `root.child(action).child(outcome.state)`
    /// to root and destroy everything else.
    ///
    /// If the realized state was never sampled during search, a fresh child
    /// state node is created from the observed outcome first. The policy's
    /// descent callback runs before the promotion so it can read the old
    /// root's statistics.
    ///
    /// # Errors
    /// Fails with `UnknownAction` if `action` is not a child of the root.
    pub fn descend<P>(&mut self, policy: &mut P, action: A, outcome: &Outcome<S>) -> Result<()>
    where
        P: TreePolicy<S, A, V = V, Q = Q>,
    {
        let root = self.root;
        let idx = self
            .state(root)
            .action_index(action)
            .ok_or_else(|| CmdpError::UnknownAction(format!("{action:?}")))?;
        let aid = self.state(root).children[idx];
        let child = match self.action(aid).child(&outcome.state) {
            Some(child) => child,
            None => self.insert_child(aid, outcome),
        };
        policy.descend_update(self, aid, child, false);
        self.promote(child);
        Ok(())
    }

    /// Create a state node under `aid` from a realized outcome.
    fn insert_child(&mut self, aid: ActionId, outcome: &Outcome<S>) -> StateId {
        let parent_state = self.action(aid).parent;
        let depth = self.state(parent_state).depth + 1;
        let mut observed = OutcomeStats::default();
        observed.record(outcome.reward, outcome.penalty, outcome.done);
        let child = StateId(self.states.insert(StateNode {
            state: outcome.state.clone(),
            parent: Some(aid),
            actions: Vec::new(),
            children: Vec::new(),
            num_visits: 0,
            v: V::default(),
            terminal: outcome.done,
            depth,
            observed,
        }));
        self.action_mut(aid)
            .children
            .push((outcome.state.clone(), child));
        child
    }

    /// Make `new_root` the root, freeing the abandoned part of the tree.
    fn promote(&mut self, new_root: StateId) {
        let old_root = self.root;
        let parent = self
            .state(new_root)
            .parent
            .expect("BUG: promoting a node without a parent");
        // Detach the promoted subtree so the walk below cannot reach it.
        self.action_mut(parent)
            .children
            .retain(|(_, sid)| *sid != new_root);
        self.free_subtree(old_root);
        self.state_mut(new_root).parent = None;
        self.root = new_root;
        self.rebase_depths(new_root);
    }

    /// Free a state node and every descendant, iteratively.
    fn free_subtree(&mut self, from: StateId) {
        let mut stack = vec![from];
        while let Some(sid) = stack.pop() {
            let node = self.states.remove(sid.0);
            for aid in node.children {
                let action = self.actions.remove(aid.0);
                for (_, child) in action.children {
                    stack.push(child);
                }
            }
        }
    }

    /// Shift stored depths so the new root sits at depth zero again.
    fn rebase_depths(&mut self, root: StateId) {
        let delta = self.state(root).depth;
        if delta == 0 {
            return;
        }
        let mut stack = vec![root];
        while let Some(sid) = stack.pop() {
            self.state_mut(sid).depth -= delta;
            let children = self.state(sid).children.clone();
            for aid in children {
                for (_, child) in &self.action(aid).children {
                    stack.push(*child);
                }
            }
        }
    }
}
