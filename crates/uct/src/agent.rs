//! UCT agents: a policy bound to a tree and an environment handler.
//!
//! One `play` call runs the configured number of simulations (select →
//! expand → evaluate → propagate), commits the greedy action to the real
//! environment, attaches the observed outcome, and descends the tree so the
//! realized child becomes the next root.

use crate::config::{MixParams, UctConfig};
use crate::dual::DualPolicy;
use crate::graphviz::to_graphviz;
use crate::pareto::ParetoPolicy;
use crate::policy::TreePolicy;
use crate::primal::PrimalPolicy;
use crate::tree::SearchTree;
use cmdp_core::{Agent, CmdpError, EnvHandler, Environment, Result};
use rand::Rng;
use tracing::{debug, trace};

/// Depth limit of the advisory Graphviz dump.
const RENDER_DEPTH: u32 = 9;

/// A Monte Carlo tree search agent parameterized by its policy.
pub struct UctAgent<E, P>
where
    E: Environment,
    P: TreePolicy<E::State, E::Action>,
{
    config: UctConfig,
    handler: EnvHandler<E>,
    policy: P,
    tree: SearchTree<E::State, E::Action, P::V, P::Q>,
    tree_rendered: bool,
}

impl<E, P> UctAgent<E, P>
where
    E: Environment,
    P: TreePolicy<E::State, E::Action>,
{
    /// Bind a policy to an environment.
    ///
    /// The environment is reset and the tree rooted at its initial state.
    ///
    /// # Errors
    /// Fails if the configuration parameters are outside their domains.
    pub fn new(env: E, config: UctConfig, policy: P) -> Result<Self> {
        config.validate()?;
        let handler = EnvHandler::new(env);
        let tree = SearchTree::new(handler.current_state(), config.gamma, config.max_depth);
        Ok(Self {
            config,
            handler,
            policy,
            tree,
            tree_rendered: false,
        })
    }

    /// Rebind the agent to another handler. The tree is rebuilt at the
    /// handler's current state.
    pub fn set_handler(&mut self, handler: EnvHandler<E>) {
        debug!(agent = self.policy.name(), "setting agent handler");
        self.handler = handler;
        self.rebuild_root();
    }

    /// Rebind the agent to another environment, resetting it first.
    pub fn set_env(&mut self, env: E) {
        self.set_handler(EnvHandler::new(env));
    }

    /// The bound handler.
    pub fn handler(&self) -> &EnvHandler<E> {
        &self.handler
    }

    /// The policy driving this agent.
    pub fn policy(&self) -> &P {
        &self.policy
    }

    /// The current search tree.
    pub fn tree(&self) -> &SearchTree<E::State, E::Action, P::V, P::Q> {
        &self.tree
    }

    /// DOT rendering of the current search tree.
    pub fn graphviz(&self) -> String {
        to_graphviz(&self.tree, RENDER_DEPTH)
    }

    fn rebuild_root(&mut self) {
        self.tree = SearchTree::new(
            self.handler.current_state(),
            self.config.gamma,
            self.config.max_depth,
        );
    }

    fn play_inner(&mut self) -> Result<()> {
        if self.handler.is_over() {
            return Err(CmdpError::EpisodeOver);
        }
        debug!(agent = self.policy.name(), "play");

        for sim in 0..self.config.num_sim {
            trace!(sim, "simulation");
            self.policy.begin_simulation();
            let leaf = self.tree.select(&mut self.policy, &mut self.handler);
            if !self.tree.state(leaf).terminal {
                self.tree.expand(leaf, self.handler.possible_actions())?;
            }
            self.policy
                .evaluate(&mut self.tree, leaf, &mut self.handler);
            self.tree.propagate(&mut self.policy, leaf);
            self.handler.sim_reset();
            self.policy.after_simulation(&self.tree);
        }

        // A zero simulation budget leaves the root bare; decide from a
        // freshly expanded root instead.
        let root = self.tree.root();
        if self.tree.state(root).is_leaf() {
            self.tree.expand(root, self.handler.possible_actions())?;
        }

        self.policy.begin_simulation();
        let idx = self.policy.select_action(&self.tree, root, false);
        let action = self.tree.state(root).actions[idx];

        let outcome = self.handler.play_action(action);
        debug!(
            ?action,
            state = ?outcome.state,
            reward = outcome.reward,
            penalty = outcome.penalty,
            "played action"
        );

        if !self.tree_rendered {
            trace!(target: "tree_dot", dot = %to_graphviz(&self.tree, RENDER_DEPTH), "search tree");
            self.tree_rendered = true;
        }

        self.tree.descend(&mut self.policy, action, &outcome)
    }
}

impl<E, P> Agent for UctAgent<E, P>
where
    E: Environment,
    P: TreePolicy<E::State, E::Action>,
{
    fn play(&mut self) -> Result<()> {
        self.play_inner()
    }

    fn reset(&mut self) {
        debug!(agent = self.policy.name(), "reset");
        self.policy.reset();
        self.handler.reset();
        self.rebuild_root();
        self.tree_rendered = false;
    }

    fn name(&self) -> &str {
        self.policy.name()
    }
}

/// Primal UCT agent.
pub type PrimalUct<E, R> = UctAgent<E, PrimalPolicy<R>>;

/// Dual UCT agent.
pub type DualUct<E> = UctAgent<E, DualPolicy>;

/// Pareto UCT agent.
pub type ParetoUct<E, R> = UctAgent<E, ParetoPolicy<R>>;

/// Build a primal UCT agent.
pub fn primal_uct<E, R>(env: E, config: UctConfig, rng: R) -> Result<PrimalUct<E, R>>
where
    E: Environment,
    R: Rng,
{
    let policy = PrimalPolicy::new(&config, rng);
    UctAgent::new(env, config, policy)
}

/// Build a dual UCT agent with multiplier learning rate `lr`.
pub fn dual_uct<E>(env: E, config: UctConfig, lr: f32) -> Result<DualUct<E>>
where
    E: Environment,
{
    let policy = DualPolicy::new(&config, lr)?;
    UctAgent::new(env, config, policy)
}

/// Build a Pareto UCT agent with the default mixing grid.
pub fn pareto_uct<E, R>(env: E, config: UctConfig, rng: R) -> Result<ParetoUct<E, R>>
where
    E: Environment,
    R: Rng,
{
    let policy = ParetoPolicy::new(&config, MixParams::default(), rng);
    UctAgent::new(env, config, policy)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envs::RiskyBandit;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_invalid_config_rejected() {
        let config = UctConfig {
            max_depth: 0,
            ..Default::default()
        };
        let rng = ChaCha8Rng::seed_from_u64(0);
        assert!(primal_uct(RiskyBandit::two_armed(), config, rng).is_err());
    }

    #[test]
    fn test_play_on_finished_episode_fails() {
        let config = UctConfig::with_risk(10, 0.2);
        let rng = ChaCha8Rng::seed_from_u64(0);
        let mut agent = primal_uct(RiskyBandit::two_armed(), config, rng).unwrap();

        agent.play().unwrap();
        assert!(matches!(agent.play(), Err(CmdpError::EpisodeOver)));
    }

    #[test]
    fn test_zero_simulation_budget_still_plays() {
        let config = UctConfig::with_risk(0, 0.2);
        let rng = ChaCha8Rng::seed_from_u64(0);
        let mut agent = primal_uct(RiskyBandit::two_armed(), config, rng).unwrap();

        agent.play().unwrap();
        assert_eq!(agent.handler().num_steps(), 1);
    }

    #[test]
    fn test_play_advances_root() {
        let config = UctConfig::with_risk(50, 0.2);
        let rng = ChaCha8Rng::seed_from_u64(0);
        let mut agent = pareto_uct(RiskyBandit::two_armed(), config, rng).unwrap();

        agent.play().unwrap();
        let tree = agent.tree();
        let root = tree.state(tree.root());
        assert!(root.parent.is_none());
        assert!(root.terminal);
        assert_eq!(root.depth, 0);
    }

    #[test]
    fn test_graphviz_smoke() {
        let config = UctConfig::with_risk(20, 0.2);
        let rng = ChaCha8Rng::seed_from_u64(0);
        let mut agent = dual_uct(RiskyBandit::two_armed(), config, 0.1).unwrap();

        agent.play().unwrap();
        let dot = agent.graphviz();
        assert!(dot.starts_with("digraph"));
        assert!(dot.ends_with("}\n"));
    }

    #[test]
    fn test_reset_restores_initial_state() {
        let config = UctConfig::with_risk(20, 0.2);
        let rng = ChaCha8Rng::seed_from_u64(0);
        let mut agent = dual_uct(RiskyBandit::two_armed(), config, 0.1).unwrap();

        agent.play().unwrap();
        agent.reset();

        assert_eq!(agent.handler().num_steps(), 0);
        assert_eq!(agent.policy().lambda(), 0.0);
        assert_eq!(agent.tree().num_states(), 1);
    }
}
