//! Risk-constrained Monte Carlo tree search.
//!
//! Three UCT variants share one tree-search skeleton and differ in how they
//! reconcile reward against risk:
//!
//! - **Primal** ([`PrimalPolicy`]): UCB over reward restricted to actions
//!   whose penalty estimate satisfies the risk threshold
//! - **Dual** ([`DualPolicy`]): Lagrangian scalarization
//!   `reward − λ · penalty` with an online projected update of λ
//! - **Pareto** ([`ParetoPolicy`]): per-node reward-versus-risk frontiers,
//!   selection by mixing two children to hit the risk target exactly
//!
//! The skeleton ([`SearchTree`]) runs select → expand → evaluate →
//! propagate under a fixed simulation budget; [`UctAgent`] binds a policy
//! to a tree and an environment handler and commits one real action per
//! `play`.
//!
//! # Example
//!
//! ```
//! use cmdp_core::Agent;
//! use cmdp_uct::{envs::RiskyBandit, primal_uct, UctConfig};
//! use rand::SeedableRng;
//! use rand_chacha::ChaCha8Rng;
//!
//! let config = UctConfig::with_risk(200, 0.2);
//! let rng = ChaCha8Rng::seed_from_u64(42);
//! let mut agent = primal_uct(RiskyBandit::two_armed(), config, rng).unwrap();
//!
//! agent.play().unwrap();
//! // The safe arm satisfies the risk bound.
//! assert_eq!(agent.handler().penalty(), 0.0);
//! ```

pub mod agent;
pub mod config;
pub mod curve;
pub mod dual;
pub mod envs;
pub mod graphviz;
mod node;
pub mod pareto;
mod policy;
pub mod primal;
mod tree;

pub use agent::{dual_uct, pareto_uct, primal_uct, DualUct, ParetoUct, PrimalUct, UctAgent};
pub use config::{MixParams, UctConfig};
pub use curve::{mix, CurvePoint, Mix, ParetoCurve};
pub use dual::DualPolicy;
pub use graphviz::to_graphviz;
pub use node::{ActionId, ActionNode, OutcomeStats, StateId, StateNode};
pub use pareto::{ParetoPolicy, ParetoValue};
pub use policy::{PairStats, TreePolicy};
pub use primal::PrimalPolicy;
pub use tree::SearchTree;
