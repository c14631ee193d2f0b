//! Small environments for validating the search agents.
//!
//! Both have known optimal constrained behavior, which makes them suitable
//! for seeded end-to-end tests.

mod bandit;
mod corridor;

pub use bandit::RiskyBandit;
pub use corridor::{Corridor, Step};
