//! Contracts for constrained sequential decision making.
//!
//! This crate provides the interfaces shared by environments and planning
//! agents: every transition carries a reward and a penalty (risk signal),
//! and agents bound the expected discounted penalty while maximizing the
//! expected discounted reward.
//!
//! # Types
//!
//! - [`Environment`] - Trait for constrained decision environments
//! - [`Outcome`] - One realized transition (state, reward, penalty, done)
//! - [`EnvHandler`] - Checkpoint-aware adapter separating real and simulated play
//! - [`Agent`] - Trait exposed by planning agents to the episode driver

mod agent;
mod env;
mod error;
mod handler;

pub use agent::Agent;
pub use env::{Environment, Outcome};
pub use error::{CmdpError, Result};
pub use handler::EnvHandler;
