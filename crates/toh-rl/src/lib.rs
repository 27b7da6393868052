//! TOH RL - Tabular solvers for finite MDPs
//!
//! This crate provides value iteration, greedy policy extraction, the
//! Q-learning update, and epsilon-greedy action selection with decaying
//! schedules, all written against the [`toh_core::Mdp`] trait.

// Clippy pedantic allows - these are intentional design choices
#![allow(clippy::doc_markdown)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::float_cmp)]
#![allow(clippy::similar_names)]

pub mod exploration;
pub mod policy;
pub mod q_learning;
pub mod schedule;
pub mod solver;
pub mod table;
pub mod value_iteration;

pub use exploration::{choose_next_action, EpsilonGreedy, RandomEpsilonGreedy};
pub use policy::{extract_policy, extract_v_table};
pub use q_learning::{q_update, Transition};
pub use schedule::{AlphaSchedule, EpsilonSchedule, Schedule};
pub use solver::{
    rollout, sample_next_state, EpisodeStats, QLearningConfig, QLearningSolver, Rollout,
    SolverStats, ValueIterationReport, ValueIterationSolver,
};
pub use table::{Policy, QTable, VTable};
pub use value_iteration::{value_iteration, ValueSweep};
