//! TOH Core - MDP abstraction, error types, and puzzle domains
//!
//! This crate provides the foundational types used across all TOH components:
//! the [`Mdp`] trait consumed by the solvers, the Tower of Hanoi MDP, and a
//! small table-driven MDP for hand-built fixtures.

// Clippy pedantic allows - these are intentional design choices
#![allow(clippy::doc_markdown)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod hanoi;
pub mod mdp;
pub mod table;

pub use error::{Result, TohError};
pub use hanoi::{GoalConfig, TohAction, TohMdp, TohMdpConfig, TohState};
pub use mdp::Mdp;
pub use table::{Outcome, TableMdp, TableMdpBuilder};
