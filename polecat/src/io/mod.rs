//! Side-effecting adapters for the external collaborators.

pub mod agent;
pub mod config;
pub mod git;
pub mod messenger;
pub mod process;
pub mod signal;
pub mod tracker;
