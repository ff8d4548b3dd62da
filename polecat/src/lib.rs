//! Polecat: runs one task through a coding agent and integrates the result.
//!
//! A run invokes the agent (`vc exec --polecat-mode`), files the follow-up work
//! it discovered with the issue tracker, commits and merges its changes into
//! the integration branch, and replies to whoever dispatched the task.
//!
//! - **[`core`]**: Pure, deterministic logic (mode selection, task and result
//!   models, outcome types). No I/O.
//! - **[`io`]**: Side-effecting adapters behind capability traits (agent,
//!   tracker, git, messenger, config, signals). Replaced by fakes in tests.
//!
//! Workflow modules ([`publish`], [`commit`], [`notify`], [`orchestrate`])
//! coordinate core logic with the adapters.

pub mod cancel;
pub mod commit;
pub mod core;
pub mod error;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod notify;
pub mod orchestrate;
pub mod publish;
pub mod report;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
