//! # Halgren Core Library
//!
//! Parallel non-bonded kernels for molecular mechanics: the buffered 14-7
//! van der Waals potential with softcore lambda coupling, and the
//! Generalized Kirkwood Born-radius chain-rule gradient.
//!
//! ## Architectural Philosophy
//!
//! The library keeps the three-layer split of a force-field evaluator:
//!
//! - **[`core`]: The Foundation.** Stateless data models (`MolecularSystem`, `Crystal`),
//!   pure force-field math (combining rules, switch, potentials, long-range tail),
//!   parameter files and the TOML system description.
//!
//! - **[`engine`]: The Logic Core.** The stateful parallel machinery: load-balanced
//!   schedule, neighbor lists over symmetry copies, the worker pool, the van der
//!   Waals and Born-gradient kernels and their thread-local reduction.
//!
//! - **[`workflows`]: The Public API.** Complete procedures built on the engine,
//!   such as a one-shot evaluation or a thermodynamic-integration lambda scan.

pub mod core;
pub mod engine;
pub mod workflows;
