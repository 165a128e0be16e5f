//! # Workflows Module
//!
//! High-level procedures that tie the [`crate::engine`] kernels to a loaded
//! system. Each workflow owns its engine instances for the duration of the
//! call, reports progress through a [`crate::engine::progress::ProgressReporter`]
//! and returns plain result structs.
//!
//! - **Evaluation** ([`evaluate`]) - One-shot energy, gradient and lambda derivatives
//! - **Lambda Scan** ([`lambda_scan`]) - dE/dlambda on a uniform grid with a
//!   trapezoidal thermodynamic-integration estimate

pub mod evaluate;
pub mod lambda_scan;
