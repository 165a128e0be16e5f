//! # Engine Module
//!
//! The stateful, parallel part of the library. Everything here is built once
//! per topology and reused across many energy evaluations.
//!
//! ## Architecture
//!
//! - **Configuration** ([`config`]) - Cutoffs, softcore parameters, descreening flags and threading
//! - **Work Distribution** ([`schedule`], [`team`]) - Weight-balanced index partitions and the worker pool
//! - **Spatial Search** ([`coordinates`], [`neighbors`]) - Reduced symmetry copies and buffered pair lists
//! - **Kernels** ([`vdw`], [`born`]) - Buffered 14-7 van der Waals and the Born-radius chain rule
//! - **Reduction** ([`accumulator`]) - Per-worker buffers merged in thread order
//! - **Progress Monitoring** ([`progress`]) - Callback-based reporting for workflows
//! - **Error Handling** ([`error`]) - Structured evaluation failures

pub mod accumulator;
pub mod born;
pub mod config;
pub mod coordinates;
pub mod error;
pub mod neighbors;
pub mod progress;
pub mod schedule;
pub mod team;
pub mod vdw;
