//! Synthetic corpora and store stacks for the criterion benches.

pub mod datasets;
pub mod harness;
