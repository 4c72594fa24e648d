//! Transformation module.
//!
//! This module turns flat rows into nested documents:
//! - Values: per-row typing, primitive splitting and blank handling
//! - Grouper: rows partitioned by root key
//! - Tree / Bucket / Conflict: document arena, per-array grouping engine, conflict policies
//! - Assembler: threads each row through the list rules
//! - Finalize: ordered arrays, plain JSON output
//! - Pipeline: conversion entry points

pub mod assembler;
pub mod bucket;
pub mod conflict;
pub mod finalize;
pub mod grouper;
pub mod pipeline;
pub mod tree;
pub mod values;

pub use assembler::{assemble, BuildContext, BuildStats, SkipSet};
pub use bucket::{ArrayBucket, GroupingEngine};
pub use grouper::{group_by_root_keys, Grouping};
pub use pipeline::*;
pub use values::ValueTransformer;
