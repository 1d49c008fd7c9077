// SPDX-License-Identifier: MIT

//! Graph inference
//!
//! This module provides the [`InferenceEngine`] that evaluates a compiled
//! graph against live indicator readings and reports which root causes
//! activated, and by which path.

mod context;
mod executor;
mod result;

pub use context::{InferenceContext, RunState};
pub use executor::InferenceEngine;
pub use result::DiagnosisResult;
