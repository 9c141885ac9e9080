// SPDX-FileCopyrightText: © 2026 StreamPipe Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Built-in adapters for StreamPipe pipelines.
//!
//! - [`Passthrough`]: forwards every packet unchanged
//! - [`FnProcessor`]: closure-driven processor for ad-hoc transforms
//! - [`ThreadSource`]: startable source feeding packets from its own thread

pub mod callback;
pub mod passthrough;
pub mod thread_source;

pub use callback::FnProcessor;
pub use passthrough::Passthrough;
pub use thread_source::ThreadSource;
