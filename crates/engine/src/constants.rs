// SPDX-FileCopyrightText: © 2026 StreamPipe Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Shared constants for processor ordering.
//!
//! Processor orders form a single ascending lane from `0` to
//! [`SYNC_OUTPUT_ORDER`]. Adapters that do not care where they sit pass
//! [`APPEND_ORDER`] and are slotted in registration order.

/// Order value meaning "append in registration order".
///
/// Rewritten at attach time to the current processor count, so repeated
/// appends keep their insertion order.
pub const APPEND_ORDER: u32 = 0;

/// The highest processor order, reserved for the synchronized output
/// terminal installed by `synchronize_output`.
///
/// Regular processors should stay well below this so the output bridge is
/// always the last hop of the chain.
pub const SYNC_OUTPUT_ORDER: u32 = 101;

/// Inclusive upper bound for processor orders passed to `attach`.
pub const MAX_PROCESSOR_ORDER: u32 = SYNC_OUTPUT_ORDER;
