//! The three algorithm engines. Each owns one atomic program and a thin
//! request/response adapter (§2); none holds per-fingerprint state.

mod fixed_window;
mod sliding_window;
mod token_bucket;

pub(crate) use fixed_window::FixedWindowEngine;
pub(crate) use sliding_window::SlidingWindowEngine;
pub(crate) use token_bucket::TokenBucketEngine;
