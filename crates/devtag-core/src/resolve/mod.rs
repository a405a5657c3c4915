//! Resolution strategies tried by the evaluator.
//!
//! Each configured [`EvalMethod`] maps to one strategy object. Strategies share
//! a single entry point so the evaluator can walk them as an ordered list and
//! stop at the first success.

mod link;
mod scan;

use crate::config::EvalMethod;
use crate::error::DevtagResult;
use crate::tag::Tag;
use std::path::PathBuf;

pub use link::{LinkLayout, LinkResolver, DEFAULT_LINK_ROOT};
pub use scan::ScanResolver;

/// One way of turning a tag into a device path.
///
/// `H` is the cache handle type threaded through an evaluation; strategies
/// that do not use the cache ignore the slot.
pub trait ResolveStrategy<H> {
    fn method(&self) -> EvalMethod;

    fn attempt(&self, tag: &Tag, cache: Option<&mut Option<H>>) -> DevtagResult<PathBuf>;
}
