//! Native stack headroom for the recursive parser and evaluator.
//!
//! Every language-level call costs several evaluator frames, so a script
//! recursing up to the configured call-depth limit can outgrow a small
//! thread stack long before the limit reports E0306. Recursive entry
//! points run through [`ensure_sufficient_stack`], which switches to a
//! freshly allocated segment when the remaining stack gets low.

/// Grow when less than this much stack remains.
const RED_ZONE: usize = 128 * 1024;

/// Size of each newly allocated segment.
const STACK_PER_RECURSION: usize = 1024 * 1024;

#[inline]
#[cfg(not(target_arch = "wasm32"))]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    stacker::maybe_grow(RED_ZONE, STACK_PER_RECURSION, f)
}

#[inline]
#[cfg(target_arch = "wasm32")]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    f()
}
