//! Stand-ins used when the `profiling` feature is off. The macros expand to
//! nothing (or just their block) in that build, so only lifecycle hooks remain.

#[inline(always)]
pub fn init() {}

#[inline(always)]
pub fn shutdown() {}
