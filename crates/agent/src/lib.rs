//! Library half of `autoprice-agent`, split out so the lifecycle and the
//! seed configuration can be tested without the binary.

pub mod lifecycle;
pub mod seed;
