//! MongoDB implementations of the `leaf-core` backend contracts.

pub mod convert;
pub mod mongo;
