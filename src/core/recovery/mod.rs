//! Crash recovery for exports that completed on the platform but were not
//! retrieved

pub mod queue;

pub use queue::RecoveryQueue;
