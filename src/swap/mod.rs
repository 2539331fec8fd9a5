//! Swap requests and their state machine

mod lifecycle;

pub use lifecycle::SwapLifecycle;
