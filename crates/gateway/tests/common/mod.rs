//! Test infrastructure for the gateway layer.
//!
//! This module provides a scriptable backend whose outcome can be chosen per
//! operation, and a failure sink that records every notification.

#![allow(dead_code)]

pub mod scripted;
pub mod sink;

// Re-export commonly used items
pub use scripted::*;
pub use sink::*;
