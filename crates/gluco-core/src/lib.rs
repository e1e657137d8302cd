//! Hardware-independent core library for gluco-rs
//!
//! This crate contains all platform-agnostic logic for the glucose monitor:
//! the measurement scheduler, sensor scaling, severity classification, the
//! append-only measurement log, windowed statistics and character display
//! rendering.
//!
//! It is `no_std` with `extern crate alloc` so it compiles on both embedded
//! targets and desktop hosts (for the simulator and tests).

#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod alert;
pub mod app_state;
pub mod clock;
pub mod config;
pub mod display;
pub mod metrics;
pub mod monitor;
pub mod sensors;
pub mod storage;
