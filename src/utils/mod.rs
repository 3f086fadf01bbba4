//! Utility modules
//!
//! Time keeping shared by the state machine and the data channel.

pub mod clock;

pub use clock::{Clock, ManualClock, SystemClock, poll_until};
