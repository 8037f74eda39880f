//! Progress coordinator
//!
//! The coordinator sits between the pipeline executor and the display. Each
//! process runs one; the process role decides whether ticks go straight to the
//! display, get throttled and sent to rank 0, or get merged with satellite
//! reports and forwarded as a single minimum.

mod config;
mod core;
mod messages;
mod throttle;

pub use config::CoordinatorConfig;
pub use core::ProgressCoordinator;
pub use messages::{ClientFrame, CoordinatorMetrics, FrameError, ProgressPacket};
pub use throttle::Throttle;
