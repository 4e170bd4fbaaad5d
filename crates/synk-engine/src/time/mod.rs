//! Time subsystem.
//!
//! Frame pacing is an explicit value rather than process-wide state:
//! - construct one `Timer` at startup and thread it through the loop
//! - call `update()` exactly once per iteration to refresh the frame delta
//! - `program_time()` is independent of `update()` cadence
//! - `Chrono` stopwatches are independent of the frame clock

mod chrono;
mod clock;
mod timer;

pub use chrono::Chrono;
pub use clock::{Clock, ManualClock, MonotonicClock};
pub use timer::{FrameTime, Timer};
