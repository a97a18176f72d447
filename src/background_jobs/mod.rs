//! Job execution primitives: a serialized FIFO lane, a readiness gate and the
//! outcome types jobs report.

mod job;
mod readiness;
mod serial_queue;

pub use job::{JobError, JobOutcome};
pub use readiness::AppReadiness;
pub use serial_queue::SerialTaskQueue;
