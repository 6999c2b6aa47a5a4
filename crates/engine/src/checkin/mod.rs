//! Daily check-in: spin state machine and wheel animation

mod engine;
mod wheel;

pub use engine::{CheckInApi, CheckInEngine, SpinOutcome, SpinPhase};
pub use wheel::{FrameSource, IntervalFrames, ManualFrames, WheelTimeline};
pub use wheel::{SPIN_DURATION, SPIN_FULL_TURNS};
