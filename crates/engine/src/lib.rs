//! Relay Engine - Check-in state machine, wheel animation, profile sync

pub mod checkin;
pub mod context;
pub mod profile;

pub use checkin::{CheckInApi, CheckInEngine, SpinOutcome, SpinPhase};
pub use checkin::{FrameSource, IntervalFrames, ManualFrames, WheelTimeline};
pub use context::ConsoleContext;
pub use profile::{spawn_profile_sync, ProfileApi, ProfileSyncHandle};
