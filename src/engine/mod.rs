pub mod reaper;
pub mod sequencer;
pub mod session;
