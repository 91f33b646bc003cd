// Inputs: seat presence sensors and the audio engine's playhead.
// Seats are polled on fixed ticks; playhead samples arrive over OSC/UDP and
// are turned into edge crossings against the cue timestamp table.

pub mod listener;
pub mod seat;
pub mod timeline;
