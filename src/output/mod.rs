// Outputs: cue messages to the lighting console and the audio engine.
// Delivery is fire-and-forget; a lost cue is logged and the show carries on.

pub mod cues;
pub mod dispatcher;
