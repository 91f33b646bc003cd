//! Musical Chairs show control: seat sensors and the audio engine's playhead in,
//! lighting console and audio engine cues out.

pub mod game;
pub mod input;
pub mod output;
pub mod show;
pub mod supervisor;
pub mod utils;
