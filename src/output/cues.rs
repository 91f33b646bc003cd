//! cues.rs
//! The cue sequence of every act, as sent to the console and the audio engine.
//!
//! Console sequences are the numbered cue stacks programmed on the lighting
//! desk; audio ids are the audio engine's action ids (markers and regions in the
//! show project).

use crate::input::seat::Seat;
use crate::output::dispatcher::CueMessage;

pub mod audio {
    pub const PLAY: u32 = 1007;
    pub const PAUSE: u32 = 1008;
    pub const WELCOME: u32 = 40161;
    pub const ROUND1_INTRO: u32 = 40164;
    pub const ROUND1_GAME: u32 = 40166;
    pub const ELIMINATED_RIGHT: u32 = 40168;
    pub const ELIMINATED_LEFT: u32 = 40160;
    pub const ELIMINATED_MIDDLE: u32 = 41258;
    pub const ROUND2_INTRO: u32 = 41260;
    pub const ROUND2_GAME: u32 = 41262;
    pub const LOSER: u32 = 41268;
    pub const WIN: u32 = 41254;
    pub const OUTRO: u32 = 41269;
    pub const CLUE_RIGHT: u32 = 41263;
    // Same region as ROUND2_GAME in the show project.
    pub const CLUE_MIDDLE: u32 = 41262;
    pub const CLUE_LEFT: u32 = 41252;
}

fn play(id: u32) -> [CueMessage; 2] {
    [CueMessage::audio_action(audio::PLAY), CueMessage::audio_action(id)]
}

/// Act 1: house lights, welcome loop.
pub fn startup() -> Vec<CueMessage> {
    let mut cues = vec![CueMessage::console_off(16)];
    cues.extend(play(audio::WELCOME));
    cues.extend([5, 6, 8].map(CueMessage::console_go));
    cues
}

/// Act 2: all three seats held, game intro.
pub fn game_intro() -> Vec<CueMessage> {
    let mut cues = play(audio::ROUND1_INTRO).to_vec();
    cues.extend([5, 6, 8].map(CueMessage::console_off));
    cues.push(CueMessage::console_go(7));
    cues
}

/// Act 3: round 1 music starts.
pub fn round1_start() -> Vec<CueMessage> {
    let mut cues = vec![CueMessage::console_off(7), CueMessage::console_go(8)];
    cues.extend(play(audio::ROUND1_GAME));
    cues
}

pub fn pause_music() -> Vec<CueMessage> {
    vec![CueMessage::audio_action(audio::PAUSE)]
}

/// Act 4: spotlight and sting for the eliminated seat.
pub fn elimination(seat: Seat) -> Vec<CueMessage> {
    let (sequence, sting) = match seat {
        Seat::Left => (10, audio::ELIMINATED_LEFT),
        Seat::Middle => (11, audio::ELIMINATED_MIDDLE),
        Seat::Right => (12, audio::ELIMINATED_RIGHT),
    };
    let mut cues = vec![CueMessage::console_go(sequence)];
    cues.extend(play(sting));
    cues.push(CueMessage::console_go(9));
    cues
}

/// Act 5: clears the round 1 looks and plays the round 2 intro.
pub fn round2_intro() -> Vec<CueMessage> {
    let mut cues: Vec<CueMessage> = [12, 10, 11, 9].map(CueMessage::console_off).to_vec();
    cues.extend(play(audio::ROUND2_INTRO));
    cues.push(CueMessage::console_go(18));
    cues
}

/// Act 6: round 2 music.
pub fn round2_start() -> Vec<CueMessage> {
    let mut cues = vec![CueMessage::console_off(18), CueMessage::console_go(19)];
    cues.extend(play(audio::ROUND2_GAME));
    cues
}

/// Spoken hint naming the target seat.
pub fn round2_clue(target: Seat) -> CueMessage {
    CueMessage::audio_action(match target {
        Seat::Right => audio::CLUE_RIGHT,
        Seat::Middle => audio::CLUE_MIDDLE,
        Seat::Left => audio::CLUE_LEFT,
    })
}

/// Act 6.5: wrong guess.
pub fn loser() -> Vec<CueMessage> {
    let mut cues = vec![CueMessage::console_off(19), CueMessage::console_go(17)];
    cues.extend(play(audio::LOSER));
    cues
}

/// Act 7
pub fn victory(winner: Seat) -> Vec<CueMessage> {
    let sequence = match winner {
        Seat::Left => 13,
        Seat::Right => 14,
        Seat::Middle => 15,
    };
    let mut cues = play(audio::WIN).to_vec();
    cues.push(CueMessage::console_go(sequence));
    cues
}

/// Act 8
pub fn outro() -> Vec<CueMessage> {
    let mut cues = play(audio::OUTRO).to_vec();
    cues.push(CueMessage::console_go(16));
    cues
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn startup_order() {
        let cues = startup();
        assert_eq!(cues[0], CueMessage::console_off(16));
        assert_eq!(cues[1], CueMessage::audio_action(audio::PLAY));
        assert_eq!(cues[2], CueMessage::audio_action(audio::WELCOME));
        assert_eq!(&cues[3..], &[5, 6, 8].map(CueMessage::console_go));
    }

    #[test]
    fn elimination_is_seat_specific() {
        let left = elimination(Seat::Left);
        assert_eq!(left[0], CueMessage::console_go(10));
        assert_eq!(left[2], CueMessage::audio_action(audio::ELIMINATED_LEFT));
        assert_eq!(left.last(), Some(&CueMessage::console_go(9)));

        assert_eq!(elimination(Seat::Middle)[0], CueMessage::console_go(11));
        assert_eq!(elimination(Seat::Right)[2], CueMessage::audio_action(audio::ELIMINATED_RIGHT));
    }

    #[test]
    fn victory_and_clue_per_seat() {
        assert_eq!(victory(Seat::Right).last(), Some(&CueMessage::console_go(14)));
        assert_eq!(victory(Seat::Left).last(), Some(&CueMessage::console_go(13)));
        assert_eq!(round2_clue(Seat::Left), CueMessage::audio_action(41252));
        assert_eq!(round2_clue(Seat::Right), CueMessage::audio_action(41263));
    }

    #[test]
    fn round2_intro_clears_round1_looks() {
        let cues = round2_intro();
        assert_eq!(&cues[..4], &[12, 10, 11, 9].map(CueMessage::console_off));
        assert_eq!(cues.last(), Some(&CueMessage::console_go(18)));
    }
}
