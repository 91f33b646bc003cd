// Game layer: act state machine, minigames, lobby gate and idle watchdog.

pub mod acts;
pub mod lobby;
pub mod round1;
pub mod round2;
pub mod rounds;
pub mod watchdog;
