// Sound cue board. The client does not play audio; cues are passed to the
// view, which shows them, and are muted by `ui.sound = false`.

use cardstories_core::game::{GamePhase, PhaseTransition};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SoundCue {
    /// Hands are dealt for a new invitation.
    Deal,
    Shuffle,
    /// Results are revealed.
    Reveal,
    Fold,
    Chat,
    LevelUp,
}

impl SoundCue {
    pub fn label(self) -> &'static str {
        match self {
            SoundCue::Deal => "deal",
            SoundCue::Shuffle => "shuffle",
            SoundCue::Reveal => "reveal",
            SoundCue::Fold => "fold",
            SoundCue::Chat => "chat",
            SoundCue::LevelUp => "level up",
        }
    }
}

/// Cue for a phase change. First showings of a game are silent.
pub fn cue_for_transition(transition: PhaseTransition) -> Option<SoundCue> {
    transition.from?;
    match transition.to {
        GamePhase::Create => None,
        GamePhase::Invitation => Some(SoundCue::Deal),
        GamePhase::Vote => Some(SoundCue::Shuffle),
        GamePhase::Complete => Some(SoundCue::Reveal),
        GamePhase::Canceled => Some(SoundCue::Fold),
    }
}
