//! Noise-cancellation profile selection for inbound audio.

use crate::room::ParticipantHandle;
use serde::Serialize;
use verdant_types::{NoiseProfile, ParticipantKind};

/// Picks the noise-cancellation profile for a participant's transport.
pub fn select_profile(kind: ParticipantKind) -> NoiseProfile {
    match kind {
        ParticipantKind::Telephony => NoiseProfile::Telephony,
        ParticipantKind::Generic => NoiseProfile::Generic,
    }
}

/// Resolved profile per transport kind, as handed to a session host that
/// applies it per participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NoiseProfileTable {
    pub telephony: NoiseProfile,
    pub generic: NoiseProfile,
}

/// Options applied to every participant's audio input.
#[derive(Debug, Clone, Copy)]
pub struct AudioInputOptions {
    pub noise_cancellation: fn(ParticipantKind) -> NoiseProfile,
}

impl Default for AudioInputOptions {
    fn default() -> Self {
        Self {
            noise_cancellation: select_profile,
        }
    }
}

impl AudioInputOptions {
    pub fn profile_for(&self, participant: &ParticipantHandle) -> NoiseProfile {
        (self.noise_cancellation)(participant.kind)
    }

    pub fn profile_table(&self) -> NoiseProfileTable {
        NoiseProfileTable {
            telephony: (self.noise_cancellation)(ParticipantKind::Telephony),
            generic: (self.noise_cancellation)(ParticipantKind::Generic),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn telephony_gets_telephony_profile() {
        assert_eq!(select_profile(ParticipantKind::Telephony), NoiseProfile::Telephony);
        assert_eq!(select_profile(ParticipantKind::Generic), NoiseProfile::Generic);
    }

    #[test]
    fn options_dispatch_on_participant_kind() {
        let options = AudioInputOptions::default();
        let caller = ParticipantHandle::new("+15550100", ParticipantKind::Telephony, None);
        let browser = ParticipantHandle::new("farmer", ParticipantKind::Generic, None);

        assert_eq!(options.profile_for(&caller), NoiseProfile::Telephony);
        assert_eq!(options.profile_for(&browser), NoiseProfile::Generic);
        assert_eq!(
            options.profile_table(),
            NoiseProfileTable {
                telephony: NoiseProfile::Telephony,
                generic: NoiseProfile::Generic,
            }
        );
    }
}
