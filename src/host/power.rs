//! Process-local power state

use crate::device::{PowerCollaborator, PowerState};
use tracing::info;

/// Power collaborator that only tracks the state
///
/// The daemon has no platform power control; standby and wake are
/// recorded and logged.
#[derive(Debug, Clone)]
pub struct LocalPower {
    state: PowerState,
}

impl LocalPower {
    pub fn new() -> Self {
        Self {
            state: PowerState::Awake,
        }
    }
}

impl Default for LocalPower {
    fn default() -> Self {
        Self::new()
    }
}

impl PowerCollaborator for LocalPower {
    fn wake(&mut self) {
        if self.state != PowerState::Awake {
            info!("Power: awake");
        }
        self.state = PowerState::Awake;
    }

    fn standby(&mut self) {
        if self.state != PowerState::Standby {
            info!("Power: standby");
        }
        self.state = PowerState::Standby;
    }

    fn power_state(&self) -> PowerState {
        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transitions() {
        let mut power = LocalPower::new();
        assert_eq!(power.power_state(), PowerState::Awake);
        power.standby();
        assert_eq!(power.power_state(), PowerState::Standby);
        power.wake();
        assert_eq!(power.power_state(), PowerState::Awake);
    }
}
