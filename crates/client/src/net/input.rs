//! Local control intent, translated into the same `ClientMessage` vocabulary
//! a real ship's helm crew would send. This harness drives it from a fixed
//! keymap rather than a device abstraction: walking, turning, and (while
//! mounted at a helm) sail/rudder trim.

use dual::net::{ClientMessage, Vec2Json};
use dual::ActionKind;

#[derive(Debug, Clone, Copy, Default)]
pub struct InputState {
    pub move_direction: glam::Vec2,
    pub is_moving: bool,
    pub rotation: f32,
    pub rudder_left: bool,
    pub rudder_right: bool,
    pub sail_openness: f32,
    pub fire: bool,
}

impl InputState {
    /// Builds the messages this tick's intent implies. Movement and rotation
    /// are sent every tick the command loop runs (cheap, idempotent on the
    /// server); ship controls and cannon fire are sent only when asserted so
    /// an unattached player never spams helm messages nobody will honor.
    pub fn to_messages(&self) -> Vec<ClientMessage> {
        let mut messages = vec![
            ClientMessage::MovementState {
                movement: Vec2Json::from(self.move_direction),
                is_moving: self.is_moving,
            },
            ClientMessage::RotationUpdate { rotation: self.rotation },
        ];

        if self.rudder_left || self.rudder_right {
            messages.push(ClientMessage::ShipRudderControl {
                turning_left: self.rudder_left,
                turning_right: self.rudder_right,
            });
        }
        if self.sail_openness > 0.0 {
            messages.push(ClientMessage::ShipSailControl {
                desired_openness: self.sail_openness,
            });
        }
        if self.fire {
            messages.push(ClientMessage::ActionEvent {
                action: ActionKind::FireCannon,
                target: None,
            });
        }

        messages
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idle_input_still_sends_movement_and_rotation() {
        let input = InputState::default();
        let messages = input.to_messages();
        assert_eq!(messages.len(), 2);
    }

    #[test]
    fn rudder_only_sent_while_turning() {
        let mut input = InputState::default();
        input.rudder_left = true;
        let messages = input.to_messages();
        assert!(messages
            .iter()
            .any(|m| matches!(m, ClientMessage::ShipRudderControl { turning_left: true, .. })));
    }
}
