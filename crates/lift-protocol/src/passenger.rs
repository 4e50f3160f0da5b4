/// # Passenger State Table
///
/// Passengers mirror the elevator's connect/lifecycle pattern. Only the
/// transition table is modelled here; there is no passenger actor.
///
/// ```text
///                    ┌──────────────┐
///                    │ Initialising │
///                    └──────┬───────┘
///                           ▼
///                    ┌──────────────┐
///                    │ Disconnected │◄──────────────────┐
///                    └──────┬───────┘                   │
///                           │ connect                   │
///                           ▼                           │
///                    ┌──────────────┐  connection fail  │
///      ┌────────────►│  Connecting  ├───────────────────┤
///      │             └──────┬───────┘                   │
///      │ connect            │ connected ok              │
///      │                    ▼                           │
///      │          ┌─────────────────────┐  disconnected │
///      └──────────┤ AwaitingInstruction ├───────────────┘
///                 └──────────┬──────────┘◄──────┐
///                            │ elevator arrived │ destination arrived
///                            ▼                  │
///                    ┌──────────────┐           │
///                    │  InElevator  ├───────────┘
///                    └──────────────┘
/// ```
///
/// `InLobby` is declared by the protocol but no event leads into it yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PassengerState {
    Initialising,
    Disconnected,
    Connecting,
    InLobby,
    InElevator,
    AwaitingInstruction,
    Quitting,
}

/// Events a passenger can observe
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PassengerEvent {
    Initiate,
    InitialisedOk,
    Connect,
    ConnectedOk,
    ConnectionFail,
    Disconnect,
    Disconnected,
    Call,
    ElevatorArrived,
    DestinationArrived,
    Quit,
}

impl PassengerState {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Initialising => "initialising",
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::InLobby => "in_lobby",
            Self::InElevator => "in_elevator",
            Self::AwaitingInstruction => "awaiting_instruction",
            Self::Quitting => "quitting",
        }
    }

    /// Next state for `event`, or `None` when the table has no entry
    pub fn next(&self, event: PassengerEvent) -> Option<PassengerState> {
        use PassengerEvent as E;
        use PassengerState::*;

        match (self, event) {
            (Quitting, _) => None,
            (_, E::Quit) => Some(Quitting),

            (Initialising, E::InitialisedOk) => Some(Disconnected),

            (Disconnected, E::Connect) => Some(Connecting),

            (Connecting, E::ConnectedOk) => Some(AwaitingInstruction),
            (Connecting, E::ConnectionFail) => Some(Disconnected),

            (AwaitingInstruction, E::Connect) => Some(Connecting),
            (AwaitingInstruction, E::Disconnected) => Some(Disconnected),
            (AwaitingInstruction, E::ElevatorArrived) => Some(InElevator),

            (InElevator, E::DestinationArrived) => Some(AwaitingInstruction),

            _ => None,
        }
    }

    pub fn can_transition_to(&self, new_state: PassengerState) -> bool {
        const EVENTS: [PassengerEvent; 11] = [
            PassengerEvent::Initiate,
            PassengerEvent::InitialisedOk,
            PassengerEvent::Connect,
            PassengerEvent::ConnectedOk,
            PassengerEvent::ConnectionFail,
            PassengerEvent::Disconnect,
            PassengerEvent::Disconnected,
            PassengerEvent::Call,
            PassengerEvent::ElevatorArrived,
            PassengerEvent::DestinationArrived,
            PassengerEvent::Quit,
        ];
        EVENTS.iter().any(|e| self.next(*e) == Some(new_state))
    }
}

#[cfg(test)]
#[allow(clippy::panic, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn test_connect_round_trip() {
        let s = PassengerState::Initialising
            .next(PassengerEvent::InitialisedOk)
            .unwrap();
        assert_eq!(s, PassengerState::Disconnected);
        let s = s.next(PassengerEvent::Connect).unwrap();
        assert_eq!(s, PassengerState::Connecting);
        assert_eq!(
            s.next(PassengerEvent::ConnectionFail),
            Some(PassengerState::Disconnected)
        );
        assert_eq!(
            s.next(PassengerEvent::ConnectedOk),
            Some(PassengerState::AwaitingInstruction)
        );
    }

    #[test]
    fn test_ride_cycle() {
        let waiting = PassengerState::AwaitingInstruction;
        let riding = waiting.next(PassengerEvent::ElevatorArrived).unwrap();
        assert_eq!(riding, PassengerState::InElevator);
        assert_eq!(
            riding.next(PassengerEvent::DestinationArrived),
            Some(PassengerState::AwaitingInstruction)
        );
    }

    #[test]
    fn test_unspecified_events_have_no_entry() {
        assert_eq!(PassengerState::AwaitingInstruction.next(PassengerEvent::Call), None);
        assert_eq!(PassengerState::Disconnected.next(PassengerEvent::ElevatorArrived), None);
        assert!(!PassengerState::Disconnected.can_transition_to(PassengerState::InLobby));
    }

    #[test]
    fn test_quit_is_terminal() {
        assert_eq!(
            PassengerState::InElevator.next(PassengerEvent::Quit),
            Some(PassengerState::Quitting)
        );
        assert_eq!(PassengerState::Quitting.next(PassengerEvent::Connect), None);
        assert!(PassengerState::Connecting.can_transition_to(PassengerState::Quitting));
    }
}
