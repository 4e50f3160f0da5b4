//! Pure elevator lifecycle machine
//!
//! [`Machine::step`] takes the current state and cabin plus one [`Event`] and
//! returns the next machine and the [`Effect`]s the owning actor must carry
//! out (arm or disarm the tick, register with the dispatcher, release the
//! link, emit observer events). No I/O happens here, so every transition is
//! testable without a runtime.
//!
//! Entry and exit hooks:
//!
//! | State        | on enter                                   | on exit       |
//! |--------------|--------------------------------------------|---------------|
//! | disconnected | stop                                       |               |
//! | idle         | stop; queue non-empty starts a trip        |               |
//! | in_transit   | aim at head, arm transit tick              | disarm, stop  |
//! | at_waypoint  | arm dwell tick                             | disarm        |
//! | quitting     | disarm, release link, terminate            |               |

use crate::motion::{Advance, Cabin};
use lift_protocol::{ElevatorConfig, LifecycleState};

/// Input to the machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// One-time setup finished
    Initialised { ok: bool },
    /// Connect attempt for the current target succeeded
    Connected,
    /// Connect attempt for the current target failed
    ConnectFailed,
    /// Operator or dispatcher asked for a floor
    Waypoint(i32),
    /// The pending transit or dwell tick fired
    Tick,
    Quit,
}

/// Which tick to arm
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKind {
    /// One floor of travel
    Transit,
    /// Doors open at a reached waypoint
    Dwell,
}

/// Side effect requested by a transition, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    StateChanged(LifecycleState),
    ArmTimer(TimerKind),
    DisarmTimer,
    /// Announce this elevator on the freshly established link
    Register,
    ReleaseConnection,
    Terminate,
    FloorPassed(i32),
    WaypointReached(i32),
    /// Out-of-range floor dropped
    WaypointRejected(i32),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Machine {
    state: LifecycleState,
    cabin: Cabin,
}

impl Machine {
    pub fn new(config: &ElevatorConfig) -> Self {
        Self {
            state: LifecycleState::Initialising,
            cabin: Cabin::new(config.start_floor),
        }
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn cabin(&self) -> &Cabin {
        &self.cabin
    }

    /// Apply one event
    ///
    /// Events that make no sense in the current state leave the machine
    /// untouched and produce no effects. Nothing happens after quitting.
    pub fn step(mut self, config: &ElevatorConfig, event: Event) -> (Self, Vec<Effect>) {
        use LifecycleState::*;

        let mut effects = Vec::new();
        if self.state.is_terminal() {
            return (self, effects);
        }

        match (self.state, event) {
            (_, Event::Quit) => self.change(Quitting, &mut effects),

            (Initialising, Event::Initialised { ok: true }) => {
                self.change(Disconnected, &mut effects)
            }
            (Initialising, Event::Initialised { ok: false }) => {
                self.change(Quitting, &mut effects)
            }

            (state, Event::Connected) if state.accepts_connect() => {
                self.change(Idle, &mut effects);
                effects.push(Effect::Register);
            }
            (state, Event::ConnectFailed) if state.accepts_connect() => {
                self.change(Disconnected, &mut effects)
            }

            (state, Event::Waypoint(floor)) if state.accepts_waypoints() => {
                if self.cabin.accept(floor, config).is_err() {
                    effects.push(Effect::WaypointRejected(floor));
                } else if state == Idle {
                    self.change(InTransit, &mut effects);
                }
            }

            (InTransit, Event::Tick) => match self.cabin.advance() {
                Advance::QueueEmpty => self.change(Idle, &mut effects),
                Advance::Moved { floor } => {
                    effects.push(Effect::FloorPassed(floor));
                    effects.push(Effect::ArmTimer(TimerKind::Transit));
                }
                Advance::Arrived { floor } => {
                    effects.push(Effect::WaypointReached(floor));
                    self.change(AtWaypoint, &mut effects);
                }
            },

            (AtWaypoint, Event::Tick) => {
                let next = if self.cabin.has_waypoints() {
                    InTransit
                } else {
                    Idle
                };
                self.change(next, &mut effects);
            }

            _ => {}
        }

        (self, effects)
    }

    /// Run exit hook, switch state, run entry hook
    ///
    /// An entry hook may request a follow-up transition (idle with work
    /// queued goes straight to in_transit); those are chained here.
    fn change(&mut self, to: LifecycleState, effects: &mut Vec<Effect>) {
        let mut next = Some(to);
        while let Some(to) = next.take() {
            if !self.state.can_transition_to(to) {
                return;
            }
            self.exit(effects);
            self.state = to;
            effects.push(Effect::StateChanged(to));
            next = self.enter(effects);
        }
    }

    fn exit(&mut self, effects: &mut Vec<Effect>) {
        match self.state {
            LifecycleState::InTransit => {
                effects.push(Effect::DisarmTimer);
                self.cabin.stop();
            }
            LifecycleState::AtWaypoint => effects.push(Effect::DisarmTimer),
            _ => {}
        }
    }

    fn enter(&mut self, effects: &mut Vec<Effect>) -> Option<LifecycleState> {
        match self.state {
            LifecycleState::Initialising => None,
            LifecycleState::Disconnected => {
                self.cabin.stop();
                None
            }
            LifecycleState::AtWaypoint => {
                self.cabin.stop();
                effects.push(Effect::ArmTimer(TimerKind::Dwell));
                None
            }
            LifecycleState::Idle => {
                self.cabin.stop();
                // Start check: anything queued means go
                self.cabin
                    .has_waypoints()
                    .then_some(LifecycleState::InTransit)
            }
            LifecycleState::InTransit => {
                self.cabin.aim();
                effects.push(Effect::ArmTimer(TimerKind::Transit));
                None
            }
            LifecycleState::Quitting => {
                effects.push(Effect::DisarmTimer);
                effects.push(Effect::ReleaseConnection);
                effects.push(Effect::Terminate);
                None
            }
        }
    }
}
