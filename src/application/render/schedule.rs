//! Reveal and rotation scheduling.
//!
//! Rendering is synchronous and pure; anything that needs wall-clock time or
//! viewport observation is expressed as declarative state machines here. The
//! host surface drives [`RevealState`] from its intersection events and runs
//! rotating composites through [`RotationDriver`], which owns the timers and
//! cancels them on drop.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::directive::DirectiveConfig;

/// Fraction of a block that must enter the viewport before it reveals.
pub const ENTRY_THRESHOLD: f32 = 0.2;
/// Observation margin pulled up from the viewport bottom edge.
pub const BOTTOM_MARGIN_PCT: i8 = -10;

const DEFAULT_TRANSITION_MS: u64 = 1_000;
const DEFAULT_PAUSE_MS: u64 = 2_200;
/// Rotating composites need at least this many slots to animate seamlessly.
pub const MIN_ROTATION_SLOTS: usize = 3;

/// How a rendered block becomes visible on the host surface.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum RevealMode {
    /// Visible from the start; no observation.
    Immediate,
    /// Reveal on first viewport intersection past the threshold.
    Observe { threshold: f32, bottom_margin_pct: i8 },
    /// Reveal when a broadcast for `key` arrives on the pass's reveal bus.
    Synced { key: String },
}

impl RevealMode {
    pub fn observe() -> Self {
        RevealMode::Observe {
            threshold: ENTRY_THRESHOLD,
            bottom_margin_pct: BOTTOM_MARGIN_PCT,
        }
    }
}

/// Per-block reveal flag. Transitions false→true exactly once and never
/// reverts, regardless of later intersection events.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RevealState {
    revealed: bool,
}

impl RevealState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed an intersection ratio. Returns true when this event caused the
    /// reveal.
    pub fn observe(&mut self, ratio: f32) -> bool {
        if !self.revealed && ratio >= ENTRY_THRESHOLD {
            self.revealed = true;
            return true;
        }
        false
    }

    /// Reveal unconditionally (reduced motion, no observer, sync broadcast).
    pub fn force(&mut self) {
        self.revealed = true;
    }

    pub fn is_revealed(&self) -> bool {
        self.revealed
    }
}

/// Broadcast bus for sync-revealed blocks, scoped to one render pass.
///
/// Subscribing registers the key; publishing wakes only keys registered
/// before the broadcast. A block that subscribes after its key was published
/// stays unrevealed, which is the accepted failure mode for out-of-order
/// mounts.
#[derive(Debug, Default)]
pub struct RevealBus {
    channels: Mutex<HashMap<String, watch::Sender<bool>>>,
}

impl RevealBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, key: &str) -> watch::Receiver<bool> {
        let mut channels = self
            .channels
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        channels
            .entry(key.to_string())
            .or_insert_with(|| watch::channel(false).0)
            .subscribe()
    }

    /// Broadcast to subscribers of `key`. Returns whether anyone was
    /// registered.
    pub fn publish(&self, key: &str) -> bool {
        let channels = self
            .channels
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        match channels.get(key) {
            Some(sender) => {
                let _ = sender.send(true);
                true
            }
            None => false,
        }
    }
}

/// Serializable rotation parameters handed to the host surface.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RotationSpec {
    pub slots: usize,
    pub transition_ms: u64,
    pub pause_ms: u64,
}

impl RotationSpec {
    /// Build a spec from directive config, falling back to the stock cadence.
    /// Non-positive overrides are ignored.
    pub fn from_config(slots: usize, config: &DirectiveConfig) -> Self {
        let transition_ms = config
            .number("duration")
            .filter(|ms| *ms > 0.0)
            .map(|ms| ms as u64)
            .unwrap_or(DEFAULT_TRANSITION_MS);
        let pause_ms = config
            .number("pause")
            .filter(|ms| *ms > 0.0)
            .map(|ms| ms as u64)
            .unwrap_or(DEFAULT_PAUSE_MS);
        Self {
            slots,
            transition_ms,
            pause_ms,
        }
    }
}

/// Extend a slot list round-robin until it holds at least `minimum` entries.
/// Empty input stays empty.
pub fn extend_round_robin<T: Clone>(items: &[T], minimum: usize) -> Vec<T> {
    if items.is_empty() {
        return Vec::new();
    }
    let mut extended = items.to_vec();
    let mut index = 0usize;
    while extended.len() < minimum {
        extended.push(items[index % items.len()].clone());
        index += 1;
    }
    extended
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotationPhase {
    Idle,
    Displaying(usize),
    Transitioning { from: usize, to: usize },
}

/// Synchronous rotation state machine. The driver (or a test) supplies the
/// clock; stepping is infallible and wraps around the slot count.
#[derive(Debug, Clone)]
pub struct RotationMachine {
    phase: RotationPhase,
    slots: usize,
    transition: Duration,
    pause: Duration,
    frozen: bool,
}

impl RotationMachine {
    pub fn new(spec: &RotationSpec) -> Self {
        Self {
            phase: RotationPhase::Idle,
            slots: spec.slots,
            transition: Duration::from_millis(spec.transition_ms),
            pause: Duration::from_millis(spec.pause_ms),
            frozen: false,
        }
    }

    /// Reduced-motion freeze: the machine settles on the first slot and stops
    /// advancing. The host suppresses the transform either way.
    pub fn freeze(&mut self) {
        self.frozen = true;
    }

    pub fn phase(&self) -> RotationPhase {
        self.phase
    }

    /// How long the current phase lasts, or `None` when there is nothing to
    /// rotate (zero slots, or frozen on a slot).
    pub fn next_delay(&self) -> Option<Duration> {
        if self.slots == 0 {
            return None;
        }
        match self.phase {
            RotationPhase::Idle => Some(self.pause),
            RotationPhase::Displaying(_) if self.frozen => None,
            RotationPhase::Displaying(_) => Some(self.pause),
            RotationPhase::Transitioning { .. } => Some(self.transition),
        }
    }

    /// Advance one phase.
    pub fn step(&mut self) {
        if self.slots == 0 {
            return;
        }
        self.phase = match self.phase {
            RotationPhase::Idle => RotationPhase::Displaying(0),
            RotationPhase::Displaying(_) if self.frozen => self.phase,
            RotationPhase::Displaying(current) => RotationPhase::Transitioning {
                from: current,
                to: (current + 1) % self.slots,
            },
            RotationPhase::Transitioning { to, .. } => RotationPhase::Displaying(to),
        };
    }
}

/// Owns the timers driving one [`RotationMachine`] and publishes phases over
/// a watch channel. Dropping the driver aborts the task and its timers.
#[derive(Debug)]
pub struct RotationDriver {
    handle: JoinHandle<()>,
    phases: watch::Receiver<RotationPhase>,
}

impl RotationDriver {
    pub fn spawn(mut machine: RotationMachine) -> Self {
        let (sender, phases) = watch::channel(machine.phase());
        let handle = tokio::spawn(async move {
            loop {
                let Some(delay) = machine.next_delay() else {
                    break;
                };
                tokio::time::sleep(delay).await;
                machine.step();
                if sender.send(machine.phase()).is_err() {
                    break;
                }
            }
        });
        Self { handle, phases }
    }

    pub fn phases(&self) -> watch::Receiver<RotationPhase> {
        self.phases.clone()
    }
}

impl Drop for RotationDriver {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(slots: usize) -> RotationSpec {
        RotationSpec {
            slots,
            transition_ms: DEFAULT_TRANSITION_MS,
            pause_ms: DEFAULT_PAUSE_MS,
        }
    }

    #[test]
    fn reveal_is_monotonic() {
        let mut state = RevealState::new();
        assert!(!state.observe(0.1));
        assert!(state.observe(0.25));
        assert!(state.is_revealed());
        // Scrolling back out never un-reveals.
        assert!(!state.observe(0.0));
        assert!(state.is_revealed());
    }

    #[test]
    fn bus_delivers_to_prior_subscribers() {
        let bus = RevealBus::new();
        let mut receiver = bus.subscribe("block-7");
        assert!(bus.publish("block-7"));
        assert!(*receiver.borrow_and_update());
    }

    #[test]
    fn missed_broadcast_stays_unrevealed() {
        let bus = RevealBus::new();
        assert!(!bus.publish("block-7"));
        let receiver = bus.subscribe("block-7");
        assert!(!*receiver.borrow());
    }

    #[test]
    fn round_robin_extends_to_minimum() {
        let extended = extend_round_robin(&["a", "b"], MIN_ROTATION_SLOTS);
        assert_eq!(extended, vec!["a", "b", "a"]);

        let single = extend_round_robin(&["x"], MIN_ROTATION_SLOTS);
        assert_eq!(single, vec!["x", "x", "x"]);

        let already_enough = extend_round_robin(&[1, 2, 3, 4], MIN_ROTATION_SLOTS);
        assert_eq!(already_enough, vec![1, 2, 3, 4]);

        let empty: Vec<&str> = extend_round_robin(&[], MIN_ROTATION_SLOTS);
        assert!(empty.is_empty());
    }

    #[test]
    fn machine_cycles_through_phases() {
        let mut machine = RotationMachine::new(&spec(3));
        assert_eq!(machine.phase(), RotationPhase::Idle);
        machine.step();
        assert_eq!(machine.phase(), RotationPhase::Displaying(0));
        machine.step();
        assert_eq!(
            machine.phase(),
            RotationPhase::Transitioning { from: 0, to: 1 }
        );
        machine.step();
        assert_eq!(machine.phase(), RotationPhase::Displaying(1));
        // Wraps at the end.
        machine.step();
        machine.step();
        machine.step();
        machine.step();
        assert_eq!(machine.phase(), RotationPhase::Displaying(0));
    }

    #[test]
    fn zero_slots_never_schedules() {
        let mut machine = RotationMachine::new(&spec(0));
        assert_eq!(machine.next_delay(), None);
        machine.step();
        assert_eq!(machine.phase(), RotationPhase::Idle);
    }

    #[test]
    fn frozen_machine_settles_on_first_slot() {
        let mut machine = RotationMachine::new(&spec(3));
        machine.freeze();
        machine.step();
        assert_eq!(machine.phase(), RotationPhase::Displaying(0));
        assert_eq!(machine.next_delay(), None);
        machine.step();
        assert_eq!(machine.phase(), RotationPhase::Displaying(0));
    }

    #[test]
    fn config_overrides_cadence() {
        let runs = [crate::domain::blocks::RichTextRun::plain(
            "#circle duration=500 pause=1500",
        )];
        let parsed = super::super::directive::parse(&runs, None).expect("directive");
        let spec = RotationSpec::from_config(3, &parsed.config);
        assert_eq!(spec.transition_ms, 500);
        assert_eq!(spec.pause_ms, 1500);
    }

    #[tokio::test(start_paused = true)]
    async fn driver_publishes_phases_on_cadence() {
        let driver = RotationDriver::spawn(RotationMachine::new(&spec(3)));
        let mut phases = driver.phases();

        phases.changed().await.expect("first phase");
        assert_eq!(*phases.borrow_and_update(), RotationPhase::Displaying(0));

        phases.changed().await.expect("second phase");
        assert_eq!(
            *phases.borrow_and_update(),
            RotationPhase::Transitioning { from: 0, to: 1 }
        );

        phases.changed().await.expect("third phase");
        assert_eq!(*phases.borrow_and_update(), RotationPhase::Displaying(1));
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_driver_stops_the_stream() {
        let driver = RotationDriver::spawn(RotationMachine::new(&spec(3)));
        let mut phases = driver.phases();
        phases.changed().await.expect("first phase");
        drop(driver);
        assert!(phases.changed().await.is_err());
    }
}
