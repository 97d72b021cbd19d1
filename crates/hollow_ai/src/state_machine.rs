//! Finite State Machine (FSM) implementation
//!
//! Exactly one state is active. Condition transitions are checked on
//! [`StateMachine::update`]; brains also switch imperatively with
//! [`StateMachine::force_transition`] when a decision involves timers or
//! dice. Every switch is synchronous and reported to the caller so it
//! can run the matching enter/exit side effects.

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;

/// A state in the state machine
pub trait State: Copy + Eq + Hash + fmt::Debug {}

impl<T> State for T where T: Copy + Eq + Hash + fmt::Debug {}

/// Transition condition
pub type TransitionCondition<C> = Box<dyn Fn(&C) -> bool + Send + Sync>;

/// A state transition
pub struct Transition<S, C> {
    /// Target state
    pub to: S,
    /// Condition function
    pub condition: TransitionCondition<C>,
    /// Priority (higher = checked first)
    pub priority: i32,
}

impl<S, C> Transition<S, C> {
    /// Transition with priority 0
    pub fn new<F>(to: S, condition: F) -> Self
    where
        F: Fn(&C) -> bool + Send + Sync + 'static,
    {
        Self {
            to,
            condition: Box::new(condition),
            priority: 0,
        }
    }

    /// Set priority (higher = checked first)
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Evaluate the condition against `context`
    pub fn should_transition(&self, context: &C) -> bool {
        (self.condition)(context)
    }
}

/// A completed state switch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateChange<S> {
    pub from: S,
    pub to: S,
}

/// Finite State Machine
pub struct StateMachine<S, C>
where
    S: State,
{
    label: &'static str,
    current: S,
    previous: Option<S>,
    time_in_state: f32,
    /// Kept sorted by descending priority
    transitions: HashMap<S, Vec<Transition<S, C>>>,
    /// Checked from any state before the per-state ones
    global_transitions: Vec<Transition<S, C>>,
}

impl<S, C> StateMachine<S, C>
where
    S: State,
{
    /// Create a new state machine in `initial`
    pub fn new(initial: S) -> Self {
        Self {
            label: "fsm",
            current: initial,
            previous: None,
            time_in_state: 0.0,
            transitions: HashMap::new(),
            global_transitions: Vec::new(),
        }
    }

    /// Name used in transition logs
    pub fn with_label(mut self, label: &'static str) -> Self {
        self.label = label;
        self
    }

    /// Add a transition between states
    pub fn add_transition<F>(&mut self, from: S, to: S, condition: F)
    where
        F: Fn(&C) -> bool + Send + Sync + 'static,
    {
        self.add_transition_priority(from, to, condition, 0);
    }

    /// Add a transition with priority
    pub fn add_transition_priority<F>(&mut self, from: S, to: S, condition: F, priority: i32)
    where
        F: Fn(&C) -> bool + Send + Sync + 'static,
    {
        let list = self.transitions.entry(from).or_default();
        list.push(Transition::new(to, condition).with_priority(priority));
        // Stable, so equal priorities keep insertion order
        list.sort_by(|a, b| b.priority.cmp(&a.priority));
    }

    /// Add a transition that can fire from any other state
    pub fn add_global_transition<F>(&mut self, to: S, condition: F)
    where
        F: Fn(&C) -> bool + Send + Sync + 'static,
    {
        self.global_transitions.push(Transition::new(to, condition));
    }

    /// Get current state
    pub fn current(&self) -> S {
        self.current
    }

    /// Get previous state
    pub fn previous(&self) -> Option<S> {
        self.previous
    }

    /// Check if in a specific state
    pub fn is_in(&self, state: S) -> bool {
        self.current == state
    }

    /// Seconds since the current state was entered
    pub fn time_in_state(&self) -> f32 {
        self.time_in_state
    }

    /// Switch immediately; switching to the current state does nothing
    pub fn force_transition(&mut self, to: S) -> Option<StateChange<S>> {
        if to == self.current {
            return None;
        }
        let change = StateChange {
            from: self.current,
            to,
        };
        log::debug!("{}: {:?} -> {:?}", self.label, change.from, change.to);

        self.previous = Some(self.current);
        self.current = to;
        self.time_in_state = 0.0;
        Some(change)
    }

    /// Advance the state clock and take the first transition whose
    /// condition holds
    pub fn update(&mut self, context: &C, delta_time: f32) -> Option<StateChange<S>> {
        self.time_in_state += delta_time;

        let target = self
            .global_transitions
            .iter()
            .find(|t| t.to != self.current && t.should_transition(context))
            .or_else(|| {
                self.transitions
                    .get(&self.current)?
                    .iter()
                    .find(|t| t.should_transition(context))
            })
            .map(|t| t.to)?;

        self.force_transition(target)
    }
}

impl<S: State, C> fmt::Debug for StateMachine<S, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateMachine")
            .field("label", &self.label)
            .field("current", &self.current)
            .field("previous", &self.previous)
            .field("time_in_state", &self.time_in_state)
            .finish()
    }
}
