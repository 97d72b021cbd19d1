//! Commands issued by brains to the body they drive

use glam::Vec2;

/// Body-side command sink
///
/// Commands are fire-and-forget; how the body realizes them (forces,
/// animation, sound) is up to the host.
pub trait Actuator {
    /// Move along `direction` (zero = stop); magnitude is a hint in `[0, 1]`
    fn move_in(&mut self, direction: Vec2);
    /// Face a world position
    fn look_at(&mut self, position: Vec2);
    /// Start a melee swing
    fn attack(&mut self);
    /// Abort the current swing and return to a neutral pose
    fn cancel_attack(&mut self);
    /// Launch a projectile along `direction`
    fn fire(&mut self, direction: Vec2);
}

/// Animation state queries used by timed routines
pub trait AnimationProgress {
    /// Whether the named state is the active one
    fn is_in_state(&self, state: &str) -> bool;
    /// Normalized time of the active state (1.0 = one full play)
    fn normalized_time(&self) -> f32;
}

/// Host without animation feedback: every state reads as finished
#[derive(Debug, Clone, Copy, Default)]
pub struct NoAnimation;

impl AnimationProgress for NoAnimation {
    fn is_in_state(&self, _state: &str) -> bool {
        true
    }

    fn normalized_time(&self) -> f32 {
        1.0
    }
}

/// A recorded actuator command
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    Move(Vec2),
    LookAt(Vec2),
    Attack,
    CancelAttack,
    Fire(Vec2),
}

/// Actuator that only records what it was told
#[derive(Debug, Clone, Default)]
pub struct RecordingActuator {
    pub commands: Vec<Command>,
}

impl RecordingActuator {
    /// Empty recorder
    pub fn new() -> Self {
        Self::default()
    }

    /// Last movement command, if any
    pub fn last_move(&self) -> Option<Vec2> {
        self.commands.iter().rev().find_map(|c| match c {
            Command::Move(dir) => Some(*dir),
            _ => None,
        })
    }

    /// Swings issued so far
    pub fn attack_count(&self) -> usize {
        self.commands
            .iter()
            .filter(|c| matches!(c, Command::Attack))
            .count()
    }

    /// Projectiles fired so far
    pub fn fire_count(&self) -> usize {
        self.commands
            .iter()
            .filter(|c| matches!(c, Command::Fire(_)))
            .count()
    }

    pub fn cancel_count(&self) -> usize {
        self.commands
            .iter()
            .filter(|c| matches!(c, Command::CancelAttack))
            .count()
    }

    /// Forget everything recorded
    pub fn clear(&mut self) {
        self.commands.clear();
    }
}

impl Actuator for RecordingActuator {
    fn move_in(&mut self, direction: Vec2) {
        self.commands.push(Command::Move(direction));
    }

    fn look_at(&mut self, position: Vec2) {
        self.commands.push(Command::LookAt(position));
    }

    fn attack(&mut self) {
        self.commands.push(Command::Attack);
    }

    fn cancel_attack(&mut self) {
        self.commands.push(Command::CancelAttack);
    }

    fn fire(&mut self, direction: Vec2) {
        self.commands.push(Command::Fire(direction));
    }
}
