//! Health component and hit handling

use serde::{Deserialize, Serialize};

/// Events produced by a [`Health`] since the last update
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HealthEvent {
    /// A hit landed
    Damaged { amount: f32, remaining: f32 },
    /// Health was restored
    Healed { amount: f32, current: f32 },
    /// Health reached zero
    Died,
    /// Invulnerability started after a hit
    InvulnerabilityStarted { duration: f32 },
    /// Invulnerability ran out
    InvulnerabilityEnded,
}

/// Current and maximum health with optional i-frames
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Health {
    pub current: f32,
    pub max: f32,
    /// Invulnerability after taking damage, in seconds (0 = none)
    pub invulnerability_on_hit: f32,
    #[serde(skip)]
    invulnerability_timer: f32,
    #[serde(skip)]
    dead: bool,
    #[serde(skip)]
    pending: Vec<HealthEvent>,
}

impl Health {
    /// Full health; a non-positive maximum starts dead
    pub fn new(max_health: f32) -> Self {
        let max = max_health.max(0.0);
        Self {
            current: max,
            max,
            invulnerability_on_hit: 0.0,
            invulnerability_timer: 0.0,
            dead: max <= 0.0,
            pending: Vec::new(),
        }
    }

    /// Grant this many seconds of i-frames after every non-lethal hit
    pub fn with_invulnerability_on_hit(mut self, duration: f32) -> Self {
        self.invulnerability_on_hit = duration.max(0.0);
        self
    }

    /// Whether hits are currently ignored
    pub fn is_invulnerable(&self) -> bool {
        self.invulnerability_timer > 0.0
    }

    /// Apply damage
    ///
    /// Returns the damage actually dealt and whether this hit killed.
    /// Ignored while dead or invulnerable.
    pub fn apply_damage(&mut self, amount: f32) -> (f32, bool) {
        if self.dead || self.is_invulnerable() || amount <= 0.0 {
            return (0.0, false);
        }

        let before = self.current;
        self.current = (self.current - amount).max(0.0);
        let dealt = before - self.current;
        self.pending.push(HealthEvent::Damaged {
            amount: dealt,
            remaining: self.current,
        });

        if self.current <= 0.0 {
            self.dead = true;
            self.invulnerability_timer = 0.0;
            self.pending.push(HealthEvent::Died);
            log::debug!("Health depleted by {:.1}", dealt);
            return (dealt, true);
        }

        if self.invulnerability_on_hit > 0.0 {
            self.invulnerability_timer = self.invulnerability_on_hit;
            self.pending.push(HealthEvent::InvulnerabilityStarted {
                duration: self.invulnerability_on_hit,
            });
        }

        (dealt, false)
    }

    /// Heal, clamped to max; returns the amount actually restored
    pub fn heal(&mut self, amount: f32) -> f32 {
        if self.dead || amount <= 0.0 {
            return 0.0;
        }

        let before = self.current;
        self.current = (self.current + amount).min(self.max);
        let healed = self.current - before;
        if healed > 0.0 {
            self.pending.push(HealthEvent::Healed {
                amount: healed,
                current: self.current,
            });
        }
        healed
    }

    /// Advance timers and drain the events raised since the last call
    pub fn update(&mut self, delta_time: f32) -> Vec<HealthEvent> {
        if self.invulnerability_timer > 0.0 {
            self.invulnerability_timer -= delta_time;
            if self.invulnerability_timer <= 0.0 {
                self.invulnerability_timer = 0.0;
                self.pending.push(HealthEvent::InvulnerabilityEnded);
            }
        }
        std::mem::take(&mut self.pending)
    }

    /// Current over max in `[0, 1]`
    pub fn ratio(&self) -> f32 {
        if self.max <= 0.0 {
            return 0.0;
        }
        (self.current / self.max).clamp(0.0, 1.0)
    }

    pub fn is_full(&self) -> bool {
        self.current >= self.max
    }

    /// False once health reached zero
    pub fn is_alive(&self) -> bool {
        !self.dead
    }
}

impl Default for Health {
    fn default() -> Self {
        Self::new(100.0)
    }
}
