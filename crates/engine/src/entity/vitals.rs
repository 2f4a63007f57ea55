/// Upper bound for health and hunger.
pub const MAX_VITAL: f32 = 20.0;
/// Hunger points lost per second.
const HUNGER_DRAIN: f32 = 1.0 / 30.0;
/// Hunger at or above which health regenerates.
const REGEN_THRESHOLD: f32 = 18.0;
const REGEN_RATE: f32 = 0.5;
const STARVE_RATE: f32 = 0.5;

/// Health and hunger of a living entity, both in `[0, 20]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vitals {
    pub health: f32,
    pub hunger: f32,
}

impl Default for Vitals {
    fn default() -> Self {
        Self {
            health: MAX_VITAL,
            hunger: MAX_VITAL,
        }
    }
}

impl Vitals {
    pub fn new(health: f32, hunger: f32) -> Self {
        Self {
            health: health.clamp(0.0, MAX_VITAL),
            hunger: hunger.clamp(0.0, MAX_VITAL),
        }
    }

    pub fn is_dead(&self) -> bool {
        self.health <= 0.0
    }

    pub fn damage(&mut self, amount: f32) {
        self.health = (self.health - amount).clamp(0.0, MAX_VITAL);
    }

    pub fn feed(&mut self, amount: f32) {
        self.hunger = (self.hunger + amount).clamp(0.0, MAX_VITAL);
    }

    /// Advance `dt` seconds: drain hunger, regenerate when fed, starve when
    /// empty. Returns whether either value changed.
    pub fn tick(&mut self, dt: f32) -> bool {
        let before = *self;
        self.hunger = (self.hunger - HUNGER_DRAIN * dt).clamp(0.0, MAX_VITAL);
        if self.hunger >= REGEN_THRESHOLD {
            self.health += REGEN_RATE * dt;
        } else if self.hunger <= 0.0 {
            self.health -= STARVE_RATE * dt;
        }
        self.health = self.health.clamp(0.0, MAX_VITAL);
        *self != before
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn values_stay_clamped() {
        let mut v = Vitals::new(25.0, -3.0);
        assert_eq!(v, Vitals::new(20.0, 0.0));
        for _ in 0..1000 {
            v.tick(1.0);
        }
        assert_eq!(v.health, 0.0);
        assert!(v.is_dead());
        v.feed(100.0);
        assert_eq!(v.hunger, MAX_VITAL);
    }

    #[test]
    fn regenerates_when_fed() {
        let mut v = Vitals::new(10.0, 20.0);
        assert!(v.tick(2.0));
        assert!(v.health > 10.0);
        assert!(v.hunger < 20.0);
    }
}
