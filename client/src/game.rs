use shared::{PlayerData, Vec2, FRICTION, PLAYER_SPEED};

#[derive(Debug, Clone, Copy)]
pub struct MovementSettings {
    /// Speed set while a direction is held
    pub speed: f32,
    /// Velocity decay rate per second
    pub friction: f32,
}

impl Default for MovementSettings {
    fn default() -> Self {
        Self {
            speed: PLAYER_SPEED,
            friction: FRICTION,
        }
    }
}

/// The player this client controls. Never stored in the remote mirror.
#[derive(Debug, Clone)]
pub struct LocalPlayer {
    pub data: PlayerData,
    settings: MovementSettings,
}

impl LocalPlayer {
    pub fn new(settings: MovementSettings) -> Self {
        Self {
            data: PlayerData::at_spawn(),
            settings,
        }
    }

    /// Advances one frame.
    ///
    /// A held direction sets velocity outright (normalized, so diagonals are
    /// no faster). Velocity then decays with a per-frame lerp towards zero,
    /// which only approximates exponential damping and depends on `dt`.
    pub fn simulate(&mut self, intent: Vec2, dt: f32) {
        if !intent.is_zero() {
            self.data.velocity = intent.normalize().scale(self.settings.speed);
        }

        self.data.position = self.data.position.add(&self.data.velocity.scale(dt));
        self.data.velocity = self
            .data
            .velocity
            .lerp(&Vec2::ZERO, self.settings.friction * dt);
    }
}

impl Default for LocalPlayer {
    fn default() -> Self {
        Self::new(MovementSettings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    const DT: f32 = 1.0 / 60.0;

    #[test]
    fn test_spawns_at_rest() {
        let player = LocalPlayer::default();
        assert_eq!(player.data.position, Vec2::new(50.0, 50.0));
        assert_eq!(player.data.velocity, Vec2::ZERO);
    }

    #[test]
    fn test_cardinal_move() {
        let mut player = LocalPlayer::default();
        player.simulate(Vec2::new(1.0, 0.0), DT);

        assert_approx_eq!(player.data.position.x, 50.0 + PLAYER_SPEED * DT, 1e-4);
        assert_approx_eq!(player.data.position.y, 50.0);
        assert_approx_eq!(
            player.data.velocity.x,
            PLAYER_SPEED * (1.0 - FRICTION * DT),
            1e-4
        );
    }

    #[test]
    fn test_diagonal_speed_matches_cardinal() {
        let mut diagonal = LocalPlayer::default();
        diagonal.simulate(Vec2::new(-1.0, 1.0), DT);

        let mut cardinal = LocalPlayer::default();
        cardinal.simulate(Vec2::new(0.0, 1.0), DT);

        assert_approx_eq!(
            diagonal.data.velocity.magnitude(),
            cardinal.data.velocity.magnitude(),
            1e-3
        );
        let moved = diagonal.data.position.add(&Vec2::new(-50.0, -50.0));
        assert_approx_eq!(moved.magnitude(), PLAYER_SPEED * DT, 1e-4);
    }

    #[test]
    fn test_velocity_decays_without_input() {
        let mut player = LocalPlayer::default();
        player.simulate(Vec2::new(0.0, -1.0), DT);
        let initial_speed = player.data.velocity.magnitude();

        for _ in 0..120 {
            player.simulate(Vec2::ZERO, DT);
        }

        assert!(player.data.velocity.magnitude() < initial_speed * 0.01);
        assert!(player.data.position.y < 50.0);
    }

    #[test]
    fn test_zero_dt_leaves_state_untouched() {
        let mut player = LocalPlayer::default();
        player.data = PlayerData::new(Vec2::new(10.0, 20.0), Vec2::new(1.0, 0.0));

        player.simulate(Vec2::ZERO, 0.0);

        assert_eq!(
            player.data,
            PlayerData::new(Vec2::new(10.0, 20.0), Vec2::new(1.0, 0.0))
        );
    }
}
