use crate::network::ConnectionStatus;
use macroquad::prelude::*;
use shared::{ConnectionId, PlayerData, PLAYER_SIZE};
use std::collections::HashMap;

const LOCAL_COLOR: Color = MAGENTA;
const REMOTE_COLOR: Color = GREEN;

#[derive(Debug, Clone)]
pub struct UiConfig {
    pub status: ConnectionStatus,
    pub local_id: Option<ConnectionId>,
    pub server: String,
    pub player_count: usize,
}

pub struct Renderer {
    width: f32,
    height: f32,
}

impl Renderer {
    pub fn new(width: usize, height: usize) -> Self {
        Renderer {
            width: width as f32,
            height: height as f32,
        }
    }

    /// Draws one frame. Remote players are only shown while connected; the
    /// local player is always drawn, on top.
    pub fn render(
        &mut self,
        local: &PlayerData,
        remote: &HashMap<ConnectionId, PlayerData>,
        ui: UiConfig,
    ) {
        clear_background(Color::from_rgba(26, 26, 26, 255));

        if ui.status == ConnectionStatus::Connected {
            for player in remote.values() {
                self.draw_player(player, REMOTE_COLOR);
            }
        }

        self.draw_player(local, LOCAL_COLOR);
        self.draw_velocity_vector(local);

        self.draw_ui(ui);
    }

    fn draw_player(&mut self, player: &PlayerData, color: Color) {
        draw_rectangle(
            player.position.x,
            player.position.y,
            PLAYER_SIZE,
            PLAYER_SIZE,
            color,
        );
    }

    fn draw_velocity_vector(&mut self, player: &PlayerData) {
        let center_x = player.position.x + PLAYER_SIZE / 2.0;
        let center_y = player.position.y + PLAYER_SIZE / 2.0;

        if player.velocity.magnitude() > 10.0 {
            let vel_scale = 0.15;
            let end_x = center_x + player.velocity.x * vel_scale;
            let end_y = center_y + player.velocity.y * vel_scale;
            draw_line(center_x, center_y, end_x, end_y, 2.0, YELLOW);
        }
    }

    fn draw_ui(&mut self, ui: UiConfig) {
        let (label, color) = match ui.status {
            ConnectionStatus::Disconnected => ("Disconnected", GRAY),
            ConnectionStatus::Connecting => ("Connecting...", YELLOW),
            ConnectionStatus::Connected => ("Connected", GREEN),
            ConnectionStatus::FailedToConnect => ("Failed to connect", RED),
        };

        draw_rectangle(10.0, 10.0, 8.0, 8.0, color);
        draw_text(label, 24.0, 18.0, 16.0, WHITE);

        match (ui.status, ui.local_id) {
            (ConnectionStatus::Connected, Some(id)) => {
                let info = format!("ID {} | {} players", id, ui.player_count + 1);
                draw_text(&info, 10.0, 36.0, 16.0, WHITE);
            }
            (status, _) if status.can_connect() => {
                let prompt = format!("Press R or Enter to connect to {}", ui.server);
                draw_text(&prompt, 10.0, 36.0, 16.0, WHITE);
            }
            _ => {}
        }

        draw_text(
            "WASD / arrows to move",
            10.0,
            self.height - 10.0,
            14.0,
            Color::from_rgba(136, 136, 136, 255),
        );

        let fps = format!("{} fps", get_fps());
        draw_text(&fps, self.width - 60.0, 18.0, 14.0, WHITE);
    }
}
