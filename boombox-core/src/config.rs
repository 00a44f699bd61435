use std::time::Duration;

/// The configuration of the room coordinator.
#[derive(Debug, Clone)]
pub struct Config {
    /// Length of generated room id tokens
    pub room_id_length: usize,
    /// How long a room may go without activity before the sweeper deletes it
    pub max_room_inactivity: Duration,
    /// How often the inactivity sweeper runs
    pub sweep_interval: Duration,
    /// Display name used when a client does not provide one
    pub default_display_name: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            // Short enough to share by hand, unguessable enough to not collide
            room_id_length: 8,
            // One hour
            max_room_inactivity: Duration::from_secs(60 * 60),
            sweep_interval: Duration::from_secs(60),
            default_display_name: "Anonymous".to_string(),
        }
    }
}
