use crate::audio::{EngineState, PlayerEvent};
use tokio::sync::mpsc;

/// Prints a one-line indicator for every player event until the sender is dropped.
pub async fn run_display(mut events: mpsc::UnboundedReceiver<PlayerEvent>) {
    while let Some(event) = events.recv().await {
        if let Some(line) = describe(&event) {
            println!("{}", line);
        }
    }
}

fn describe(event: &PlayerEvent) -> Option<String> {
    match event {
        PlayerEvent::PlaylistLoaded { tracks } => Some(format!("💿 Loaded {} tracks", tracks)),
        PlayerEvent::StateChanged(EngineState::Playing) => Some("▶️  Playing".to_string()),
        PlayerEvent::StateChanged(EngineState::Paused) => Some("⏸️  Paused".to_string()),
        PlayerEvent::StateChanged(EngineState::Stopped) => Some("⏹️  Stopped".to_string()),
        PlayerEvent::StateChanged(_) => None,
        PlayerEvent::TrackChanged(Some(track)) => Some(format!("🎶 {}", track.display_title())),
        PlayerEvent::TrackChanged(None) => None,
        PlayerEvent::Error(message) => Some(format!("❌ {}", message)),
    }
}
