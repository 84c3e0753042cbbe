use reverie::ReverieSystem;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub system: Arc<ReverieSystem>,
    /// Voice used when a synthesis request names none
    pub default_speaker: String,
}
