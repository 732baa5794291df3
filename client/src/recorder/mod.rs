//! Screen recording: capture, encode, preview, and hand-off for editing

pub mod media_recorder;
pub mod media_streams;
pub mod state;
pub mod ui;
pub mod utils;

// Re-export main entry points
pub use state::RecorderState;
pub use ui::init_recorder_panel;
