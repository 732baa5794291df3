pub mod artifact;
pub mod config;
pub mod constraints;
pub mod edit;
pub mod error;
pub mod session;

pub use artifact::*;
pub use config::*;
pub use constraints::*;
pub use edit::{EditClient, EditProgress, EditRequest, EditResponse, EditTransport, ZoomPoint};
pub use error::{CaptureError, ConfigError, EditError, TransportError};
pub use session::*;
