pub mod camera;
pub mod classifier;
pub mod config;
pub mod controller;
pub mod coordinator;
pub mod error;
pub mod model_download;
pub mod prompts;
pub mod result_image;
pub mod session;
pub mod stream;
pub mod types;
pub mod ui;

pub use controller::Controller;
pub use session::{Lifecycle, SessionState};
