//! Generation workflow: session state and the controller that drives it.
pub mod controller;
pub mod types;

pub use controller::WorkflowController;
pub use types::{SessionSnapshot, StickerResult, VariantBatch, WorkflowState};
