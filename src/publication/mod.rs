//! Publication tracking: one row per attempt to push a job summary to the
//! wiki, with retry from the `failed` state.

pub mod service;
pub mod status;

pub use service::{PublicationService, PublishOptions};
pub use status::PublicationStatus;
