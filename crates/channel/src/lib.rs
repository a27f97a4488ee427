pub mod client;
pub mod events;

pub use client::{PlatformClient, PlatformClientConfig};
pub use events::{normalize, NormalizeError, WebhookPayload};
