//! The slot-filling conversation engine for service flows.

pub mod clarify;
pub mod engine;
pub mod templates;

pub use clarify::{clarify_prompt, parse_daypart_reply};
pub use engine::{CompletedBooking, DialogEngine, DialogOutcome};
pub use templates::{ServiceCatalog, ServiceTemplate};
