pub mod collab;
pub mod config;
pub mod dialog;
pub mod domain;
pub mod errors;
pub mod escalation;
pub mod intent;
pub mod parsers;
pub mod router;
pub mod staff;

pub use collab::{
    CollabError, ConversationPlatform, ConversationStatus, ConversationStore, FaqAnswer,
    FaqSearch, ReplySender, SettingsProvider, SlotExtractor, SmalltalkResponder, StaffNotifier,
    StoreError,
};
pub use config::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};
pub use dialog::{CompletedBooking, DialogEngine, DialogOutcome, ServiceCatalog, ServiceTemplate};
pub use domain::{
    Author, BookingEntities, ConversationId, ConversationKey, ConversationState, FlowStage,
    FlowState, InboundEvent, Language, NormalizedBooking, Priority, PropertyId, PropertySettings,
    RejectBehavior, Reply, SlotField, SourceChannel,
};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use escalation::{derive_priority, is_emergency, EscalationEngine, EscalationSignal};
pub use intent::{decide, wants_human, Decision, Intent};
pub use router::{Collaborators, RouteOutcome, Router};
pub use staff::{parse_staff_command, status_dump, StaffCommand};
