pub mod booking;
pub mod conversation;
pub mod event;
pub mod settings;

pub use booking::{BookingEntities, NormalizedBooking};
pub use conversation::{
    ConversationId, ConversationKey, ConversationState, FlowStage, FlowState, Priority, PropertyId,
    RejectBehavior, SlotField,
};
pub use event::{Author, InboundEvent, Language, Reply, SourceChannel};
pub use settings::PropertySettings;
