//! Engine infrastructure: the event hub and background services.

pub mod event_hub;
pub mod events;
pub mod sweeper;

pub use event_hub::EventHub;
pub use events::EngineEvent;
pub use sweeper::Sweeper;
