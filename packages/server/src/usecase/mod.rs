//! Usecase layer: validated room mutations, clock-sync, and payload
//! generation. Depends only on domain ports.

mod clock_sync;
mod coordinator;
mod error;
mod sync_payload;

pub use clock_sync::ClockSyncService;
pub use coordinator::{CreateRoomRequest, RoomCoordinator, UpsertParticipant};
pub use error::CoordinatorError;
pub use sync_payload::SyncPayloadFactory;
