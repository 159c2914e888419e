//! Domain layer: entities, value objects, and the ports the usecase layer
//! depends on (dependency inversion — infrastructure implements these).

pub mod bus;
pub mod entity;
pub mod error;
pub mod store;
pub mod value_object;

pub use bus::{BroadcastBus, PusherChannel};
pub use entity::{
    Capabilities, ClockSyncResponse, MetronomeStatus, Participant, RoomDetails, RoomState,
    SyncPayload,
};
pub use error::{PushError, StoreError};
pub use store::RoomStateStore;
pub use value_object::{ClientId, ConnectionId, RoomId, RoomIdFactory, Tempo, TimeSignature, Timestamp};
