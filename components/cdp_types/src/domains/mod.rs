// CDP Domain type definitions
// Contains the event payloads consumed by the network inspector

pub mod network;
pub mod page;
