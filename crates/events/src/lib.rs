//! Event abstractions: the `Event` contract and shard partitioning.

pub mod event;
pub mod shards;

pub use event::Event;
pub use shards::EventShards;
