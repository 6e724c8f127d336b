//! Route handlers for the built-in compute and long-poll endpoints.

pub mod compute;
pub mod events;

pub use compute::{compute_responder, ComputeHandler, EventPublisher};
pub use events::{event_list_responder, EventPollHandler};
