// Athena HTTP API: workflow start, synchronous chat, metrics and ego state

pub mod client;
pub mod errors;
pub mod types;

#[cfg(test)]
mod test;

pub use client::AthenaClient;
pub use errors::ApiError;
pub use types::{
    EgoStateResponse, InteractionResponse, MetricsResponse, ResetEgoRequest, ResetEgoResponse,
    StartRequest, WorkflowTicket,
};
