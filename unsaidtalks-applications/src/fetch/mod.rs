//! Fetch Runtime
//!
//! Controllers that turn async producers into observable `{data, error,
//! loading}` state: one-shot resources, keyed resources, polling and
//! mutations. All of them stop touching state once disposed.

mod cell;
pub mod mutation;
pub mod polling;
pub mod resource;
pub mod types;

pub use mutation::{Mutation, MutationState};
pub use polling::{PollOptions, PollingResource};
pub use resource::{KeyedResource, ResourceFetch};
pub use types::*;
