//! UnsaidTalks Applications - session, authorization and data fetching
//!
//! The client-side core of the mentorship dashboard:
//!
//! - Durable session storage and the session state machine
//! - Role-based authorization gates for protected views
//! - Fetch, polling and mutation controllers over a remote data service
//!
//! ## Architecture
//!
//! - **Core** (unsaidtalks-core): errors, config, logging and trait seams
//! - **Applications** (this crate): controllers consumed by views
//! - **Presentation** (unsaidtalks-cli): command line front end

pub mod auth;
pub mod fetch;
pub mod service;
pub mod session;

pub use auth::{AuthorizationGate, GateDecision, Protected, Role, Session, SessionInput, SessionPatch};
pub use fetch::{
    producer, FetchOptions, FetchPhase, FetchState, KeyedResource, Mutation, MutationState,
    PollOptions, PollingResource, Producer, ResourceFetch,
};
pub use service::{json_producer, value_producer, HttpDataService};
pub use session::{FileSlotStore, MemorySlotStore, SessionController, SessionState, SessionStore};

pub use unsaidtalks_core::{DashboardError, DashboardResult};
