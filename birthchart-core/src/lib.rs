//! Core library for the `birthchart` CLI.
//!
//! This crate defines:
//! - The input state of a birth chart form and its derived workflow status
//! - Location resolution (place selection, timezone lookup, stale-result suppression)
//! - Request orchestration against the remote birth chart service
//! - Configuration & credentials handling
//!
//! It is used by `birthchart-cli`, but the workflow does not depend on any
//! particular front end.

pub mod autocomplete;
pub mod config;
pub mod error;
pub mod model;
pub mod orchestrator;
pub mod provider;
pub mod resolver;
pub mod service;
pub mod session;
pub mod state;

pub use autocomplete::{ChannelAutocomplete, PlaceAutocomplete, PlaceSubscription};
pub use config::{Config, ProviderConfig};
pub use error::{ResolutionError, TransportError, WorkflowError};
pub use model::{BirthMoment, ChartContract, ChartQuery, Coordinates, PlaceSelection, TimezoneOffset};
pub use orchestrator::RequestOrchestrator;
pub use provider::{PlaceSearch, ProviderId, TimezoneLookup};
pub use resolver::LocationResolver;
pub use service::{ChartService, HttpChartService};
pub use session::Session;
pub use state::{FormState, RequestState, TimezoneSource};
