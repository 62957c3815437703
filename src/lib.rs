//! Client library for the Tier3 IaaS REST API.
//!
//! The crate exposes an asynchronous API client with session-cookie
//! authentication and server-declared pagination, single-assignment
//! response futures for results computed on background tasks, and a poller
//! for long-running operations reported through the deployment-status
//! resource.

pub mod account;
pub mod api;
pub mod config;
pub mod credentials;
pub mod deployment;
pub mod test_support;
pub mod timestamp;
pub mod util;

pub use account::check_context;
pub use api::{ApiClient, ApiClientBuilder, ApiError, ResponseBody, ResponseFuture, ResponseKind};
pub use config::{ConfigError, Tier3Config};
pub use credentials::{Credentials, CredentialsError};
pub use deployment::{DeploymentPoller, DeploymentStatus, OperationKind, StatusSource};
pub use timestamp::{TimestampError, parse_timestamp};
