//! Unit tests for the API client building blocks.

mod response;

use crate::credentials::Credentials;

fn credentials() -> Credentials {
    Credentials::new("key", "secret")
}
