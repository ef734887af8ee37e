//! GitHub access.
//!
//! The pipeline only sees the [`DeliverySource`] trait; [`GithubClient`]
//! is the REST implementation used at runtime.

pub mod client;
#[cfg(test)]
pub mod fake;
pub mod source;

pub use client::{resolve_token, ClientOptions, GithubClient};
pub use source::DeliverySource;
