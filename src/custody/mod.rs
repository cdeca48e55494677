//! Integration with the external MPC custody service: REST client, webhook
//! authentication, chain/token directories, and amount conversion.

pub mod chains;
pub mod client;
pub mod convert;
pub mod error;
pub mod types;
pub mod webhook;

pub use client::{CustodyApi, CustodyClient};
pub use error::{CustodyError, CustodyResult};
