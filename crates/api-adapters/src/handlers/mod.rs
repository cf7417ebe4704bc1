//! Route handlers, grouped by the surface they serve.
//!
//! Reads answer with JSON; successful writes answer with a short text body
//! the dashboard pages show verbatim.

pub mod admin;
pub mod bookings;
pub mod buyer;
pub mod messages;
pub mod ops;
pub mod pages;
pub mod properties;
pub mod seller;

use serde::Serialize;

/// Body of the admin counter endpoints.
#[derive(Debug, Serialize)]
pub struct Count {
    pub count: i64,
}
