//! Stateless Core Service (SPEC_FULL §4.9): the transport-agnostic
//! contract between the Platform Facade and the analysis/discussion/
//! re-evaluation engines. [`service`] is pure orchestration (text in,
//! structured findings out); [`routes`] is the HTTP transport the
//! reference implementation happens to put in front of it.
//!
//! Grounded on `original_source/core/api.py`, `core/service.py`,
//! `core/domain.py`, and `contracts/v1/schemas.py`.

pub mod contracts;
pub mod routes;
pub mod service;

pub use routes::{router, CoreState};

#[cfg(test)]
mod tests;
