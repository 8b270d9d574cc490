//! Domain core for the MediStream shift coordination backend.
//!
//! Converts classified chat messages into task/alert mutations, re-derives an
//! operational risk score after every mutation, and manages the
//! single-active-shift rotation ring. Transport and persistence technology
//! live behind narrow boundaries (`Store`, `Classifier`, `SummaryGenerator`).

pub mod classify;
pub mod error;
pub mod lifecycle;
pub mod locks;
pub mod model;
pub mod mutation;
pub mod risk;
pub mod store;
pub mod summary;
pub mod transition;
