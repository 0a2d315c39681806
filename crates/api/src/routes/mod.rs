//! Route handlers

pub mod alerts;
pub mod contact;
pub mod observations;
pub mod status;
