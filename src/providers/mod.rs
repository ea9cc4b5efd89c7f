//! Cloud provider implementations of the audit capabilities.

pub mod aws;
