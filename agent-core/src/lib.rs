//! Small primitives shared between the gateway library and its binary.
//!
//! Kept deliberately tiny: this is the one crate whose types are touched by
//! both `gateway-core` and `gateway-app` without either depending on the
//! other.

pub mod readiness;
