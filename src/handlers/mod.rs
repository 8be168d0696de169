//! HTTP handlers for the instance control plane and the embedded-dashboard proxy.

pub mod embedded;
pub mod instances;
pub use embedded::*;
pub use instances::*;
