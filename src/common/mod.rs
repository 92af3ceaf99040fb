//! DNS access and domain handling shared by the SPF inspector.

pub mod dns;
pub mod domain;
