//! OCI REST access: request signing, the HTTP client, response models and
//! compartment traversal.

pub mod client;
pub mod models;
pub mod signer;
pub mod tree;

pub use client::{OciClient, Service};
pub use tree::{CompartmentNode, CompartmentSource, CompartmentWalker};
