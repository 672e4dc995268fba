// Domain services

pub mod verifier;

pub use verifier::*;
