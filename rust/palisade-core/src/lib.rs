#[macro_use]
extern crate tracing as extern_tracing;

pub mod authority;
pub mod context;
pub mod data;
pub mod engine;
pub mod path;
pub mod scrub;
pub mod store;
pub mod strategy;
pub mod update;

mod delegate;

pub mod error;
pub mod tracing;

#[cfg(any(test, feature = "helpers"))]
pub mod helpers;
