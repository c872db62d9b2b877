//! The built-in check catalog
//!
//! One module per concern, each exposing a `register` function that wires
//! its checks into the registry. Checks that need cross-resource answers
//! receive their sub-index as an explicit argument and capture it at
//! registration time; their result depends only on that snapshot.

pub mod apps;
pub mod container;
pub mod cronjob;
pub mod deployment;
pub mod disruptionbudget;
pub mod hpa;
pub mod ingress;
pub mod meta;
pub mod networkpolicy;
pub mod probes;
pub mod security;
pub mod service;
pub mod stable;
pub mod topology;
