//! Evogym
//!
//! Evogym is a library and an executable to train feed-forward policies on gym-style
//! environments using evolutionary strategies.
#![warn(missing_docs, unused)]

#[macro_use]
extern crate clap;

/// Tools for binaries
pub mod bin_utils;
/// Example environments
pub mod example;
