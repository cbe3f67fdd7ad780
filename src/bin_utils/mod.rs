//! Defines methods shared by the evogym binaries

/// Methods for reading arguments
pub mod args;
/// Methods for building solvers and writing policies
pub mod loaders;
/// Structs to capture model parameters
pub mod model_params;
/// Helper methods for evaluating a trained policy
pub mod tester;
