//! Library defining the policy networks trained by evogym
#![warn(missing_docs, unused)]

#[macro_use]
extern crate serde_derive;

/// Vector helpers
pub mod intrinsics;
/// Defines neural networks
pub mod nn;

use self::intrinsics::inplace_sum;

// We make proxy versions of standard updates since the WeightUpdater methods of
// layers and networks all boil down to the same vector operations.
// This takes in a noise function which generates new values into a vector.
/// Method to update a vector in place
fn update_vec<F>(x: &mut [f32], f: &mut F)
where
    F: FnMut() -> f32,
{
    for e in x.iter_mut() {
        *e = f();
    }
}

/// Method to copy from one vector to another
fn copy_vec(from: &[f32], other: &mut [f32]) {
    assert_eq!(from.len(), other.len());
    other.copy_from_slice(from);
}

/// Method to add two vectors in place
fn add_vec(into: &mut [f32], other: &[f32]) {
    inplace_sum(into, other);
}
