//! Small self-contained building blocks with no fuzzing semantics.

pub mod dyn_array;

pub use dyn_array::DynArray;
