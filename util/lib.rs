/*!
This crate contains small utilities shared by the other tripfit crates.
*/

pub mod finite;
pub mod progress_counter;
