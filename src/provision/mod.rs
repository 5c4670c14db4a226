//! Applying a stack definition to an AWS account.

pub mod asset;
pub mod cloudformation;
pub mod table;
