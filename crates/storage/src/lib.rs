#![forbid(unsafe_code)]

pub mod legacy;
pub mod repository;
pub mod snapshot;
