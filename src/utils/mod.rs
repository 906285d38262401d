//! Utilities shared by the binary and the library.

pub mod logger;
