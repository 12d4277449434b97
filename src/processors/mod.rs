//! File and source tree processors

pub mod file;
pub mod service;
