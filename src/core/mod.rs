//! Core translation engine module

pub mod client;
pub mod config;
pub mod controller;
pub mod errors;
pub mod languages;
pub mod models;
