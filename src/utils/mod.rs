//! Reporting helpers shared by the CLI entry points

pub mod report;
