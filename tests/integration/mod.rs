//! Property and scenario tests for the edit pipeline.

mod properties;
mod scenarios;
