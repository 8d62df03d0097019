//! Core pipeline: parsing, resolution, normalization, pose synthesis.

pub mod config;
pub mod error;
pub mod lexer;
pub mod normalizer;
pub mod orientation;
pub mod parser;
pub mod pipeline;
pub mod registry;
pub mod resolver;
pub mod scanner;
pub mod synthesizer;
pub mod types;
