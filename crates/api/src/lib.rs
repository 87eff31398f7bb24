#![forbid(unsafe_code)]

pub mod client;
pub mod config;
pub mod http;

pub use client::{Api, ApiError, ExamApi, GenerationApi, InMemoryExamApi, ResultApi};
pub use config::{ApiConfig, ConfigError, Environment};
pub use http::{HttpExamApi, HttpInitError};
