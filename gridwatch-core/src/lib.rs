// src/lib.rs

pub mod auth;
pub mod config;
pub mod http;
pub mod platforms;
pub mod repositories;
pub mod services;
pub mod tasks;
pub mod utils;

pub use gridwatch_common::error::Error;
pub use http::{DefaultHttpClient, HttpClient};
