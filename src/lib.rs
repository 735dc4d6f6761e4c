pub mod api;
pub mod config;
pub mod db;
pub mod logging;
pub mod serde_utils;
pub mod services;

#[cfg(test)]
mod serde_utils_test;
