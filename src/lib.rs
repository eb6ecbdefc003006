pub mod api;
pub mod board;
pub mod config;
pub mod error;
pub mod models;
pub mod projections;
pub mod web;

#[cfg(test)]
mod test_support;
