//! Library exports for the jewellery catalogue service
//!
//! This module exposes internal components for testing and for the binary.

pub mod auth;
pub mod config;
pub mod database;
pub mod error;
pub mod filter;
pub mod handler;
pub mod middleware;
pub mod model;
pub mod repository;
pub mod route;
pub mod upload;
