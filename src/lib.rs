//! Sample web application backed by two databases.
//!
//! Data access units are routed to a database by the module they are
//! declared in: `puml::web` units go to the web database and
//! `puml::service::<name>::mapper` units go to the service database. Each
//! database has its own pool and its own transaction manager.

pub mod api;
pub mod app;
pub mod config;
pub mod db;
pub mod dto;
pub mod service;
pub mod web;

#[cfg(test)]
mod config_test;
