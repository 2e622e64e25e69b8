// src/lib.rs
//! Polling backend: timed polls with one vote per identity per poll.
//!
//! The vote path lives in [`ledger`]; [`poll`] derives open/closed state from
//! the deadline and [`validation`] gates what may be stored. [`store`] is the
//! transactional persistence seam with a Postgres and an in-memory backend.

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod ledger;
pub mod models;
pub mod poll;
pub mod routes;
pub mod services;
pub mod store;
pub mod validation;
