//! Rivista is a small social blogging service: authors publish short
//! posts, optionally into topical groups, and readers comment and follow
//! the authors they like.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
pub mod presentation;
