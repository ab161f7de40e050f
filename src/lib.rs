// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! MineComply API server.
//!
//! Bridges Supabase-issued access tokens into the compliance backend: tokens
//! are verified locally when possible and checked against Supabase Auth
//! otherwise.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `auth` - Authentication and authorization (Supabase JWT + fallback)
//! - `config` - Environment configuration
//! - `store` - In-memory user records

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod state;
pub mod store;
