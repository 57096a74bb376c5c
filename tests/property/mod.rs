// Copyright (c) 2025 - Cowboy AI, Inc.
//! Property-Based Tests Module
//!
//! - `closure`: reach sets under admin overrides and nested membership
//! - `reconcile`: applying a plan converges, and the catalog never repeats a name

mod closure;
mod reconcile;
