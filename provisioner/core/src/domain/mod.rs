// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Domain
//!
//! Pure types and the ports implemented by the infrastructure layer.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Components, nodes, key stores, images and the tool ports

pub mod component;
pub mod config;
pub mod container;
pub mod deploy;
pub mod node;
pub mod pki;
pub mod shell;
pub mod source;
pub mod workspace;
