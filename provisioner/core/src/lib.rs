// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! susi-dev core
//!
//! Component registry, node table and the adapters around the external tools
//! (easy-rsa, acbuild, rkt, ssh/scp, systemd) that the `susi-dev` CLI drives.
//!
//! # Architecture
//!
//! - **Layer:** Core System
//! - **Purpose:** Domain types, infrastructure adapters and use-case services

pub mod domain;
pub mod application;
pub mod infrastructure;

pub use domain::*;
