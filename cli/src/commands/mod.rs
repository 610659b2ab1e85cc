// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Command implementations for the susi-dev CLI

pub mod config;
pub mod container;
pub mod lifecycle;
pub mod node;
pub mod pki;
pub mod setup;
pub mod source;

pub use self::config::ConfigCommand;
pub use self::container::ContainerCommand;
pub use self::node::{AddArgs, CreateArgs, DeployArgs};
pub use self::pki::PkiCommand;
pub use self::source::SourceCommand;
