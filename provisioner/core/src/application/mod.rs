// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod images;
pub mod lifecycle;
pub mod provisioning;

pub use images::ImageService;
pub use lifecycle::{LifecycleError, LifecycleService};
pub use provisioning::{AddOptions, AddReport, ProvisioningError, ProvisioningService};
