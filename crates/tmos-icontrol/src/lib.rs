// Copyright (c) 2025 SOLARE S.R.O.
//
// This file is part of TMOS Rollout.
//
// Licensed under the Creative Commons Attribution-NonCommercial-NoDerivatives 4.0 International
// (CC BY-NC-ND 4.0). You may use and share this file for non-commercial purposes only and you may not
// create derivatives. See <https://creativecommons.org/licenses/by-nc-nd/4.0/>.
//
// This software is provided "AS IS", without warranty of any kind.
//
// For commercial licensing, please contact: info@solare.cz

//! iControl REST access for BIG-IP appliances
//!
//! [`DeviceClient`] is the narrow contract the rollout core is written against:
//! resource load/exists, file upload/download, one-shot commands and the
//! asynchronous task primitives. [`IControlClient`] implements it over reqwest.

pub mod client;
pub mod device;
pub mod errors;
#[cfg(feature = "mock")]
pub mod mock;
pub mod transfer;
pub mod types;

pub use client::{IControlClient, IControlConnector};
pub use device::{DeviceClient, DeviceConnector};
pub use errors::{IControlError, IControlResult};
pub use types::{AuthMode, ClientSettings, Credentials, RestObject, TaskHandle, TaskState};
