/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! This crate drives one XR session against a runtime: bring-up and
//! teardown, view and swapchain negotiation, input actions and the
//! per-frame loop. Runtimes plug in through `xrdriver_api::Runtime`.

#[cfg(feature = "headless")]
pub mod headless;

#[cfg(feature = "openxr-api")]
pub mod openxr;

pub mod layers;
pub mod profiles;

mod config;
mod driver;
mod enumerate;
mod input;
mod negotiate;
mod plugins;
mod resources;
mod state;

pub use config::DriverConfig;
pub use config::EXT_HAND_TRACKING;
pub use config::EXT_PERFORMANCE_SETTINGS;

pub use driver::DriverHandles;
pub use driver::EventPump;
pub use driver::SessionDriver;
pub use driver::StartMode;

pub use enumerate::supported_extensions;
pub use enumerate::view_infos;

pub use input::ActionBinder;
pub use input::HandState;
pub use input::InputState;
pub use input::InputValue;
pub use input::InteractionProfile;

pub use negotiate::negotiate;

pub use plugins::PluginSet;

pub use resources::swapchain_create_info;
pub use resources::ReferenceSpaces;

pub use state::AppState;
pub use state::CancellationToken;
pub use state::SessionMonitor;
pub use state::StateChange;
pub use state::StateSnapshot;
pub use state::StopHandle;
