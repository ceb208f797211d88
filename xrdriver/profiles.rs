/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Well-known interaction profile and user paths.

pub const KHR_SIMPLE_CONTROLLER: &str = "/interaction_profiles/khr/simple_controller";
pub const OCULUS_TOUCH_CONTROLLER: &str = "/interaction_profiles/oculus/touch_controller";
pub const VALVE_INDEX_CONTROLLER: &str = "/interaction_profiles/valve/index_controller";
pub const MICROSOFT_MOTION_CONTROLLER: &str = "/interaction_profiles/microsoft/motion_controller";
pub const HTC_VIVE_CONTROLLER: &str = "/interaction_profiles/htc/vive_controller";
pub const EXT_HAND_INTERACTION: &str = "/interaction_profiles/ext/hand_interaction_ext";

pub const LEFT_HAND: &str = "/user/hand/left";
pub const RIGHT_HAND: &str = "/user/hand/right";
pub const HEAD: &str = "/user/head";

/// The profiles most runtimes can emulate, in order of how widely they
/// are supported.
pub const CONTROLLER_PROFILES: [&str; 5] = [
    KHR_SIMPLE_CONTROLLER,
    OCULUS_TOUCH_CONTROLLER,
    VALVE_INDEX_CONTROLLER,
    MICROSOFT_MOTION_CONTROLLER,
    HTC_VIVE_CONTROLLER,
];
