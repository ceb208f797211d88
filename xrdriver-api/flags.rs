/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use bitflags::bitflags;

bitflags! {
    #[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
    pub struct ViewStateFlags: u64 {
        const ORIENTATION_VALID = 0x1;
        const POSITION_VALID = 0x2;
        const ORIENTATION_TRACKED = 0x4;
        const POSITION_TRACKED = 0x8;
    }
}

bitflags! {
    #[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
    pub struct SpaceLocationFlags: u64 {
        const ORIENTATION_VALID = 0x1;
        const POSITION_VALID = 0x2;
        const ORIENTATION_TRACKED = 0x4;
        const POSITION_TRACKED = 0x8;
    }
}

bitflags! {
    #[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
    pub struct SwapchainUsageFlags: u64 {
        const COLOR_ATTACHMENT = 0x1;
        const DEPTH_STENCIL_ATTACHMENT = 0x2;
        const UNORDERED_ACCESS = 0x4;
        const TRANSFER_SRC = 0x8;
        const TRANSFER_DST = 0x10;
        const SAMPLED = 0x20;
        const MUTABLE_FORMAT = 0x40;
    }
}

bitflags! {
    #[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
    pub struct CompositionLayerFlags: u64 {
        const CORRECT_CHROMATIC_ABERRATION = 0x1;
        const BLEND_TEXTURE_SOURCE_ALPHA = 0x2;
        const UNPREMULTIPLIED_ALPHA = 0x4;
    }
}
