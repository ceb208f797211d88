/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use xrdriver_api::check;
use xrdriver_api::CompositionLayer;
use xrdriver_api::CompositionLayerFlags;
use xrdriver_api::Error;
use xrdriver_api::Layer;
use xrdriver_api::LayerFrame;
use xrdriver_api::LayerHandle;
use xrdriver_api::SwapchainAllocator;

use log::warn;

pub const FB_PASSTHROUGH: &str = "XR_FB_passthrough";
pub const FB_TRIANGLE_MESH: &str = "XR_FB_triangle_mesh";

/// Shows the camera feed behind everything else. It has no swapchain of
/// its own, so it is composited first.
pub struct PassthroughLayer {
    handle: LayerHandle,
    enabled: bool,
}

impl Default for PassthroughLayer {
    fn default() -> Self {
        PassthroughLayer {
            handle: LayerHandle::NULL,
            enabled: true,
        }
    }
}

impl PassthroughLayer {
    pub fn new() -> Self {
        PassthroughLayer::default()
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }
}

impl Layer for PassthroughLayer {
    fn name(&self) -> &str {
        "passthrough"
    }

    fn priority(&self) -> i32 {
        -10
    }

    fn occupies_swapchain(&self) -> bool {
        false
    }

    fn is_enabled(&self) -> bool {
        self.enabled && !self.handle.is_null()
    }

    fn initialize(&mut self, extensions: &mut Vec<String>) -> Result<(), Error> {
        for ext in [FB_PASSTHROUGH, FB_TRIANGLE_MESH].iter() {
            if !extensions.iter().any(|e| e == ext) {
                extensions.push((*ext).to_owned());
            }
        }
        Ok(())
    }

    fn create(&mut self, allocator: &mut dyn SwapchainAllocator) -> Result<(), Error> {
        self.handle = check(
            allocator
                .runtime()
                .create_passthrough_layer(allocator.session()),
            "xrCreatePassthroughLayerFB",
        )?;
        Ok(())
    }

    fn destroy(&mut self, allocator: &mut dyn SwapchainAllocator) {
        let handle = self.handle.take();
        if handle.is_null() {
            return;
        }
        if let Err(result) = allocator.runtime().destroy_passthrough_layer(handle) {
            warn!("Failed to destroy passthrough layer: {}", result);
        }
    }

    fn render(&mut self, _frame: &LayerFrame) -> Result<Option<CompositionLayer>, Error> {
        Ok(Some(CompositionLayer::Passthrough {
            flags: CompositionLayerFlags::BLEND_TEXTURE_SOURCE_ALPHA,
            layer: self.handle,
        }))
    }
}
