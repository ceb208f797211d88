/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Ordering, lifetime and per-frame rendering of composition layers.

mod passthrough;
mod projection;

pub use passthrough::PassthroughLayer;
pub use passthrough::FB_PASSTHROUGH;
pub use passthrough::FB_TRIANGLE_MESH;
pub use projection::ProjectionLayer;

use xrdriver_api::AcquiredImage;
use xrdriver_api::CompositionLayer;
use xrdriver_api::Error;
use xrdriver_api::Layer;
use xrdriver_api::LayerFrame;
use xrdriver_api::LocatedViews;
use xrdriver_api::RenderOptions;
use xrdriver_api::Runtime;
use xrdriver_api::SessionHandle;
use xrdriver_api::SpaceHandle;
use xrdriver_api::SwapchainAllocator;
use xrdriver_api::Time;
use xrdriver_api::XrDuration;

use log::debug;
use log::error;
use log::warn;

struct Slot {
    layer: Box<dyn Layer>,
    live: bool,
}

/// Everything the layers need to render one frame.
pub struct FrameTarget<'a> {
    pub runtime: &'a dyn Runtime,
    pub session: SessionHandle,
    pub space: SpaceHandle,
    pub display_time: Time,
    pub views: &'a LocatedViews,
    pub options: &'a RenderOptions,
    pub timeout: XrDuration,
}

#[derive(Default)]
pub struct LayerManager {
    slots: Vec<Slot>,
}

impl LayerManager {
    pub fn new() -> Self {
        LayerManager::default()
    }

    pub fn add(&mut self, layer: Box<dyn Layer>) {
        self.slots.push(Slot { layer, live: false });
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Names of the layers in submission order.
    pub fn names(&self) -> Vec<String> {
        self.slots.iter().map(|s| s.layer.name().to_owned()).collect()
    }

    pub fn initialize(&mut self, extensions: &mut Vec<String>) {
        for slot in self.slots.iter_mut() {
            if let Err(e) = slot.layer.initialize(extensions) {
                error!("Layer {} failed to initialize: {}", slot.layer.name(), e);
            }
        }
    }

    /// Fixes the submission order: ascending priority, ties in insertion
    /// order.
    pub fn commit(&mut self) {
        self.slots.sort_by_key(|s| s.layer.priority());
    }

    /// Creates every layer's resources. A layer that fails is torn down
    /// and left out of rendering until the next session.
    pub fn create(&mut self, allocator: &mut dyn SwapchainAllocator) {
        for slot in self.slots.iter_mut() {
            match slot.layer.create(allocator) {
                Ok(()) => slot.live = true,
                Err(e) => {
                    error!("Layer {} failed to create: {}", slot.layer.name(), e);
                    slot.layer.destroy(allocator);
                    slot.live = false;
                }
            }
        }
    }

    pub fn destroy(&mut self, allocator: &mut dyn SwapchainAllocator) {
        for slot in self.slots.iter_mut().rev() {
            if slot.live {
                slot.layer.destroy(allocator);
                slot.live = false;
            }
        }
    }

    pub fn begin_frame(&mut self, space: SpaceHandle, display_time: Time) {
        for slot in self.slots.iter_mut().filter(|s| s.live) {
            slot.layer.on_begin_frame(space, display_time);
        }
    }

    pub fn end_frame(&mut self) {
        for slot in self.slots.iter_mut().filter(|s| s.live) {
            slot.layer.on_end_frame();
        }
    }

    /// Renders the enabled layers in order, appending their composition
    /// layers to `out`.
    ///
    /// A layer that fails to render is skipped. Failing to acquire a
    /// swapchain image stops rendering and is returned; whatever was
    /// rendered before stays in `out`.
    pub fn render(
        &mut self,
        target: &FrameTarget,
        out: &mut Vec<CompositionLayer>,
    ) -> Result<(), Error> {
        for slot in self.slots.iter_mut() {
            if !slot.live || !slot.layer.is_enabled() {
                continue;
            }
            let layer = &mut slot.layer;

            let mut images = vec![];
            if layer.occupies_swapchain() {
                for swapchain in layer.swapchains() {
                    match swapchain.acquire(target.runtime, target.timeout) {
                        Ok(image) => images.push(image),
                        Err(e) => {
                            release(images);
                            return Err(e);
                        }
                    }
                }
            }

            let frame = LayerFrame {
                runtime: target.runtime,
                session: target.session,
                space: target.space,
                display_time: target.display_time,
                views: target.views,
                options: target.options,
                images: &images,
            };
            match layer.render(&frame) {
                Ok(Some(composition)) => out.push(composition),
                Ok(None) => debug!("Layer {} has nothing to show", layer.name()),
                Err(e) => error!("Layer {} failed to render: {}", layer.name(), e),
            }

            release(images);
        }
        Ok(())
    }
}

/// Releases images in reverse acquisition order.
fn release(images: Vec<AcquiredImage>) {
    for image in images.into_iter().rev() {
        if let Err(e) = image.release() {
            warn!("{}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use xrdriver_api::SwapchainInfo;

    struct Named(&'static str, i32);

    impl Layer for Named {
        fn name(&self) -> &str {
            self.0
        }

        fn priority(&self) -> i32 {
            self.1
        }

        fn create(&mut self, _allocator: &mut dyn SwapchainAllocator) -> Result<(), Error> {
            Ok(())
        }

        fn destroy(&mut self, _allocator: &mut dyn SwapchainAllocator) {}

        fn swapchains(&self) -> &[SwapchainInfo] {
            &[]
        }

        fn render(&mut self, _frame: &LayerFrame) -> Result<Option<CompositionLayer>, Error> {
            Ok(None)
        }
    }

    #[test]
    fn commit_sorts_by_priority_stably() {
        let mut layers = LayerManager::new();
        layers.add(Box::new(Named("projection", 10)));
        layers.add(Box::new(Named("passthrough", -10)));
        layers.add(Box::new(Named("overlay", 10)));
        layers.add(Box::new(Named("hud", 20)));
        layers.commit();
        assert_eq!(
            layers.names(),
            vec!["passthrough", "projection", "overlay", "hud"]
        );
    }
}
