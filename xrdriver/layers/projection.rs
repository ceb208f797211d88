/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use xrdriver_api::util::fov_to_projection_matrix;
use xrdriver_api::util::pose_to_transform;
use xrdriver_api::util::ClipPlanes;
use xrdriver_api::AcquiredImage;
use xrdriver_api::Camera;
use xrdriver_api::CompositionLayer;
use xrdriver_api::CompositionLayerFlags;
use xrdriver_api::Error;
use xrdriver_api::Layer;
use xrdriver_api::LayerFrame;
use xrdriver_api::ProjectionView;
use xrdriver_api::RenderMode;
use xrdriver_api::RenderTarget;
use xrdriver_api::Renderer;
use xrdriver_api::SubImage;
use xrdriver_api::SwapchainAllocator;
use xrdriver_api::SwapchainInfo;
use xrdriver_api::SwapchainUsage;

use euclid::Point2D;
use euclid::Rect;

pub const PROJECTION_PRIORITY: i32 = 10;

/// The main scene layer: one projected view per eye, drawn by the host's
/// `Renderer`.
pub struct ProjectionLayer {
    renderer: Box<dyn Renderer>,
    clip_planes: ClipPlanes,
    flags: CompositionLayerFlags,
    render_mode: RenderMode,
    /// Color swapchains first, then the depth swapchains if any.
    swapchains: Vec<SwapchainInfo>,
    color_count: usize,
}

impl ProjectionLayer {
    pub fn new(renderer: Box<dyn Renderer>) -> Self {
        ProjectionLayer {
            renderer,
            clip_planes: ClipPlanes::default(),
            flags: CompositionLayerFlags::CORRECT_CHROMATIC_ABERRATION
                | CompositionLayerFlags::BLEND_TEXTURE_SOURCE_ALPHA,
            render_mode: RenderMode::Stereo,
            swapchains: vec![],
            color_count: 0,
        }
    }

    pub fn with_flags(mut self, flags: CompositionLayerFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn set_clip_planes(&mut self, near: f32, far: f32) {
        self.clip_planes.update(near, far);
    }

    fn has_depth(&self) -> bool {
        self.swapchains.len() > self.color_count
    }

    /// The swapchain slot holding view `i`.
    fn slot(&self, i: usize) -> usize {
        match self.render_mode {
            RenderMode::SingleEye => i,
            RenderMode::Stereo | RenderMode::MultiView => 0,
        }
    }

    fn sub_image(&self, image: &AcquiredImage, info: &SwapchainInfo, i: usize) -> SubImage {
        let size = info.view_size;
        let (x, array_index) = match self.render_mode {
            RenderMode::SingleEye => (0, 0),
            RenderMode::Stereo => (size.width * i as i32, 0),
            RenderMode::MultiView => (0, i as u32),
        };
        SubImage {
            swapchain: image.swapchain(),
            image_rect: Rect::new(Point2D::new(x, 0), size),
            image_array_index: array_index,
        }
    }
}

impl Layer for ProjectionLayer {
    fn name(&self) -> &str {
        "projection"
    }

    fn priority(&self) -> i32 {
        PROJECTION_PRIORITY
    }

    fn create(&mut self, allocator: &mut dyn SwapchainAllocator) -> Result<(), Error> {
        let options = allocator.render_options().clone();
        self.render_mode = options.render_mode;
        let count = match options.render_mode {
            RenderMode::SingleEye => options.view_count.max(1) as usize,
            RenderMode::Stereo | RenderMode::MultiView => 1,
        };
        for _ in 0..count {
            let info = allocator.create_swapchain(SwapchainUsage::Color)?;
            self.swapchains.push(info);
            self.color_count += 1;
        }
        if options.depth_format.is_some() {
            for _ in 0..count {
                let info = allocator.create_swapchain(SwapchainUsage::Depth)?;
                self.swapchains.push(info);
            }
        }
        Ok(())
    }

    fn destroy(&mut self, allocator: &mut dyn SwapchainAllocator) {
        for mut info in self.swapchains.drain(..).rev() {
            allocator.destroy_swapchain(&mut info);
        }
        self.color_count = 0;
    }

    fn swapchains(&self) -> &[SwapchainInfo] {
        &self.swapchains
    }

    fn render(&mut self, frame: &LayerFrame) -> Result<Option<CompositionLayer>, Error> {
        if frame.images.len() < self.swapchains.len() {
            return Err(Error::BackendSpecific(format!(
                "{} images for {} swapchains",
                frame.images.len(),
                self.swapchains.len()
            )));
        }
        let count = frame
            .views
            .views
            .len()
            .min(frame.options.view_count as usize);
        if count == 0 {
            return Ok(None);
        }

        let mut views = Vec::with_capacity(count);
        for (i, view) in frame.views.views.iter().take(count).enumerate() {
            let slot = self.slot(i);
            let color = &frame.images[slot];
            let sub_image = self.sub_image(color, &self.swapchains[slot], i);
            let depth = if self.has_depth() {
                let depth_slot = self.color_count + slot;
                let image = &frame.images[depth_slot];
                Some((image.image(), self.sub_image(image, &self.swapchains[depth_slot], i)))
            } else {
                None
            };

            let camera = Camera {
                eye: i,
                transform: pose_to_transform(&view.pose),
                projection: fov_to_projection_matrix(&view.fov, self.clip_planes),
                fov: view.fov,
            };
            let target = RenderTarget {
                color: color.image(),
                depth: depth.map(|(image, _)| image),
                array_index: sub_image.image_array_index,
                viewport: sub_image.image_rect,
            };
            self.renderer.render_view(&camera, &target)?;

            views.push(ProjectionView {
                pose: view.pose,
                fov: view.fov,
                sub_image,
                depth: depth.map(|(_, sub_image)| sub_image),
            });
        }
        self.clip_planes.recently_updated();

        Ok(Some(CompositionLayer::Projection {
            flags: self.flags,
            space: frame.space,
            views,
        }))
    }
}
