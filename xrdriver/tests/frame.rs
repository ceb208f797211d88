/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

mod common;

use common::Harness;
use common::RecordingRenderer;

use xrdriver::headless::Call;
use xrdriver::headless::HandleKind;
use xrdriver::headless::HeadlessInit;
use xrdriver::headless::HeadlessViewConfiguration;
use xrdriver::headless::GL_DEPTH_COMPONENT24;
use xrdriver::layers::PassthroughLayer;
use xrdriver::layers::ProjectionLayer;
use xrdriver::DriverConfig;
use xrdriver_api::CompositionLayer;
use xrdriver_api::EnvironmentBlendMode;
use xrdriver_api::PerformanceDomain;
use xrdriver_api::PerformanceLevel;
use xrdriver_api::RenderMode;
use xrdriver_api::ResultCode;
use xrdriver_api::SessionState;
use xrdriver_api::SpaceHandle;
use xrdriver_api::ViewConfigurationType;

fn projection_views(layer: &CompositionLayer) -> usize {
    match layer {
        CompositionLayer::Projection { views, .. } => views.len(),
        other => panic!("expected a projection layer, got {:?}", other),
    }
}

#[test]
fn stereo_frame_submits_one_projection_layer() {
    let mut harness = Harness::with_defaults();
    let (renderer, drawn) = RecordingRenderer::new();
    harness
        .driver
        .add_layer(Box::new(ProjectionLayer::new(Box::new(renderer))))
        .unwrap();
    harness.start_focused();
    assert_eq!(harness.controller.live(HandleKind::Swapchain), 1);

    assert_eq!(harness.driver.render_frame(SpaceHandle::NULL), Ok(true));

    let frames = harness.controller.frames();
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].blend_mode, EnvironmentBlendMode::Opaque);
    assert_eq!(frames[0].layers.len(), 1);
    assert_eq!(projection_views(&frames[0].layers[0]), 2);

    let width = harness.driver.render_options().unwrap().size.width;
    let drawn = drawn.lock().unwrap();
    assert_eq!(drawn.len(), 2);
    assert_eq!(drawn[0].eye, 0);
    assert_eq!(drawn[1].eye, 1);
    assert_eq!(drawn[0].target.viewport.origin.x, 0);
    assert_eq!(drawn[1].target.viewport.origin.x, width);
    assert_eq!(drawn[0].target.color, drawn[1].target.color);

    assert_eq!(harness.controller.calls(Call::AcquireSwapchainImage), 1);
    assert_eq!(harness.controller.calls(Call::ReleaseSwapchainImage), 1);
}

#[test]
fn single_eye_mode_cycles_a_swapchain_per_view() {
    let config = DriverConfig::default().with_render_mode(RenderMode::SingleEye);
    let mut harness = Harness::new(HeadlessInit::default(), config);
    let (renderer, drawn) = RecordingRenderer::new();
    harness
        .driver
        .add_layer(Box::new(ProjectionLayer::new(Box::new(renderer))))
        .unwrap();
    harness.start_focused();
    assert_eq!(harness.controller.live(HandleKind::Swapchain), 2);

    assert_eq!(harness.driver.render_frame(SpaceHandle::NULL), Ok(true));
    assert_eq!(harness.controller.calls(Call::AcquireSwapchainImage), 2);
    assert_eq!(harness.controller.calls(Call::WaitSwapchainImage), 2);
    assert_eq!(harness.controller.calls(Call::ReleaseSwapchainImage), 2);
    assert_eq!(harness.controller.calls(Call::EndFrame), 1);

    let drawn = drawn.lock().unwrap();
    assert_eq!(drawn.len(), 2);
    assert_ne!(drawn[0].target.color, drawn[1].target.color);
    assert_eq!(drawn[1].target.viewport.origin.x, 0);
}

#[test]
fn depth_swapchains_are_submitted_with_color() {
    let config = DriverConfig::default().with_depth(&[GL_DEPTH_COMPONENT24]);
    let mut harness = Harness::new(HeadlessInit::default(), config);
    let (renderer, drawn) = RecordingRenderer::new();
    harness
        .driver
        .add_layer(Box::new(ProjectionLayer::new(Box::new(renderer))))
        .unwrap();
    harness.start_focused();
    assert_eq!(
        harness.driver.render_options().unwrap().depth_format,
        Some(GL_DEPTH_COMPONENT24)
    );
    assert_eq!(harness.controller.live(HandleKind::Swapchain), 2);

    assert_eq!(harness.driver.render_frame(SpaceHandle::NULL), Ok(true));
    assert_eq!(harness.controller.calls(Call::AcquireSwapchainImage), 2);
    match &harness.controller.frames()[0].layers[0] {
        CompositionLayer::Projection { views, .. } => {
            assert!(views.iter().all(|v| v.depth.is_some()))
        }
        other => panic!("expected a projection layer, got {:?}", other),
    }
    assert!(drawn.lock().unwrap().iter().all(|d| d.target.depth.is_some()));
}

#[test]
fn images_are_released_in_reverse_acquisition_order() {
    let config = DriverConfig::default().with_depth(&[GL_DEPTH_COMPONENT24]);
    let mut harness = Harness::new(HeadlessInit::default(), config);
    let (renderer, _) = RecordingRenderer::new();
    harness
        .driver
        .add_layer(Box::new(ProjectionLayer::new(Box::new(renderer))))
        .unwrap();
    harness.start_focused();

    assert_eq!(harness.driver.render_frame(SpaceHandle::NULL), Ok(true));
    let (color, depth) = match &harness.controller.frames()[0].layers[0] {
        CompositionLayer::Projection { views, .. } => (
            views[0].sub_image.swapchain,
            views[0].depth.unwrap().swapchain,
        ),
        other => panic!("expected a projection layer, got {:?}", other),
    };
    assert_eq!(harness.controller.released_images(), vec![depth, color]);
}

#[test]
fn failed_image_enumeration_destroys_the_swapchain() {
    let mut harness = Harness::with_defaults();
    let (renderer, drawn) = RecordingRenderer::new();
    harness
        .driver
        .add_layer(Box::new(ProjectionLayer::new(Box::new(renderer))))
        .unwrap();
    harness
        .controller
        .fail_next(Call::EnumerateSwapchainImages, ResultCode::ERROR_RUNTIME_FAILURE);
    harness.start_focused();
    assert_eq!(harness.controller.calls(Call::DestroySwapchain), 1);
    assert_eq!(harness.controller.live(HandleKind::Swapchain), 0);

    assert_eq!(harness.driver.render_frame(SpaceHandle::NULL), Ok(true));
    assert!(harness.controller.frames()[0].layers.is_empty());
    assert!(drawn.lock().unwrap().is_empty());
}

#[test]
fn failed_image_wait_still_releases_and_ends_the_frame() {
    let mut harness = Harness::with_defaults();
    let (renderer, drawn) = RecordingRenderer::new();
    harness
        .driver
        .add_layer(Box::new(ProjectionLayer::new(Box::new(renderer))))
        .unwrap();
    harness.start_focused();

    harness
        .controller
        .fail_next(Call::WaitSwapchainImage, ResultCode::ERROR_RUNTIME_FAILURE);
    let err = harness.driver.render_frame(SpaceHandle::NULL).unwrap_err();
    assert_eq!(err.result(), Some(ResultCode::ERROR_RUNTIME_FAILURE));
    assert_eq!(harness.controller.calls(Call::AcquireSwapchainImage), 1);
    assert_eq!(harness.controller.calls(Call::ReleaseSwapchainImage), 1);
    assert_eq!(harness.controller.calls(Call::EndFrame), 1);
    assert!(harness.controller.frames()[0].layers.is_empty());
    assert!(drawn.lock().unwrap().is_empty());

    assert_eq!(harness.driver.render_frame(SpaceHandle::NULL), Ok(true));
    assert_eq!(harness.controller.frames()[1].layers.len(), 1);
}

#[test]
fn failing_renderer_drops_only_its_layer() {
    let mut harness = Harness::with_defaults();
    harness
        .driver
        .add_layer(Box::new(ProjectionLayer::new(Box::new(
            RecordingRenderer::failing(),
        ))))
        .unwrap();
    harness
        .driver
        .add_layer(Box::new(PassthroughLayer::new()))
        .unwrap();
    harness.start_focused();

    assert_eq!(harness.driver.render_frame(SpaceHandle::NULL), Ok(true));
    let frames = harness.controller.frames();
    assert_eq!(frames[0].layers.len(), 1);
    match frames[0].layers[0] {
        CompositionLayer::Passthrough { .. } => {}
        ref other => panic!("expected a passthrough layer, got {:?}", other),
    }
    assert_eq!(
        harness.controller.calls(Call::AcquireSwapchainImage),
        harness.controller.calls(Call::ReleaseSwapchainImage)
    );
}

#[test]
fn passthrough_is_composited_first_without_a_swapchain() {
    let mut harness = Harness::with_defaults();
    let (renderer, _drawn) = RecordingRenderer::new();
    harness
        .driver
        .add_layer(Box::new(ProjectionLayer::new(Box::new(renderer))))
        .unwrap();
    harness
        .driver
        .add_layer(Box::new(PassthroughLayer::new()))
        .unwrap();
    harness.start_focused();
    assert_eq!(harness.driver.layers().names(), vec!["passthrough", "projection"]);
    assert_eq!(harness.controller.live(HandleKind::PassthroughLayer), 1);
    assert_eq!(harness.controller.live(HandleKind::Swapchain), 1);

    assert_eq!(harness.driver.render_frame(SpaceHandle::NULL), Ok(true));
    let frames = harness.controller.frames();
    assert_eq!(frames[0].layers.len(), 2);
    match frames[0].layers[0] {
        CompositionLayer::Passthrough { .. } => {}
        ref other => panic!("expected a passthrough layer, got {:?}", other),
    }
    assert_eq!(projection_views(&frames[0].layers[1]), 2);
    assert_eq!(harness.controller.calls(Call::AcquireSwapchainImage), 1);

    harness.driver.stop();
    assert_eq!(harness.controller.live(HandleKind::PassthroughLayer), 0);
}

#[test]
fn untracked_views_submit_an_empty_frame() {
    let mut harness = Harness::with_defaults();
    let (renderer, drawn) = RecordingRenderer::new();
    harness
        .driver
        .add_layer(Box::new(ProjectionLayer::new(Box::new(renderer))))
        .unwrap();
    harness.start_focused();

    harness.controller.set_head_tracked(false);
    assert_eq!(harness.driver.render_frame(SpaceHandle::NULL), Ok(true));
    assert!(harness.controller.frames()[0].layers.is_empty());
    assert!(drawn.lock().unwrap().is_empty());
    assert_eq!(harness.controller.calls(Call::AcquireSwapchainImage), 0);
}

#[test]
fn hidden_session_ends_frames_without_rendering() {
    let mut harness = Harness::with_defaults();
    let (renderer, drawn) = RecordingRenderer::new();
    harness
        .driver
        .add_layer(Box::new(ProjectionLayer::new(Box::new(renderer))))
        .unwrap();
    harness.start_focused();

    harness
        .controller
        .set_session_state(SessionState::Synchronized);
    assert!(harness.wait_for_session(SessionState::Synchronized));
    assert_eq!(harness.driver.render_frame(SpaceHandle::NULL), Ok(true));
    assert_eq!(harness.controller.calls(Call::LocateViews), 0);
    assert_eq!(harness.controller.calls(Call::EndFrame), 1);
    assert!(drawn.lock().unwrap().is_empty());
}

#[test]
fn preferred_blend_mode_is_used_when_offered() {
    let init = HeadlessInit {
        view_configurations: vec![HeadlessViewConfiguration::new(
            ViewConfigurationType::PrimaryStereo,
            2,
            1440,
            1600,
        )
        .with_blend_modes(&[EnvironmentBlendMode::Opaque, EnvironmentBlendMode::AlphaBlend])],
        ..HeadlessInit::default()
    };
    let mut harness = Harness::new(init, DriverConfig::default());
    harness.start_focused();

    assert_eq!(harness.driver.render_frame(SpaceHandle::NULL), Ok(true));
    assert_eq!(
        harness.controller.frames()[0].blend_mode,
        EnvironmentBlendMode::AlphaBlend
    );
}

#[test]
fn performance_levels_are_applied_on_begin() {
    let config =
        DriverConfig::default().with_performance_levels(Some(PerformanceLevel::SustainedHigh), None);
    let mut harness = Harness::new(HeadlessInit::default(), config);
    harness.start_focused();
    assert_eq!(
        harness.controller.performance_levels(),
        vec![(PerformanceDomain::Cpu, PerformanceLevel::SustainedHigh)]
    );
}

#[test]
fn frames_need_a_started_session() {
    let mut harness = Harness::with_defaults();
    assert!(harness.driver.render_frame(SpaceHandle::NULL).is_err());
    assert_eq!(harness.controller.calls(Call::WaitFrame), 0);
}
