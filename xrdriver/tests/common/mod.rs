/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

#![allow(dead_code)]

use xrdriver::headless::HeadlessController;
use xrdriver::headless::HeadlessInit;
use xrdriver::headless::HeadlessRuntime;
use xrdriver::AppState;
use xrdriver::CancellationToken;
use xrdriver::DriverConfig;
use xrdriver::SessionDriver;
use xrdriver::StartMode;
use xrdriver_api::Camera;
use xrdriver_api::Error;
use xrdriver_api::RenderTarget;
use xrdriver_api::Renderer;
use xrdriver_api::SessionState;

use std::sync::Arc;
use std::sync::Mutex;
use std::thread;
use std::thread::JoinHandle;
use std::time::Duration;

pub const TIMEOUT: Duration = Duration::from_secs(5);

/// A driver over the headless runtime with its event pump running on a
/// thread of its own.
pub struct Harness {
    pub driver: SessionDriver,
    pub controller: HeadlessController,
    token: CancellationToken,
    pump: Option<JoinHandle<()>>,
}

impl Harness {
    pub fn new(init: HeadlessInit, config: DriverConfig) -> Self {
        let _ = env_logger::builder().is_test(true).try_init();
        let runtime = HeadlessRuntime::new(init);
        let controller = runtime.controller();
        let driver = SessionDriver::new(Arc::new(runtime), config);
        let token = CancellationToken::new();
        let pump = driver.event_pump();
        let pump_token = token.clone();
        let pump = thread::spawn(move || pump.handle_events(&pump_token));
        Harness {
            driver,
            controller,
            token,
            pump: Some(pump),
        }
    }

    pub fn with_defaults() -> Self {
        Harness::new(HeadlessInit::default(), DriverConfig::default())
    }

    pub fn app_state(&self) -> AppState {
        self.driver.state().app
    }

    pub fn wait_for_session(&self, state: SessionState) -> bool {
        self.driver
            .monitor()
            .wait_timeout(|s| s.session == state, TIMEOUT)
            .is_some()
    }

    /// Starts rendering and waits until the runtime gives focus.
    pub fn start_focused(&mut self) {
        self.driver.start(StartMode::Render).unwrap();
        assert!(self.wait_for_session(SessionState::Focused));
    }
}

impl Drop for Harness {
    fn drop(&mut self) {
        self.driver.dispose();
        self.token.cancel();
        if let Some(pump) = self.pump.take() {
            let _ = pump.join();
        }
    }
}

/// One `render_view` call.
#[derive(Clone, Debug)]
pub struct Drawn {
    pub eye: usize,
    pub target: RenderTarget,
}

/// A renderer that remembers what it was asked to draw.
pub struct RecordingRenderer {
    pub drawn: Arc<Mutex<Vec<Drawn>>>,
    pub fail: bool,
}

impl RecordingRenderer {
    pub fn new() -> (Self, Arc<Mutex<Vec<Drawn>>>) {
        let drawn = Arc::new(Mutex::new(vec![]));
        let renderer = RecordingRenderer {
            drawn: drawn.clone(),
            fail: false,
        };
        (renderer, drawn)
    }

    pub fn failing() -> Self {
        RecordingRenderer {
            drawn: Arc::new(Mutex::new(vec![])),
            fail: true,
        }
    }
}

impl Renderer for RecordingRenderer {
    fn render_view(&mut self, camera: &Camera, target: &RenderTarget) -> Result<(), Error> {
        if self.fail {
            return Err(Error::BackendSpecific("device lost".into()));
        }
        self.drawn.lock().unwrap().push(Drawn {
            eye: camera.eye,
            target: *target,
        });
        Ok(())
    }
}
