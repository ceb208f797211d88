/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! The session driver: lifecycle, event handling and the frame loop.

use crate::config::DriverConfig;
use crate::config::EXT_HAND_TRACKING;
use crate::config::EXT_PERFORMANCE_SETTINGS;
use crate::enumerate;
use crate::input::ActionBinder;
use crate::layers::FrameTarget;
use crate::layers::LayerManager;
use crate::negotiate::negotiate;
use crate::plugins::PluginSet;
use crate::resources::note_failure;
use crate::resources::Allocator;
use crate::resources::ReferenceSpaces;
use crate::resources::SwapchainRegistry;
use crate::state::AppState;
use crate::state::CancellationToken;
use crate::state::SessionMonitor;
use crate::state::StateSnapshot;
use crate::state::StopHandle;

use xrdriver_api::check;
use xrdriver_api::ActionSetHandle;
use xrdriver_api::Error;
use xrdriver_api::InstanceHandle;
use xrdriver_api::InstanceProperties;
use xrdriver_api::Layer;
use xrdriver_api::PerformanceDomain;
use xrdriver_api::Plugin;
use xrdriver_api::PluginContext;
use xrdriver_api::RenderOptions;
use xrdriver_api::Runtime;
use xrdriver_api::RuntimeEvent;
use xrdriver_api::SessionHandle;
use xrdriver_api::SessionState;
use xrdriver_api::SpaceHandle;
use xrdriver_api::SpaceLocation;
use xrdriver_api::SystemId;
use xrdriver_api::SystemProperties;
use xrdriver_api::Time;
use xrdriver_api::ViewInfo;
use xrdriver_api::XrDuration;

use log::debug;
use log::error;
use log::info;
use log::warn;

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::PoisonError;
use std::thread;
use std::time::Duration;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Whether a started session renders frames or only answers queries.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum StartMode {
    Render,
    /// Creates the session and negotiates options, but never begins
    /// the session or creates layers.
    Query,
}

/// A snapshot of the live runtime objects, for diagnostics.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct DriverHandles {
    pub instance: InstanceHandle,
    pub system: SystemId,
    pub session: SessionHandle,
    pub action_set: ActionSetHandle,
    pub spaces: ReferenceSpaces,
    pub swapchains: usize,
}

/// State shared between the render thread and the event thread.
struct Shared {
    runtime: Arc<dyn Runtime>,
    monitor: Arc<SessionMonitor>,
    plugins: Mutex<PluginSet>,
    instance: Mutex<InstanceHandle>,
    session: Mutex<SessionHandle>,
    poll_interval: Duration,
}

fn create_action_set(
    runtime: &dyn Runtime,
    instance: InstanceHandle,
) -> Result<ActionSetHandle, Error> {
    check(
        runtime.create_action_set(instance, "default", "Default", 0),
        "xrCreateActionSet",
    )
}

fn stop_reason(state: AppState, operation: &'static str) -> Error {
    match state {
        AppState::StopRequested | AppState::Disposed => Error::Cancelled,
        state => Error::InvalidState {
            operation,
            state: state.to_string(),
        },
    }
}

/// Drains the runtime's event queue on the event thread.
#[derive(Clone)]
pub struct EventPump {
    shared: Arc<Shared>,
}

impl EventPump {
    /// Handles every queued event and returns how many there were.
    pub fn poll_events(&self) -> Result<usize, Error> {
        let mut count = 0;
        loop {
            let event = {
                let instance = lock(&self.shared.instance);
                if instance.is_null() {
                    return Ok(count);
                }
                check(self.shared.runtime.poll_event(*instance), "xrPollEvent")?
            };
            match event {
                Some(event) => {
                    self.handle_event(&event);
                    count += 1;
                }
                None => return Ok(count),
            }
        }
    }

    /// Polls until `token` is cancelled or the driver is disposed.
    pub fn handle_events(&self, token: &CancellationToken) {
        while !token.is_cancelled() && self.shared.monitor.app_state() != AppState::Disposed {
            match self.poll_events() {
                Ok(0) => thread::sleep(self.shared.poll_interval),
                Ok(_) => {}
                Err(e) => {
                    warn!("{}", e);
                    thread::sleep(self.shared.poll_interval);
                }
            }
        }
        debug!("Event loop finished");
    }

    fn handle_event(&self, event: &RuntimeEvent) {
        let monitor = &self.shared.monitor;
        match *event {
            RuntimeEvent::SessionStateChanged { session, state, .. } => {
                let current = *lock(&self.shared.session);
                if current != session {
                    debug!("Ignoring {} for stale {:?}", state, session);
                    return;
                }
                info!("Session state changed to {}", state);
                monitor.set_session_state(state);
                if matches!(state, SessionState::Exiting | SessionState::LossPending) {
                    monitor.request_stop();
                }
            }
            RuntimeEvent::InstanceLossPending { loss_time } => {
                error!("Instance loss pending at {:?}", loss_time);
                monitor.request_stop();
            }
            RuntimeEvent::EventsLost { count } => warn!("Lost {} runtime events", count),
            ref other => debug!("Runtime event {:?}", other),
        }
        lock(&self.shared.plugins).invoke("handle_event", |p| p.handle_event(event));
    }
}

/// Drives one runtime session from the render thread.
///
/// Only `request_stop` (through a `StopHandle`) and event handling (through
/// an `EventPump`) happen on other threads.
pub struct SessionDriver {
    shared: Arc<Shared>,
    config: DriverConfig,
    mode: StartMode,
    layers: LayerManager,
    actions: ActionBinder,
    swapchains: SwapchainRegistry,
    extensions: Vec<String>,
    instance_properties: Option<InstanceProperties>,
    system_properties: Option<SystemProperties>,
    system: SystemId,
    action_set: ActionSetHandle,
    session: SessionHandle,
    spaces: ReferenceSpaces,
    view_info: Option<ViewInfo>,
    options: Option<RenderOptions>,
    teardown_failures: Vec<Error>,
}

impl SessionDriver {
    pub fn new(runtime: Arc<dyn Runtime>, config: DriverConfig) -> Self {
        let shared = Arc::new(Shared {
            runtime,
            monitor: Arc::new(SessionMonitor::new()),
            plugins: Mutex::new(PluginSet::new()),
            instance: Mutex::new(InstanceHandle::NULL),
            session: Mutex::new(SessionHandle::NULL),
            poll_interval: config.event_poll_interval,
        });
        SessionDriver {
            shared,
            config,
            mode: StartMode::Render,
            layers: LayerManager::new(),
            actions: ActionBinder::new(),
            swapchains: SwapchainRegistry::default(),
            extensions: vec![],
            instance_properties: None,
            system_properties: None,
            system: SystemId::NULL,
            action_set: ActionSetHandle::NULL,
            session: SessionHandle::NULL,
            spaces: ReferenceSpaces::default(),
            view_info: None,
            options: None,
            teardown_failures: vec![],
        }
    }

    pub fn add_plugin(&mut self, plugin: Box<dyn Plugin>) -> Result<(), Error> {
        self.check_idle("add_plugin")?;
        lock(&self.shared.plugins).add(plugin);
        Ok(())
    }

    pub fn add_layer(&mut self, layer: Box<dyn Layer>) -> Result<(), Error> {
        self.check_idle("add_layer")?;
        self.layers.add(layer);
        Ok(())
    }

    pub fn event_pump(&self) -> EventPump {
        EventPump {
            shared: self.shared.clone(),
        }
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle::new(self.shared.monitor.clone())
    }

    pub fn monitor(&self) -> &SessionMonitor {
        &self.shared.monitor
    }

    pub fn state(&self) -> StateSnapshot {
        self.shared.monitor.snapshot()
    }

    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    pub fn actions(&self) -> &ActionBinder {
        &self.actions
    }

    /// Declarations are accepted until the actions are attached.
    pub fn actions_mut(&mut self) -> &mut ActionBinder {
        &mut self.actions
    }

    pub fn layers(&self) -> &LayerManager {
        &self.layers
    }

    pub fn instance(&self) -> InstanceHandle {
        *lock(&self.shared.instance)
    }

    pub fn system(&self) -> SystemId {
        self.system
    }

    pub fn session(&self) -> SessionHandle {
        self.session
    }

    pub fn spaces(&self) -> ReferenceSpaces {
        self.spaces
    }

    /// The space frames are rendered in unless the host asks otherwise.
    pub fn render_space(&self) -> SpaceHandle {
        self.spaces.render_space(self.config.use_stage_space)
    }

    pub fn enabled_extensions(&self) -> &[String] {
        &self.extensions
    }

    pub fn instance_properties(&self) -> Option<&InstanceProperties> {
        self.instance_properties.as_ref()
    }

    pub fn system_properties(&self) -> Option<&SystemProperties> {
        self.system_properties.as_ref()
    }

    pub fn view_info(&self) -> Option<&ViewInfo> {
        self.view_info.as_ref()
    }

    pub fn render_options(&self) -> Option<&RenderOptions> {
        self.options.as_ref()
    }

    /// Failures recorded by the last `stop`.
    pub fn teardown_failures(&self) -> &[Error] {
        &self.teardown_failures
    }

    pub fn handles(&self) -> DriverHandles {
        DriverHandles {
            instance: self.instance(),
            system: self.system,
            session: self.session,
            action_set: self.action_set,
            spaces: self.spaces,
            swapchains: self.swapchains.len(),
        }
    }

    fn check_idle(&self, operation: &'static str) -> Result<(), Error> {
        match self.shared.monitor.app_state() {
            AppState::Created | AppState::Initialized | AppState::Stopped => Ok(()),
            state => Err(Error::InvalidState {
                operation,
                state: state.to_string(),
            }),
        }
    }

    fn plugin_context<'a>(&self, runtime: &'a dyn Runtime) -> PluginContext<'a> {
        PluginContext {
            runtime,
            instance: self.instance(),
            system: self.system,
            session: self.session,
        }
    }

    // Initialization

    fn initialize(&mut self) -> Result<(), Error> {
        let monitor = self.shared.monitor.clone();
        monitor
            .transition(
                |s| matches!(s, AppState::Created | AppState::Stopped),
                AppState::Initializing,
            )
            .map_err(|s| stop_reason(s, "initialize"))?;

        match self.try_initialize() {
            Ok(()) => {
                monitor.set_app_state(AppState::Initialized);
                Ok(())
            }
            Err(e) => {
                error!("Failed to initialize: {}", e);
                self.destroy_instance(&mut vec![]);
                monitor.set_app_state(AppState::Created);
                Err(e)
            }
        }
    }

    fn try_initialize(&mut self) -> Result<(), Error> {
        let shared = self.shared.clone();
        let runtime = &*shared.runtime;

        let mut requested = self.config.extensions.clone();
        lock(&shared.plugins).invoke("initialize", |p| p.initialize(&mut requested));
        self.layers.initialize(&mut requested);
        self.actions.request_extensions(&mut requested);
        self.extensions = enumerate::supported_extensions(runtime, &requested)?;

        let instance = check(
            runtime.create_instance(&self.config.application_info(), &self.extensions),
            "xrCreateInstance",
        )?;
        *lock(&shared.instance) = instance;

        self.action_set = create_action_set(runtime, instance)?;

        let properties = check(
            runtime.instance_properties(instance),
            "xrGetInstanceProperties",
        )?;
        info!(
            "Runtime {} version {:#x}",
            properties.runtime_name, properties.runtime_version
        );
        self.instance_properties = Some(properties);

        self.system = check(runtime.system(instance, self.config.form_factor), "xrGetSystem")?;
        match runtime.system_properties(instance, self.system) {
            Ok(properties) => {
                info!("System {} ({:?})", properties.system_name, self.system);
                self.system_properties = Some(properties);
            }
            Err(result) => warn!("Failed to get system properties: {}", result),
        }

        let ctx = self.plugin_context(runtime);
        let result = lock(&shared.plugins)
            .invoke_must_succeed("on_instance_created", |p| p.on_instance_created(&ctx));
        result
    }

    // Start

    /// Brings the session up, initializing the instance first if needed.
    ///
    /// In render mode this blocks until the runtime reports the session
    /// ready, so the event pump must be running on another thread. A stop
    /// request ends the wait with `Error::Cancelled`.
    pub fn start(&mut self, mode: StartMode) -> Result<(), Error> {
        let monitor = self.shared.monitor.clone();
        match monitor.app_state() {
            AppState::Created | AppState::Stopped => self.initialize()?,
            AppState::Initialized => {}
            state => return Err(stop_reason(state, "start")),
        }
        monitor
            .transition(|s| s == AppState::Initialized, AppState::Starting)
            .map_err(|s| stop_reason(s, "start"))?;
        self.mode = mode;

        match self.try_start(mode) {
            Ok(()) => {
                info!("Session started in {:?} mode", mode);
                Ok(())
            }
            Err(e) => {
                warn!("Failed to start: {}", e);
                self.destroy_session(&mut vec![]);
                if monitor.app_state() != AppState::Disposed {
                    monitor.set_app_state(AppState::Initialized);
                }
                Err(e)
            }
        }
    }

    fn try_start(&mut self, mode: StartMode) -> Result<(), Error> {
        let shared = self.shared.clone();
        let runtime = &*shared.runtime;
        let monitor = &shared.monitor;

        {
            let instance = lock(&shared.instance);
            self.session = check(
                runtime.create_session(*instance, self.system),
                "xrCreateSession",
            )?;
            *lock(&shared.session) = self.session;
        }
        let instance = self.instance();
        let session = self.session;

        self.spaces = ReferenceSpaces::create(runtime, session)?;

        let infos = enumerate::view_infos(runtime, instance, self.system, session)?;
        let (view, mut options) = negotiate(&self.config, &infos)?;
        lock(&shared.plugins).invoke("select_render_options", |p| {
            p.select_render_options(&view, &mut options)
        });
        self.view_info = Some(view);

        if mode == StartMode::Render {
            self.layers.commit();
            let mut plugins = lock(&shared.plugins);
            let mut allocator = Allocator {
                runtime,
                session,
                options: &options,
                plugins: &mut *plugins,
                registry: &mut self.swapchains,
            };
            self.layers.create(&mut allocator);
        }
        self.options = Some(options);

        let ctx = self.plugin_context(runtime);
        lock(&shared.plugins).invoke("on_session_created", |p| p.on_session_created(&ctx));
        monitor
            .transition(|s| s == AppState::Starting, AppState::SessionCreated)
            .map_err(|s| stop_reason(s, "start"))?;

        if self.action_set.is_null() {
            self.action_set = create_action_set(runtime, instance)?;
        }
        self.actions
            .initialize(runtime, instance, session, self.action_set)?;
        if self.extensions.iter().any(|e| e == EXT_HAND_TRACKING) {
            self.actions.create_hand_trackers(runtime, session);
        }

        if mode == StartMode::Render {
            self.begin(runtime)?;
        }

        monitor
            .transition(|s| s == AppState::SessionCreated, AppState::Started)
            .map_err(|s| stop_reason(s, "start"))?;
        Ok(())
    }

    /// Waits for the runtime to be ready and begins the session.
    fn begin(&mut self, runtime: &dyn Runtime) -> Result<(), Error> {
        let snapshot = self
            .shared
            .monitor
            .wait_until(|s| matches!(s.session, SessionState::Ready | SessionState::Focused))?;
        debug!("Beginning session in {}", snapshot.session);

        let ty = match self.options {
            Some(ref options) => options.view_configuration,
            None => return Err(Error::NoViewConfiguration),
        };
        check(runtime.begin_session(self.session, ty), "xrBeginSession")?;
        self.apply_performance_levels(runtime);

        let ctx = self.plugin_context(runtime);
        lock(&self.shared.plugins).invoke("on_session_begin", |p| p.on_session_begin(&ctx));
        Ok(())
    }

    fn apply_performance_levels(&self, runtime: &dyn Runtime) {
        if !self.extensions.iter().any(|e| e == EXT_PERFORMANCE_SETTINGS) {
            return;
        }
        let options = match self.options {
            Some(ref options) => options,
            None => return,
        };
        let levels = [
            (PerformanceDomain::Cpu, options.cpu_level),
            (PerformanceDomain::Gpu, options.gpu_level),
        ];
        for (domain, level) in levels.iter() {
            if let Some(level) = level {
                if let Err(result) = runtime.set_performance_level(self.session, *domain, *level) {
                    warn!("Failed to set {:?} level {:?}: {}", domain, level, result);
                }
            }
        }
    }

    // Frame loop

    /// Runs one frame: wait, sync input, begin, render the layers, end.
    ///
    /// Returns whether a frame was submitted. Once a frame has begun it is
    /// always ended, even when rendering fails; the first failure is then
    /// returned. A `NULL` space renders in `render_space()`.
    pub fn render_frame(&mut self, space: SpaceHandle) -> Result<bool, Error> {
        let snapshot = self.shared.monitor.snapshot();
        match snapshot.app {
            AppState::Started => {}
            AppState::StopRequested => return Ok(false),
            state => {
                return Err(Error::InvalidState {
                    operation: "render_frame",
                    state: state.to_string(),
                })
            }
        }
        if self.mode == StartMode::Query {
            return Err(Error::InvalidState {
                operation: "render_frame",
                state: "query session".into(),
            });
        }
        if snapshot.session == SessionState::Stopping {
            self.restart()?;
            return Ok(false);
        }
        if !snapshot.session.is_running() {
            return Ok(false);
        }

        let shared = self.shared.clone();
        let runtime = &*shared.runtime;
        let session = self.session;
        let space = if space.is_null() {
            self.render_space()
        } else {
            space
        };
        let options = match self.options {
            Some(ref options) => options,
            None => return Err(Error::NoViewConfiguration),
        };

        let frame_state = check(runtime.wait_frame(session), "xrWaitFrame")?;
        let display_time = frame_state.predicted_display_time;

        if shared.monitor.session_state() == SessionState::Focused {
            self.actions.sync(runtime, session, space, display_time);
            self.actions.locate_hands(runtime, space, display_time);
        } else {
            self.actions.mark_inactive();
        }

        check(runtime.begin_frame(session), "xrBeginFrame")?;
        self.layers.begin_frame(space, display_time);

        let mut composed = vec![];
        let mut failure = None;
        if frame_state.should_render {
            match check(
                runtime.locate_views(session, options.view_configuration, display_time, space),
                "xrLocateViews",
            ) {
                Ok(views) if views.is_tracked() => {
                    let target = FrameTarget {
                        runtime,
                        session,
                        space,
                        display_time,
                        views: &views,
                        options,
                        timeout: self.config.swapchain_timeout,
                    };
                    if let Err(e) = self.layers.render(&target, &mut composed) {
                        failure = Some(e);
                    }
                }
                Ok(_) => debug!("Views are not tracked, submitting an empty frame"),
                Err(e) => failure = Some(e),
            }
        }

        self.layers.end_frame();
        let ended = check(
            runtime.end_frame(session, display_time, options.blend_mode, &composed),
            "xrEndFrame",
        );
        if let Some(e) = failure {
            if let Err(end) = ended {
                warn!("{}", end);
            }
            return Err(e);
        }
        ended.map(|()| true)
    }

    /// Ends a stopping session and begins it again once the runtime is
    /// ready.
    fn restart(&mut self) -> Result<(), Error> {
        let shared = self.shared.clone();
        let runtime = &*shared.runtime;
        let monitor = &shared.monitor;
        if monitor
            .transition(|s| s == AppState::Started, AppState::Restarting)
            .is_err()
        {
            return Ok(());
        }
        info!("Session is stopping, restarting");

        let result = check(runtime.end_session(self.session), "xrEndSession").and_then(|()| {
            let ctx = self.plugin_context(runtime);
            lock(&shared.plugins).invoke("on_session_end", |p| p.on_session_end(&ctx));
            self.begin(runtime)
        });
        match result {
            Ok(()) => {
                let _ = monitor.transition(|s| s == AppState::Restarting, AppState::Started);
                Ok(())
            }
            Err(Error::Cancelled) => Ok(()),
            Err(e) => {
                error!("Failed to restart: {}", e);
                monitor.request_stop();
                Err(e)
            }
        }
    }

    // Stop and dispose

    /// Asks the session to stop. Safe to call from any thread through a
    /// `StopHandle`; here for convenience.
    pub fn request_stop(&self) -> bool {
        self.shared.monitor.request_stop()
    }

    /// Asks the runtime to end the session. The runtime answers with
    /// `Stopping` and eventually `Exiting`.
    pub fn request_exit(&self) -> Result<(), Error> {
        if self.session.is_null() {
            return Err(Error::InvalidState {
                operation: "request_exit",
                state: self.shared.monitor.app_state().to_string(),
            });
        }
        check(
            self.shared.runtime.request_exit_session(self.session),
            "xrRequestExitSession",
        )
    }

    /// Tears the session and the instance down. Failures are logged and
    /// kept in `teardown_failures`.
    pub fn stop(&mut self) {
        let monitor = self.shared.monitor.clone();
        match monitor.app_state() {
            AppState::Created | AppState::Stopped | AppState::Disposed => return,
            _ => {}
        }
        monitor.set_app_state(AppState::Stopping);

        let mut failures = vec![];
        self.destroy_session(&mut failures);
        self.destroy_instance(&mut failures);
        monitor.set_session_state(SessionState::Unknown);
        monitor.set_app_state(AppState::Stopped);
        if !failures.is_empty() {
            warn!("Stopped with {} teardown failures", failures.len());
        }
        self.teardown_failures = failures;
    }

    /// Stops and releases the plugins. Idempotent; the driver can't be
    /// started again afterwards.
    pub fn dispose(&mut self) {
        let monitor = self.shared.monitor.clone();
        if monitor.app_state() == AppState::Disposed {
            return;
        }
        self.stop();
        lock(&self.shared.plugins).clear();
        monitor.set_app_state(AppState::Disposed);
    }

    fn destroy_session(&mut self, failures: &mut Vec<Error>) {
        let shared = self.shared.clone();
        let runtime = &*shared.runtime;

        if !self.session.is_null() {
            let ctx = self.plugin_context(runtime);
            lock(&shared.plugins).invoke("on_session_end", |p| p.on_session_end(&ctx));
        }

        if let Some(ref options) = self.options {
            let mut plugins = lock(&shared.plugins);
            let mut allocator = Allocator {
                runtime,
                session: self.session,
                options,
                plugins: &mut *plugins,
                registry: &mut self.swapchains,
            };
            self.layers.destroy(&mut allocator);
        }
        self.swapchains.destroy_all(runtime, failures);
        let attached = self.actions.is_attached();
        self.actions.destroy(runtime, failures);
        if attached {
            // An attached set takes no new actions.
            let action_set = self.action_set.take();
            note_failure(
                failures,
                runtime.destroy_action_set(action_set),
                "xrDestroyActionSet",
            );
        }
        self.spaces.destroy(runtime, failures);

        let session = self.session.take();
        *lock(&shared.session) = SessionHandle::NULL;
        if !session.is_null() {
            note_failure(failures, runtime.destroy_session(session), "xrDestroySession");
        }
        self.options = None;
        self.view_info = None;
        shared.monitor.set_session_state(SessionState::Unknown);
    }

    fn destroy_instance(&mut self, failures: &mut Vec<Error>) {
        let runtime = &*self.shared.runtime;
        let mut instance = lock(&self.shared.instance);
        let action_set = self.action_set.take();
        if !action_set.is_null() {
            note_failure(
                failures,
                runtime.destroy_action_set(action_set),
                "xrDestroyActionSet",
            );
        }
        let handle = instance.take();
        if !handle.is_null() {
            note_failure(failures, runtime.destroy_instance(handle), "xrDestroyInstance");
        }
        self.system = SystemId::NULL;
    }

    // Queries

    pub fn locate_space(
        &self,
        space: SpaceHandle,
        base: SpaceHandle,
        time: Time,
    ) -> Result<SpaceLocation, Error> {
        check(
            self.shared.runtime.locate_space(space, base, time),
            "xrLocateSpace",
        )
    }

    pub fn vibrate(
        &self,
        action: &str,
        amplitude: f32,
        frequency: f32,
        duration: XrDuration,
    ) -> Result<(), Error> {
        self.actions.vibrate(
            &*self.shared.runtime,
            self.session,
            action,
            amplitude,
            frequency,
            duration,
        )
    }

    pub fn stop_haptic(&self, action: &str) -> Result<(), Error> {
        self.actions
            .stop_haptic(&*self.shared.runtime, self.session, action)
    }
}

impl Drop for SessionDriver {
    fn drop(&mut self) {
        self.dispose();
    }
}
