/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use crate::error::Error;
use crate::handle::InstanceHandle;
use crate::handle::SessionHandle;
use crate::handle::SystemId;
use crate::runtime::Runtime;
use crate::swapchain::SwapchainCreateInfo;
use crate::types::RenderOptions;
use crate::types::RuntimeEvent;
use crate::types::ViewInfo;

/// The objects a plugin hook may call into.
#[derive(Clone, Copy)]
pub struct PluginContext<'a> {
    pub runtime: &'a dyn Runtime,
    pub instance: InstanceHandle,
    pub system: SystemId,
    pub session: SessionHandle,
}

/// A vendor extension hooked into the session lifecycle.
///
/// Every hook has a default that does nothing. A failing hook is logged
/// and the remaining plugins still run, except for `on_instance_created`
/// which aborts initialization.
pub trait Plugin: Send {
    fn name(&self) -> &str;

    /// Adds the extensions this plugin needs.
    fn initialize(&mut self, _extensions: &mut Vec<String>) -> Result<(), Error> {
        Ok(())
    }

    fn on_instance_created(&mut self, _ctx: &PluginContext) -> Result<(), Error> {
        Ok(())
    }

    fn on_session_created(&mut self, _ctx: &PluginContext) -> Result<(), Error> {
        Ok(())
    }

    fn on_session_begin(&mut self, _ctx: &PluginContext) -> Result<(), Error> {
        Ok(())
    }

    fn on_session_end(&mut self, _ctx: &PluginContext) -> Result<(), Error> {
        Ok(())
    }

    fn handle_event(&mut self, _event: &RuntimeEvent) -> Result<(), Error> {
        Ok(())
    }

    fn configure_swapchain(&mut self, _info: &mut SwapchainCreateInfo) -> Result<(), Error> {
        Ok(())
    }

    fn select_render_options(
        &mut self,
        _view: &ViewInfo,
        _options: &mut RenderOptions,
    ) -> Result<(), Error> {
        Ok(())
    }
}
