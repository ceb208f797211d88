/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use xrdriver_api::Error;
use xrdriver_api::Plugin;

use log::error;

/// The registered plugins, invoked in registration order.
#[derive(Default)]
pub struct PluginSet {
    plugins: Vec<Box<dyn Plugin>>,
}

impl PluginSet {
    pub fn new() -> Self {
        PluginSet::default()
    }

    pub fn add(&mut self, plugin: Box<dyn Plugin>) {
        self.plugins.push(plugin);
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    /// Runs `hook` on every plugin. A failure is logged and doesn't stop
    /// the remaining plugins; the number of failures is returned.
    pub fn invoke<F>(&mut self, hook: &str, mut f: F) -> usize
    where
        F: FnMut(&mut dyn Plugin) -> Result<(), Error>,
    {
        let mut failures = 0;
        for plugin in self.plugins.iter_mut() {
            if let Err(e) = f(plugin.as_mut()) {
                error!("Plugin {} failed in {}: {}", plugin.name(), hook, e);
                failures += 1;
            }
        }
        failures
    }

    /// Runs `hook` on every plugin and stops at the first failure.
    pub fn invoke_must_succeed<F>(&mut self, hook: &str, mut f: F) -> Result<(), Error>
    where
        F: FnMut(&mut dyn Plugin) -> Result<(), Error>,
    {
        for plugin in self.plugins.iter_mut() {
            if let Err(e) = f(plugin.as_mut()) {
                error!("Plugin {} failed in {}: {}", plugin.name(), hook, e);
                return Err(Error::Plugin {
                    name: plugin.name().to_owned(),
                    message: e.to_string(),
                });
            }
        }
        Ok(())
    }

    pub fn clear(&mut self) {
        self.plugins.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::atomic::Ordering;
    use std::sync::Arc;

    struct Counting {
        name: &'static str,
        fail: bool,
        calls: Arc<AtomicUsize>,
    }

    impl Plugin for Counting {
        fn name(&self) -> &str {
            self.name
        }

        fn initialize(&mut self, extensions: &mut Vec<String>) -> Result<(), Error> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(Error::BackendSpecific("boom".into()));
            }
            extensions.push(self.name.into());
            Ok(())
        }
    }

    fn set(fail_first: bool, calls: &Arc<AtomicUsize>) -> PluginSet {
        let mut set = PluginSet::new();
        set.add(Box::new(Counting {
            name: "first",
            fail: fail_first,
            calls: calls.clone(),
        }));
        set.add(Box::new(Counting {
            name: "second",
            fail: false,
            calls: calls.clone(),
        }));
        set
    }

    #[test]
    fn failure_is_isolated() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut plugins = set(true, &calls);
        let mut extensions = vec![];
        let failures = plugins.invoke("initialize", |p| p.initialize(&mut extensions));
        assert_eq!(failures, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(extensions, vec!["second".to_owned()]);
    }

    #[test]
    fn must_succeed_stops_at_first_failure() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut plugins = set(true, &calls);
        let mut extensions = vec![];
        let result = plugins.invoke_must_succeed("initialize", |p| p.initialize(&mut extensions));
        match result {
            Err(Error::Plugin { name, .. }) => assert_eq!(name, "first"),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
