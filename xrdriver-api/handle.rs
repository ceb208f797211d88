/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Opaque runtime object handles. A zero value never names a live object.

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

macro_rules! handles {
    ($($(#[$doc:meta])* $name:ident,)*) => {
        $(
            $(#[$doc])*
            #[derive(Clone, Copy, Default, Eq, Hash, PartialEq)]
            #[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
            pub struct $name(pub u64);

            impl $name {
                pub const NULL: $name = $name(0);

                pub fn is_null(self) -> bool {
                    self.0 == 0
                }

                /// Returns the handle and leaves `NULL` behind.
                pub fn take(&mut self) -> $name {
                    std::mem::replace(self, $name::NULL)
                }
            }

            impl fmt::Debug for $name {
                fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                    write!(f, "{}({:#x})", stringify!($name), self.0)
                }
            }
        )*
    };
}

handles! {
    InstanceHandle,
    /// A system is an id rather than a destroyable object.
    SystemId,
    SessionHandle,
    SpaceHandle,
    SwapchainHandle,
    ActionSetHandle,
    ActionHandle,
    PathHandle,
    /// A vendor layer object such as a passthrough layer.
    LayerHandle,
    HandTrackerHandle,
}
