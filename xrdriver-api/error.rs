/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A raw result value reported by the runtime. Non-negative values are
/// success codes, negative values are errors.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ResultCode(pub i32);

macro_rules! result_codes {
    ($($name:ident = $value:literal,)*) => {
        impl ResultCode {
            $(pub const $name: ResultCode = ResultCode($value);)*

            /// The symbolic name of a known code.
            pub fn name(self) -> Option<&'static str> {
                match self.0 {
                    $($value => Some(stringify!($name)),)*
                    _ => None,
                }
            }
        }
    };
}

result_codes! {
    SUCCESS = 0,
    TIMEOUT_EXPIRED = 1,
    SESSION_LOSS_PENDING = 3,
    EVENT_UNAVAILABLE = 4,
    ERROR_VALIDATION_FAILURE = -1,
    ERROR_RUNTIME_FAILURE = -2,
    ERROR_OUT_OF_MEMORY = -3,
    ERROR_FUNCTION_UNSUPPORTED = -7,
    ERROR_FEATURE_UNSUPPORTED = -8,
    ERROR_EXTENSION_NOT_PRESENT = -9,
    ERROR_HANDLE_INVALID = -12,
    ERROR_INSTANCE_LOST = -13,
    ERROR_SESSION_RUNNING = -14,
    ERROR_SESSION_NOT_RUNNING = -16,
    ERROR_SESSION_LOST = -17,
    ERROR_SYSTEM_INVALID = -18,
    ERROR_PATH_INVALID = -19,
    ERROR_PATH_UNSUPPORTED = -22,
    ERROR_LAYER_INVALID = -23,
    ERROR_SWAPCHAIN_RECT_INVALID = -25,
    ERROR_SWAPCHAIN_FORMAT_UNSUPPORTED = -26,
    ERROR_ACTION_TYPE_MISMATCH = -27,
    ERROR_SESSION_NOT_READY = -28,
    ERROR_SESSION_NOT_STOPPING = -29,
    ERROR_REFERENCE_SPACE_UNSUPPORTED = -31,
    ERROR_CALL_ORDER_INVALID = -37,
    ERROR_FORM_FACTOR_UNAVAILABLE = -40,
    ERROR_VIEW_CONFIGURATION_TYPE_UNSUPPORTED = -41,
    ERROR_ENVIRONMENT_BLEND_MODE_UNSUPPORTED = -42,
    ERROR_NAME_DUPLICATED = -44,
    ERROR_ACTIONSET_NOT_ATTACHED = -46,
    ERROR_ACTIONSETS_ALREADY_ATTACHED = -47,
}

impl ResultCode {
    pub fn is_success(self) -> bool {
        self.0 >= 0
    }
}

impl fmt::Display for ResultCode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "XR_{}", name),
            None => write!(f, "XrResult({})", self.0),
        }
    }
}

/// Errors produced by the session driver and its collaborators.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum Error {
    #[error("{context} failed with {result}")]
    Protocol { result: ResultCode, context: String },
    #[error("no supported view configuration")]
    NoViewConfiguration,
    #[error("no supported environment blend mode")]
    NoBlendMode,
    #[error("no supported swapchain format")]
    NoSwapchainFormat,
    #[error("{operation} is not valid in state {state}")]
    InvalidState {
        operation: &'static str,
        state: String,
    },
    #[error("actions are already attached to the session")]
    ActionsAttached,
    #[error("unknown action {0}")]
    UnknownAction(String),
    #[error("action {0} has a different type")]
    ActionKindMismatch(String),
    #[error("operation cancelled by a stop request")]
    Cancelled,
    #[error("plugin {name}: {message}")]
    Plugin { name: String, message: String },
    #[error("swapchain image {index} out of range ({len} images)")]
    ImageIndex { index: u32, len: usize },
    #[error("{0}")]
    BackendSpecific(String),
}

impl Error {
    /// The runtime result code, if this error came from a runtime call.
    pub fn result(&self) -> Option<ResultCode> {
        match *self {
            Error::Protocol { result, .. } => Some(result),
            _ => None,
        }
    }
}

/// Turns a runtime result into a driver result, naming the call that failed.
pub fn check<T>(result: Result<T, ResultCode>, context: &str) -> Result<T, Error> {
    result.map_err(|result| Error::Protocol {
        result,
        context: context.to_owned(),
    })
}

pub trait ResultExt<T> {
    fn context(self, context: &str) -> Result<T, Error>;
}

impl<T> ResultExt<T> for Result<T, ResultCode> {
    fn context(self, context: &str) -> Result<T, Error> {
        check(self, context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_uses_symbolic_name() {
        assert_eq!(
            ResultCode::ERROR_PATH_UNSUPPORTED.to_string(),
            "XR_ERROR_PATH_UNSUPPORTED"
        );
        assert_eq!(ResultCode(-9999).to_string(), "XrResult(-9999)");
    }

    #[test]
    fn check_wraps_failures() {
        let err = check::<()>(Err(ResultCode::ERROR_SESSION_LOST), "xrBeginFrame").unwrap_err();
        assert_eq!(err.result(), Some(ResultCode::ERROR_SESSION_LOST));
        assert_eq!(
            err.to_string(),
            "xrBeginFrame failed with XR_ERROR_SESSION_LOST"
        );
    }
}
