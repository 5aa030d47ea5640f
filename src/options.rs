//! Relay, native host and page client configuration.
//!
//! Provides type-safe builders for the three configurable pieces of the
//! relay chain.
//!
//! # Example
//!
//! ```ignore
//! use webcard_relay::{ClientOptions, NativeHostOptions, RelayOptions};
//!
//! let host = NativeHostOptions::new("/usr/lib/webcard/webcard")
//!     .with_max_frame_len(64 * 1024);
//! host.validate()?;
//!
//! let relay = RelayOptions::new().with_extension_version("0.3.1");
//! let client = ClientOptions::new().with_max_pending(16);
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::path::PathBuf;

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Registered native messaging host name.
pub const DEFAULT_HOST_NAME: &str = "org.cardid.webcard.native";

/// Largest frame a browser accepts from a native host (1 MiB).
pub const DEFAULT_MAX_FRAME_LEN: usize = 1024 * 1024;

/// Prefix of the alert sent when the native host drops with an error.
pub const DEFAULT_ALERT_PREFIX: &str = "NativeApp disconnected";

/// Maximum pending calls per page client.
pub const DEFAULT_MAX_PENDING: usize = 100;

// ============================================================================
// RelayOptions
// ============================================================================

/// Relay behavior options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayOptions {
    /// Version stamped into get version replies as `verExt`.
    pub extension_version: String,

    /// Text placed before the native error reason in alerts.
    pub alert_prefix: String,
}

impl Default for RelayOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl RelayOptions {
    /// Creates options with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self {
            extension_version: env!("CARGO_PKG_VERSION").to_string(),
            alert_prefix: DEFAULT_ALERT_PREFIX.to_string(),
        }
    }

    /// Sets the reported extension version.
    #[inline]
    #[must_use]
    pub fn with_extension_version(mut self, version: impl Into<String>) -> Self {
        self.extension_version = version.into();
        self
    }

    /// Sets the alert prefix.
    #[inline]
    #[must_use]
    pub fn with_alert_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.alert_prefix = prefix.into();
        self
    }

    /// Formats the alert text for a disconnect reason.
    #[must_use]
    pub fn alert_text(&self, reason: &str) -> String {
        format!("{}: {reason}", self.alert_prefix)
    }
}

// ============================================================================
// NativeHostOptions
// ============================================================================

/// How to launch and frame the native host process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeHostOptions {
    /// Path to the native host executable.
    pub program: PathBuf,

    /// Registered host name, passed as the first argument.
    pub host_name: String,

    /// Additional command-line arguments.
    pub args: Vec<String>,

    /// Largest inbound frame accepted from the host.
    pub max_frame_len: usize,
}

impl NativeHostOptions {
    /// Creates options for the given executable.
    #[must_use]
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            host_name: DEFAULT_HOST_NAME.to_string(),
            args: Vec::new(),
            max_frame_len: DEFAULT_MAX_FRAME_LEN,
        }
    }

    /// Sets the registered host name.
    #[inline]
    #[must_use]
    pub fn with_host_name(mut self, name: impl Into<String>) -> Self {
        self.host_name = name.into();
        self
    }

    /// Adds a command-line argument.
    #[inline]
    #[must_use]
    pub fn with_arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Adds multiple command-line arguments.
    #[inline]
    #[must_use]
    pub fn with_args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Sets the inbound frame ceiling.
    #[inline]
    #[must_use]
    pub fn with_max_frame_len(mut self, len: usize) -> Self {
        self.max_frame_len = len;
        self
    }

    /// Returns the full argument list handed to the child process.
    #[must_use]
    pub fn to_args(&self) -> Vec<String> {
        let mut args = Vec::with_capacity(1 + self.args.len());
        args.push(self.host_name.clone());
        args.extend(self.args.iter().cloned());
        args
    }

    /// Validates the options.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the program path is empty, the host name
    /// is empty, or the frame ceiling is zero or does not fit the 32-bit
    /// length prefix.
    pub fn validate(&self) -> Result<()> {
        if self.program.as_os_str().is_empty() {
            return Err(Error::config("Native host program path is empty"));
        }
        if self.host_name.is_empty() {
            return Err(Error::config("Native host name is empty"));
        }
        if self.max_frame_len == 0 || u32::try_from(self.max_frame_len).is_err() {
            return Err(Error::config(format!(
                "Frame length ceiling must be in 1..={}, got {}",
                u32::MAX,
                self.max_frame_len
            )));
        }
        Ok(())
    }
}

// ============================================================================
// ClientOptions
// ============================================================================

/// Page client options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientOptions {
    /// Calls allowed to await replies at once.
    pub max_pending: usize,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl ClientOptions {
    /// Creates options with default settings.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            max_pending: DEFAULT_MAX_PENDING,
        }
    }

    /// Sets the pending call ceiling.
    #[inline]
    #[must_use]
    pub const fn with_max_pending(mut self, max: usize) -> Self {
        self.max_pending = max;
        self
    }

    /// Validates the options.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if `max_pending` is zero.
    pub fn validate(&self) -> Result<()> {
        if self.max_pending == 0 {
            return Err(Error::config("max_pending must be greater than zero"));
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relay_defaults() {
        let options = RelayOptions::new();
        assert_eq!(options.extension_version, env!("CARGO_PKG_VERSION"));
        assert_eq!(
            options.alert_text("Native host has exited."),
            "NativeApp disconnected: Native host has exited."
        );
    }

    #[test]
    fn test_relay_builder_chain() {
        let options = RelayOptions::new()
            .with_extension_version("9.9.9")
            .with_alert_prefix("Lost");
        assert_eq!(options.extension_version, "9.9.9");
        assert_eq!(options.alert_text("x"), "Lost: x");
    }

    #[test]
    fn test_host_to_args() {
        let options = NativeHostOptions::new("/opt/webcard")
            .with_arg("--verbose")
            .with_args(["--a", "--b"]);
        assert_eq!(
            options.to_args(),
            vec![DEFAULT_HOST_NAME, "--verbose", "--a", "--b"]
        );
    }

    #[test]
    fn test_host_validate() {
        assert!(NativeHostOptions::new("/opt/webcard").validate().is_ok());
        assert!(NativeHostOptions::new("").validate().is_err());
        assert!(
            NativeHostOptions::new("/opt/webcard")
                .with_host_name("")
                .validate()
                .is_err()
        );
        assert!(
            NativeHostOptions::new("/opt/webcard")
                .with_max_frame_len(0)
                .validate()
                .is_err()
        );
    }

    #[test]
    fn test_client_options() {
        assert_eq!(ClientOptions::default().max_pending, DEFAULT_MAX_PENDING);
        assert!(ClientOptions::new().with_max_pending(0).validate().is_err());
        assert!(ClientOptions::new().with_max_pending(1).validate().is_ok());
    }
}
