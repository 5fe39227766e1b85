//! Standard exit codes for CLI operations
//!
//! These exit codes follow Unix conventions and sysexits.h where applicable.

/// General error - unspecified failure
pub const ERROR: i32 = 1;

/// Repository error - unknown, duplicate or unreadable repository
pub const REPO_ERROR: i32 = 2;

/// Git error - clone, reset or pull failed
pub const GIT_ERROR: i32 = 3;

/// Install error - cog, library or pip installation failed
pub const INSTALL_ERROR: i32 = 4;

/// IO error - file not found, permission denied, etc.
pub const IO_ERROR: i32 = 5;

/// Usage error - invalid arguments or options (following sysexits.h convention)
pub const USAGE_ERROR: i32 = 64;

/// Configuration error (following sysexits.h convention)
pub const CONFIG_ERROR: i32 = 78;
