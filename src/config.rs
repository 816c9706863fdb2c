// ABOUTME: Configuration and constants for the SST interpreter

#[allow(dead_code)]
pub const VERSION: &str = "0.1.0";

/// Entry file read when no script path is given on the command line.
pub const DEFAULT_ENTRY_FILE: &str = "main.sst";

/// Extension appended to a bare module name by `use`.
pub const MODULE_EXTENSION: &str = "sst";
