/// Error code registry for the supervisor
///
/// Error codes are organized by category:
/// - 1000-1999: Setup and configuration errors
/// - 2000-2999: Registry errors
/// - 4000-4999: Execution errors
/// - 6000-6999: Metadata errors
pub struct ErrorCode;

impl ErrorCode {
    // Setup and configuration errors (1000-1999)
    pub const SETUP_NOT_INITIALIZED: u16 = 1001;
    pub const SETUP_BINARY_MISSING: u16 = 1002;
    pub const SETUP_IO_ERROR: u16 = 1003;
    pub const CONFIG_INVALID_VALUE: u16 = 1005;
    pub const CONFIG_PARSE_ERROR: u16 = 1007;

    // Registry errors (2000-2999)
    pub const REGISTRY_DUPLICATE_ID: u16 = 2002;

    // Execution errors (4000-4999)
    pub const EXEC_COMMAND_NOT_FOUND: u16 = 4001;
    pub const EXEC_TOOL_FAILED: u16 = 4003;
    pub const EXEC_SIGNAL_RECEIVED: u16 = 4005;
    pub const EXEC_INTERRUPTED: u16 = 4006;
    pub const EXEC_SPAWN_FAILED: u16 = 4007;
    pub const EXEC_OUTPUT_ERROR: u16 = 4008;
    pub const EXEC_CANCELED: u16 = 4011;

    // Metadata errors (6000-6999)
    pub const METADATA_DECODE_FAILED: u16 = 6001;
}

/// Get a human-readable description for an error code
pub fn describe_error_code(code: u16) -> &'static str {
    match code {
        // Setup and configuration errors
        1001 => "Runtime layout has not been initialized",
        1002 => "Bundled binary is missing",
        1003 => "I/O error while preparing the runtime layout",
        1005 => "Invalid value in configuration",
        1007 => "Failed to parse configuration",

        // Registry errors
        2002 => "Identifier is already running",

        // Execution errors
        4001 => "Command not found",
        4003 => "Extraction tool failed",
        4005 => "Process received signal",
        4006 => "Invocation interrupted while waiting",
        4007 => "Failed to spawn subprocess",
        4008 => "Process output unavailable",
        4011 => "Invocation canceled",

        // Metadata errors
        6001 => "Failed to decode metadata document",

        _ => "Unknown error code",
    }
}
