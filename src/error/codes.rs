/// Error code registry for augmentflow
///
/// Error codes are organized by category:
/// - 1000-1999: Prompt parse errors
/// - 2000-2999: Validation errors
/// - 3000-3999: Transform execution errors
/// - 4000-4999: Optional stage errors
/// - 5000-5999: Pipeline timeout and cancellation
/// - 6000-6999: Configuration errors
/// - 7000-7999: Mandatory stage errors
/// - 9000-9999: Other errors
pub struct ErrorCode;

impl ErrorCode {
    // Parse errors (1000-1999)
    pub const PARSE_GENERIC: u16 = 1000;
    pub const PARSE_EMPTY_PROMPT: u16 = 1001;
    pub const PARSE_NO_MATCH: u16 = 1002;

    // Validation errors (2000-2999)
    pub const VALIDATION_GENERIC: u16 = 2000;
    pub const VALIDATION_INVALID_TYPE: u16 = 2001;
    pub const VALIDATION_CROP_TOO_LARGE: u16 = 2002;
    pub const VALIDATION_INVALID_RANGE: u16 = 2003;
    pub const VALIDATION_EMPTY_PIPELINE: u16 = 2004;
    pub const VALIDATION_TOO_MANY_TRANSFORMS: u16 = 2005;
    pub const VALIDATION_PROMPT_TOO_LONG: u16 = 2006;
    pub const VALIDATION_SUSPICIOUS_INPUT: u16 = 2007;
    pub const VALIDATION_UNKNOWN_PRESET: u16 = 2008;
    pub const VALIDATION_MISSING_INPUT: u16 = 2009;

    // Transform execution errors (3000-3999)
    pub const TRANSFORM_GENERIC: u16 = 3000;
    pub const TRANSFORM_ENGINE_FAILED: u16 = 3001;
    pub const TRANSFORM_ENGINE_TIMEOUT: u16 = 3002;

    // Optional stage errors (4000-4999)
    pub const OPTIONAL_STAGE_GENERIC: u16 = 4000;
    pub const OPTIONAL_STAGE_TIMEOUT: u16 = 4001;
    pub const OPTIONAL_STAGE_ABORTED: u16 = 4002;
    pub const OPTIONAL_SERVICE_FAILED: u16 = 4003;

    // Timeout and cancellation (5000-5999)
    pub const TIMEOUT_GENERIC: u16 = 5000;
    pub const TIMEOUT_RUN_DEADLINE: u16 = 5001;
    pub const RUN_CANCELLED: u16 = 5002;

    // Configuration errors (6000-6999)
    pub const CONFIG_GENERIC: u16 = 6000;
    pub const CONFIG_NOT_FOUND: u16 = 6001;
    pub const CONFIG_INVALID_TOML: u16 = 6002;
    pub const CONFIG_INVALID_VALUE: u16 = 6003;
    pub const CONFIG_INVALID_HOOK: u16 = 6004;

    // Mandatory stage errors (7000-7999)
    pub const STAGE_GENERIC: u16 = 7000;
    pub const STAGE_HOOK_FAILED: u16 = 7001;
    pub const STAGE_HOOK_TIMEOUT: u16 = 7002;
    pub const STAGE_ABORTED: u16 = 7003;
    pub const STAGE_HOOK_PANICKED: u16 = 7004;

    // Other errors (9000-9999)
    pub const OTHER_GENERIC: u16 = 9000;
    pub const OTHER_IO: u16 = 9001;
    pub const OTHER_SERIALIZATION: u16 = 9002;
    pub const OTHER_INTERNAL_ERROR: u16 = 9004;
}

/// Get a human-readable description for an error code
pub fn describe_error_code(code: u16) -> &'static str {
    match code {
        1000 => "Generic prompt parse error",
        1001 => "Prompt is empty",
        1002 => "No recognizable transform in prompt",

        2000 => "Generic validation error",
        2001 => "Parameter has an invalid type",
        2002 => "Crop size exceeds the maximum image dimension",
        2003 => "Parameter range is inverted",
        2004 => "Pipeline has no transforms",
        2005 => "Pipeline has too many transforms",
        2006 => "Prompt exceeds the maximum length",
        2007 => "Input contains a suspicious pattern",
        2008 => "Unknown preset",
        2009 => "Required input is missing",

        3000 => "Generic transform execution error",
        3001 => "Transform engine failed",
        3002 => "Transform engine timed out",

        4000 => "Generic optional stage error",
        4001 => "Optional stage timed out",
        4002 => "Optional stage aborted",
        4003 => "Optional service failed",

        5000 => "Generic pipeline timeout",
        5001 => "Pipeline exceeded its run deadline",
        5002 => "Pipeline run was cancelled",

        6000 => "Generic configuration error",
        6001 => "Configuration file not found",
        6002 => "Invalid TOML in configuration",
        6003 => "Invalid value in configuration",
        6004 => "Malformed hook registration",

        7000 => "Generic stage error",
        7001 => "Hook failed in a mandatory stage",
        7002 => "Hook timed out in a mandatory stage",
        7003 => "Hook aborted a mandatory stage",
        7004 => "Hook panicked",

        9000 => "Generic error",
        9001 => "I/O error",
        9002 => "Serialization error",
        9004 => "Internal error",

        _ => "Unknown error code",
    }
}
