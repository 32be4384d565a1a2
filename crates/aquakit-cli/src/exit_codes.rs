/// Process exit codes shared by all subcommands.
pub const OK: i32 = 0;
/// At least one image failed to analyze; successes were still recorded.
pub const PARTIAL_FAILURE: i32 = 1;
/// Invalid credentials or setup; nothing was attempted.
pub const CONFIG_ERROR: i32 = 2;
