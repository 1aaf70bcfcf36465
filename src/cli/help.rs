//! Logging verbosity helpers

/// Filter directive for a `-v` count
pub fn get_log_level(verbose: u8) -> &'static str {
    match verbose {
        0 => "info",
        1 => "debug",
        2 => "trace",
        _ => "trace,aws_smithy_runtime=debug,hyper=debug", // -vvv includes the SDK transport
    }
}
