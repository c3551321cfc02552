pub mod extract;
pub mod logger;
pub mod probe;
pub mod request;
pub mod result;

#[cfg(test)]
pub mod test_server;

pub mod prelude {
    pub use super::logger::{LogProbeLogger, ProbeLogger};
    pub use super::probe::{SentryProber, build_client};
    pub use super::result::ProbeOutcome;
}

use std::fmt::Write;

pub fn report(mut err: &(dyn std::error::Error + 'static)) -> String {
    let mut s = format!("{}", err);
    while let Some(src) = err.source() {
        let _ = write!(s, "\n\nCaused by: {}", src);
        err = src;
    }
    s
}
