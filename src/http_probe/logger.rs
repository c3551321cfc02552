/// Where the prober reports failed sub-requests.
pub trait ProbeLogger: Send + Sync {
    /// A request was sent but failed or was rejected.
    fn warn(&self, message: &str, path: &str);

    /// A request could not be built.
    fn error(&self, message: &str, path: &str);
}

/// Forwards to the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogProbeLogger;

impl ProbeLogger for LogProbeLogger {
    fn warn(&self, message: &str, path: &str) {
        log::warn!("{} for {}", message, path);
    }

    fn error(&self, message: &str, path: &str) {
        log::error!("{} for {}", message, path);
    }
}
