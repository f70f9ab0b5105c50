use crate::error::Stage;

/// Receives human-readable narration of a build
///
/// Stage transitions and fatal conditions arrive as exactly one `say` or
/// `error` call each. `progress` is called on every pending poll and may
/// be rendered as a spinner or dropped.
pub trait ProgressSink: Send + Sync {
    fn say(&self, message: &str);

    fn error(&self, message: &str);

    fn progress(&self, stage: Stage, percent: Option<u8>, message: &str);
}

/// Sink that forwards everything to `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl ProgressSink for TracingSink {
    fn say(&self, message: &str) {
        tracing::info!("{}", message);
    }

    fn error(&self, message: &str) {
        tracing::error!("{}", message);
    }

    fn progress(&self, stage: Stage, percent: Option<u8>, message: &str) {
        match percent {
            Some(p) => tracing::debug!(%stage, "{} ({}%)", message, p),
            None => tracing::debug!(%stage, "{}", message),
        }
    }
}
