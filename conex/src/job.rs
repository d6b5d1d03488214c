//! The progress/cancellation host contract.
//!
//! Extraction runs as one cooperative batch task. It polls [`Job::is_cancelled`]
//! at checkpoints between pipeline stages and reports coarse progress; it
//! never spawns threads or installs timeouts of its own.

/// A handle to the host driving an extraction run.
pub trait Job {
    /// Reports fractional progress, in percent of the current cell.
    fn set_progress(&mut self, percent: u8) {
        let _ = percent;
    }

    /// Reports a human-readable status message.
    fn set_status(&mut self, status: &str) {
        let _ = status;
    }

    /// Polled cooperatively between pipeline stages. Returning `true` aborts
    /// the remaining stages for the current cell.
    fn is_cancelled(&mut self) -> bool {
        false
    }
}

/// A host that never cancels and discards progress.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoJob;

impl Job for NoJob {}

/// A scripted host for tests: records status/progress and cancels after a
/// fixed number of cancellation polls.
#[derive(Debug, Default, Clone)]
pub struct ScriptedJob {
    /// Cancel once this many polls have occurred; `None` never cancels.
    pub cancel_after: Option<usize>,
    /// The number of cancellation polls observed so far.
    pub polls: usize,
    /// All status messages reported, in order.
    pub statuses: Vec<String>,
    /// All progress values reported, in order.
    pub progress: Vec<u8>,
}

impl ScriptedJob {
    /// Creates a host that cancels at the `n`-th cancellation poll.
    pub fn cancel_at(n: usize) -> Self {
        Self {
            cancel_after: Some(n),
            ..Default::default()
        }
    }
}

impl Job for ScriptedJob {
    fn set_progress(&mut self, percent: u8) {
        self.progress.push(percent);
    }

    fn set_status(&mut self, status: &str) {
        self.statuses.push(status.to_string());
    }

    fn is_cancelled(&mut self) -> bool {
        self.polls += 1;
        match self.cancel_after {
            Some(n) => self.polls > n,
            None => false,
        }
    }
}
