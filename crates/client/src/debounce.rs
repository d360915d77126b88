//! Search-as-you-type debouncing.
//!
//! Keystrokes are buffered and a term is committed only after `window` of
//! quiet. [`SearchDebouncer`] is the clock-driven core; [`spawn_debouncer`]
//! wraps it in a tokio task over channels.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::Instant;

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

#[derive(Debug)]
pub struct SearchDebouncer {
    window: Duration,
    pending: Option<(String, Instant)>,
}

impl Default for SearchDebouncer {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE)
    }
}

impl SearchDebouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            pending: None,
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Record a keystroke; restarts the quiet period.
    pub fn input(&mut self, term: impl Into<String>, now: Instant) {
        self.pending = Some((term.into(), now));
    }

    /// When the pending term becomes due, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|(_, at)| *at + self.window)
    }

    /// Take the pending term once its quiet period has elapsed.
    pub fn poll(&mut self, now: Instant) -> Option<String> {
        match self.deadline() {
            Some(due) if now >= due => self.pending.take().map(|(term, _)| term),
            _ => None,
        }
    }

    /// Take whatever is pending regardless of the clock.
    pub fn flush(&mut self) -> Option<String> {
        self.pending.take().map(|(term, _)| term)
    }
}

/// Forward debounced terms from `input` to the returned receiver.
///
/// The task ends when `input` closes (after flushing the last term) or the
/// receiver is dropped.
pub fn spawn_debouncer(
    mut input: mpsc::Receiver<String>,
    window: Duration,
) -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel(16);
    tokio::spawn(async move {
        let mut debouncer = SearchDebouncer::new(window);
        loop {
            let committed = match debouncer.deadline() {
                Some(due) => tokio::select! {
                    next = input.recv() => match next {
                        Some(term) => {
                            debouncer.input(term, Instant::now());
                            None
                        }
                        None => {
                            if let Some(term) = debouncer.flush() {
                                let _ = tx.send(term).await;
                            }
                            break;
                        }
                    },
                    _ = tokio::time::sleep_until(due) => debouncer.poll(Instant::now()),
                },
                None => match input.recv().await {
                    Some(term) => {
                        debouncer.input(term, Instant::now());
                        None
                    }
                    None => break,
                },
            };
            if let Some(term) = committed {
                tracing::debug!(term = %term, "search term committed");
                if tx.send(term).await.is_err() {
                    break;
                }
            }
        }
    });
    rx
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rapid_input_commits_only_the_last_term() {
        let start = Instant::now();
        let mut debouncer = SearchDebouncer::default();
        debouncer.input("a", start);
        debouncer.input("ab", start + Duration::from_millis(100));
        debouncer.input("abc", start + Duration::from_millis(200));

        assert_eq!(debouncer.poll(start + Duration::from_millis(400)), None);
        assert_eq!(
            debouncer.poll(start + Duration::from_millis(500)).as_deref(),
            Some("abc")
        );
        assert_eq!(debouncer.poll(start + Duration::from_secs(5)), None);
    }

    #[test]
    fn nothing_pending_means_no_deadline() {
        let mut debouncer = SearchDebouncer::new(Duration::from_millis(50));
        assert!(debouncer.deadline().is_none());
        assert!(debouncer.flush().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn task_commits_once_per_quiet_period() {
        let (tx, rx) = mpsc::channel(16);
        let mut out = spawn_debouncer(rx, DEFAULT_DEBOUNCE);

        for term in ["a", "ab", "abc"] {
            tx.send(term.to_string()).await.unwrap();
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        assert_eq!(out.recv().await.as_deref(), Some("abc"));

        tx.send("lamp".to_string()).await.unwrap();
        drop(tx);
        assert_eq!(out.recv().await.as_deref(), Some("lamp"));
        assert_eq!(out.recv().await, None);
    }
}
