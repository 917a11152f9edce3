//! Per-key trailing debouncer.
//!
//! Every push (re)arms the key's deadline `window` after the push; a key is
//! released once its deadline passes without another push. Bursts of editor
//! events for one file therefore collapse into a single release carrying the
//! final state of the file.
//!
//! Re-arming is capped: a key is released at the latest `max_wait` after the
//! first push of its burst, so a file rewritten without pause still reloads.

use std::collections::HashMap;
use std::hash::Hash;
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy)]
struct Pending {
    first: Instant,
    deadline: Instant,
}

pub struct Debouncer<K> {
    window: Duration,
    max_wait: Duration,
    pending: HashMap<K, Pending>,
}

impl<K: Eq + Hash + Clone> Debouncer<K> {
    /// Debouncer whose max wait is twice the window.
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            max_wait: window * 2,
            pending: HashMap::new(),
        }
    }

    pub fn with_max_wait(mut self, max_wait: Duration) -> Self {
        self.max_wait = max_wait.max(self.window);
        self
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Schedule `key`, pushing back any deadline it already had up to the
    /// burst's max wait.
    pub fn push(&mut self, key: K, now: Instant) {
        let first = self.pending.get(&key).map_or(now, |p| p.first);
        let deadline = (now + self.window).min(first + self.max_wait);
        self.pending.insert(key, Pending { first, deadline });
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.values().map(|p| p.deadline).min()
    }

    /// Remove and return every key whose deadline is at or before `now`,
    /// earliest first.
    pub fn drain_due(&mut self, now: Instant) -> Vec<K> {
        let mut due: Vec<(Instant, K)> = self
            .pending
            .iter()
            .filter(|(_, p)| p.deadline <= now)
            .map(|(key, p)| (p.deadline, key.clone()))
            .collect();
        due.sort_by_key(|(deadline, _)| *deadline);
        for (_, key) in &due {
            self.pending.remove(key);
        }
        due.into_iter().map(|(_, key)| key).collect()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW: Duration = Duration::from_millis(1000);

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_burst_within_window_releases_once() {
        let t0 = Instant::now();
        let mut d = Debouncer::new(WINDOW);
        d.push("a.json", t0);
        d.push("a.json", t0 + ms(400));

        assert!(d.drain_due(t0 + ms(1000)).is_empty());
        assert_eq!(d.next_deadline(), Some(t0 + ms(1400)));
        assert_eq!(d.drain_due(t0 + ms(1400)), vec!["a.json"]);
        assert!(d.is_empty());
    }

    #[test]
    fn test_events_apart_release_twice() {
        let t0 = Instant::now();
        let mut d = Debouncer::new(WINDOW);
        let mut released = 0;

        d.push("a.json", t0);
        released += d.drain_due(t0 + ms(1000)).len();
        d.push("a.json", t0 + ms(1500));
        released += d.drain_due(t0 + ms(2500)).len();

        assert_eq!(released, 2);
    }

    #[test]
    fn test_keys_are_independent() {
        let t0 = Instant::now();
        let mut d = Debouncer::new(WINDOW);
        d.push("b.html", t0 + ms(10));
        d.push("a.json", t0);

        assert_eq!(d.len(), 2);
        assert_eq!(d.next_deadline(), Some(t0 + ms(1000)));
        assert_eq!(d.drain_due(t0 + ms(1000)), vec!["a.json"]);
        assert_eq!(d.drain_due(t0 + ms(2000)), vec!["b.html"]);
    }

    #[test]
    fn test_continuous_rewrites_release_at_max_wait() {
        let t0 = Instant::now();
        let mut d = Debouncer::new(WINDOW);
        let mut released = Vec::new();

        // One event every 500ms never leaves a quiet window.
        for step in 0..9u64 {
            let now = t0 + ms(step * 500);
            released.extend(d.drain_due(now).into_iter().map(|k| (k, now)));
            d.push("a.json", now);
        }

        assert_eq!(
            released,
            vec![("a.json", t0 + ms(2000)), ("a.json", t0 + ms(4000))]
        );
    }

    #[test]
    fn test_max_wait_is_never_below_window() {
        let t0 = Instant::now();
        let mut d = Debouncer::new(WINDOW).with_max_wait(ms(10));
        d.push("a.json", t0);
        assert_eq!(d.next_deadline(), Some(t0 + WINDOW));
    }
}
