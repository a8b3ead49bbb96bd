use super::{HostPage, Locator, NodeId};
use std::time::Duration;
use tokio::time::Instant;

pub const DEFAULT_WAIT_TIMEOUT: Duration = Duration::from_millis(2000);
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// How long to wait for an element and how often to look
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitPolicy {
    pub timeout: Duration,
    pub poll_interval: Duration,
}

impl Default for WaitPolicy {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_WAIT_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    Found(NodeId),
    TimedOut,
}

/// Poll `locator` under `scope` until it matches or the policy's timeout elapses
///
/// The locator is always checked at least once, so a zero timeout is a plain lookup.
pub async fn wait_for(
    page: &dyn HostPage,
    scope: NodeId,
    locator: &Locator,
    policy: WaitPolicy,
) -> WaitOutcome {
    let deadline = Instant::now() + policy.timeout;
    let interval = policy.poll_interval.max(Duration::from_millis(1));

    loop {
        if let Some(node) = locator.find(page, scope) {
            return WaitOutcome::Found(node);
        }
        let now = Instant::now();
        if now >= deadline {
            tracing::debug!(what = locator.name(), waited = ?policy.timeout, "Wait timed out");
            return WaitOutcome::TimedOut;
        }
        tokio::time::sleep(interval.min(deadline - now)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::{MemoryPage, Selector};
    use std::sync::Arc;

    fn edit_button() -> Locator {
        Locator::single("edit button", Selector::new(".editableContent-editButton"))
    }

    #[tokio::test(start_paused = true)]
    async fn test_times_out_after_policy_timeout() {
        let page = MemoryPage::new();
        let started = Instant::now();
        let outcome = wait_for(&page, page.root(), &edit_button(), WaitPolicy::default()).await;
        assert_eq!(outcome, WaitOutcome::TimedOut);
        assert!(started.elapsed() >= DEFAULT_WAIT_TIMEOUT);
        assert!(started.elapsed() < DEFAULT_WAIT_TIMEOUT + DEFAULT_POLL_INTERVAL);
    }

    #[tokio::test(start_paused = true)]
    async fn test_finds_element_that_appears_later() {
        let page = Arc::new(MemoryPage::new());
        let body = page.body();

        let writer = page.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(300)).await;
            writer.append_element(body, "button", &["editableContent-editButton"], None);
        });

        let outcome = wait_for(&*page, page.root(), &edit_button(), WaitPolicy::default()).await;
        assert!(matches!(outcome, WaitOutcome::Found(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_timeout_still_looks_once() {
        let page = MemoryPage::new();
        let button = page.append_element(page.body(), "button", &["editableContent-editButton"], None);
        let policy = WaitPolicy {
            timeout: Duration::ZERO,
            ..WaitPolicy::default()
        };
        assert_eq!(
            wait_for(&page, page.root(), &edit_button(), policy).await,
            WaitOutcome::Found(button)
        );
    }
}
