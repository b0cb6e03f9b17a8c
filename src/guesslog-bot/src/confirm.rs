//! Pending-confirmation tracking for destructive commands.

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::{Mutex, oneshot};

/// How long a confirmation may take to arrive.
pub const CONFIRMATION_WINDOW: Duration = Duration::from_secs(30);

/// Tracks users who have a destructive action awaiting a typed `yes`.
///
/// Arming registers the user and hands back an [`ArmedConfirmation`]; a
/// matching chat message from that user fires it. The arming side waits
/// with a bounded window, so an intent that is never confirmed simply
/// lapses with no side effects. Arming again replaces the previous
/// intent, and every intent carries a generation: only the generation
/// that expired may remove its own entry, so a superseded waiter can
/// never take down its replacement.
#[derive(Default)]
pub struct ConfirmationGate {
    state: Mutex<GateState>,
}

#[derive(Default)]
struct GateState {
    next_generation: u64,
    pending: HashMap<u64, PendingIntent>,
}

struct PendingIntent {
    generation: u64,
    sender: oneshot::Sender<()>,
}

/// One armed intent, held by the command waiting on it.
pub struct ArmedConfirmation<'a> {
    gate: &'a ConfirmationGate,
    user_id: u64,
    generation: u64,
    receiver: oneshot::Receiver<()>,
}

impl ConfirmationGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm a confirmation for one user, replacing any previous intent.
    pub async fn arm(&self, user_id: u64) -> ArmedConfirmation<'_> {
        let (sender, receiver) = oneshot::channel();
        let mut state = self.state.lock().await;
        state.next_generation += 1;
        let generation = state.next_generation;
        state.pending.insert(user_id, PendingIntent { generation, sender });
        ArmedConfirmation { gate: self, user_id, generation, receiver }
    }

    /// Feed one chat message through the gate.
    ///
    /// Fires the pending intent when the author has one armed and the
    /// text is an affirmation. Returns whether an intent was resolved.
    pub async fn confirm(&self, user_id: u64, text: &str) -> bool {
        if !is_affirmation(text) {
            return false;
        }
        let intent = self.state.lock().await.pending.remove(&user_id);
        match intent {
            Some(intent) => intent.sender.send(()).is_ok(),
            None => false,
        }
    }

    /// Drop one generation's intent after its window expired. A newer
    /// intent armed for the same user stays in place.
    async fn expire(&self, user_id: u64, generation: u64) {
        let mut state = self.state.lock().await;
        if state.pending.get(&user_id).is_some_and(|intent| intent.generation == generation) {
            state.pending.remove(&user_id);
        }
    }
}

impl ArmedConfirmation<'_> {
    /// Wait for the confirmation until the window closes.
    ///
    /// Returns `false` when the window elapses or when a newer intent
    /// replaced this one. Only expiry touches the gate; the replacement
    /// keeps its own window.
    pub async fn confirmed_within(self, window: Duration) -> bool {
        match tokio::time::timeout(window, self.receiver).await {
            Ok(Ok(())) => true,
            Ok(Err(_)) => false,
            Err(_) => {
                self.gate.expire(self.user_id, self.generation).await;
                false
            }
        }
    }
}

/// The confirmation word is a literal `yes`, any case, surrounding
/// whitespace ignored. Nothing looser counts.
fn is_affirmation(text: &str) -> bool {
    text.trim().eq_ignore_ascii_case("yes")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_affirmation_forms() {
        assert!(is_affirmation("yes"));
        assert!(is_affirmation("YES"));
        assert!(is_affirmation("  Yes  "));
        assert!(!is_affirmation("yes please"));
        assert!(!is_affirmation("no"));
        assert!(!is_affirmation(""));
    }

    #[tokio::test]
    async fn test_confirm_fires_armed_receiver() {
        let gate = ConfirmationGate::new();
        let intent = gate.arm(1).await;

        assert!(gate.confirm(1, "yes").await);
        assert!(intent.receiver.await.is_ok());
    }

    #[tokio::test]
    async fn test_confirm_requires_matching_user() {
        let gate = ConfirmationGate::new();
        let intent = gate.arm(1).await;

        assert!(!gate.confirm(2, "yes").await);
        // The original intent is still armed.
        assert!(gate.confirm(1, "yes").await);
        assert!(intent.receiver.await.is_ok());
    }

    #[tokio::test]
    async fn test_non_affirmation_leaves_intent_armed() {
        let gate = ConfirmationGate::new();
        let intent = gate.arm(1).await;

        assert!(!gate.confirm(1, "maybe").await);
        assert!(gate.confirm(1, "YES").await);
        assert!(intent.receiver.await.is_ok());
    }

    #[tokio::test]
    async fn test_confirm_without_armed_intent() {
        let gate = ConfirmationGate::new();
        assert!(!gate.confirm(1, "yes").await);
    }

    #[tokio::test]
    async fn test_rearming_replaces_previous_intent() {
        let gate = ConfirmationGate::new();
        let old = gate.arm(1).await;
        let new = gate.arm(1).await;

        assert!(gate.confirm(1, "yes").await);
        assert!(new.receiver.await.is_ok());
        // The replaced sender was dropped, so the old receiver errors.
        assert!(old.receiver.await.is_err());
    }

    #[tokio::test]
    async fn test_superseded_waiter_cannot_expire_replacement() {
        let gate = ConfirmationGate::new();
        let first = gate.arm(1).await;
        let second = gate.arm(1).await;

        // The superseded waiter resolves immediately; it must leave the
        // replacement's entry alone.
        assert!(!first.confirmed_within(CONFIRMATION_WINDOW).await);
        assert!(gate.confirm(1, "yes").await);
        assert!(second.receiver.await.is_ok());
    }

    #[tokio::test]
    async fn test_expire_ignores_stale_generation() {
        let gate = ConfirmationGate::new();
        let first = gate.arm(1).await;
        let second = gate.arm(1).await;

        gate.expire(first.user_id, first.generation).await;

        assert!(gate.confirm(1, "yes").await);
        assert!(second.receiver.await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_unconfirmed_intent_expires() {
        let gate = ConfirmationGate::new();
        let intent = gate.arm(1).await;

        assert!(!intent.confirmed_within(CONFIRMATION_WINDOW).await);
        // The window closed and took the intent with it.
        assert!(!gate.confirm(1, "yes").await);
    }
}
