use std::collections::{HashMap, HashSet};

use super::conversation::{ConversationKey, Turn, TurnId};

/// Ordered turns per conversation, keyed by provisional or durable key
#[derive(Debug, Clone, Default)]
pub struct MessageStore {
    threads: HashMap<ConversationKey, Vec<Turn>>,
    loading: HashSet<ConversationKey>,
    errors: HashMap<ConversationKey, String>,
}

impl MessageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every turn held for a conversation, active or not
    pub fn turns(&self, key: &ConversationKey) -> &[Turn] {
        self.threads.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Keys of every thread held, staging areas included
    pub fn keys(&self) -> impl Iterator<Item = &ConversationKey> {
        self.threads.keys()
    }

    pub fn contains(&self, key: &ConversationKey) -> bool {
        self.threads.contains_key(key)
    }

    pub fn len(&self, key: &ConversationKey) -> usize {
        self.turns(key).len()
    }

    pub fn is_loading(&self, key: &ConversationKey) -> bool {
        self.loading.contains(key)
    }

    pub fn error(&self, key: &ConversationKey) -> Option<&str> {
        self.errors.get(key).map(String::as_str)
    }

    pub fn begin_load(&mut self, key: &ConversationKey) {
        self.loading.insert(key.clone());
    }

    /// Record a failed load. Previously loaded turns stay in place.
    pub fn fail_load(&mut self, key: &ConversationKey, message: impl Into<String>) {
        self.loading.remove(key);
        self.errors.insert(key.clone(), message.into());
    }

    /// Replace a thread wholesale with a loaded one.
    ///
    /// Provisional turns staged on the thread (a send in flight) are kept at
    /// the tail so reconciliation still finds them.
    pub fn replace(&mut self, key: &ConversationKey, turns: Vec<Turn>) {
        let staged: Vec<Turn> = self
            .threads
            .remove(key)
            .unwrap_or_default()
            .into_iter()
            .filter(|turn| turn.id.is_provisional())
            .collect();

        let mut thread: Vec<Turn> = turns.into_iter().filter(|turn| turn.active).collect();
        thread.extend(staged);

        self.threads.insert(key.clone(), thread);
        self.loading.remove(key);
        self.errors.remove(key);
    }

    pub fn append(&mut self, key: &ConversationKey, turn: Turn) {
        self.threads.entry(key.clone()).or_default().push(turn);
    }

    pub fn remove_turn(&mut self, key: &ConversationKey, id: &TurnId) -> Option<Turn> {
        let thread = self.threads.get_mut(key)?;
        let index = thread.iter().position(|turn| turn.id == *id)?;
        Some(thread.remove(index))
    }

    /// Drop a thread entirely, along with its load flags
    pub fn discard(&mut self, key: &ConversationKey) -> Option<Vec<Turn>> {
        self.loading.remove(key);
        self.errors.remove(key);
        self.threads.remove(key)
    }

    /// Move every turn under `from` to `to`, appending after anything already
    /// held under `to`. The source key leaves no residual entry.
    pub fn rekey(&mut self, from: &ConversationKey, to: &ConversationKey) {
        if from == to {
            return;
        }
        let Some(moved) = self.discard(from) else {
            return;
        };

        let thread = self.threads.entry(to.clone()).or_default();
        thread.extend(moved.into_iter().map(|turn| Turn {
            conversation: to.clone(),
            ..turn
        }));
    }

    /// Discard every turn at or after `marker`, except `keep`.
    ///
    /// Returns the number of discarded turns, or `None` when the marker is not
    /// in the thread.
    pub fn discard_from(
        &mut self,
        key: &ConversationKey,
        marker: &TurnId,
        keep: &TurnId,
    ) -> Option<usize> {
        let thread = self.threads.get_mut(key)?;
        let cut = thread.iter().position(|turn| turn.id == *marker)?;

        let before = thread.len();
        let mut index = 0;
        thread.retain(|turn| {
            let retained = index < cut || turn.id == *keep;
            index += 1;
            retained
        });
        Some(before - thread.len())
    }

    /// Retag a provisional turn with the durable id the backend assigned
    pub fn confirm_turn(&mut self, key: &ConversationKey, provisional: &TurnId, durable: TurnId) {
        if let Some(turn) = self
            .threads
            .get_mut(key)
            .and_then(|thread| thread.iter_mut().find(|turn| turn.id == *provisional))
        {
            turn.id = durable;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Role;
    use pretty_assertions::assert_eq;

    fn thread(key: &str, ids: &[&str]) -> Vec<Turn> {
        ids.iter()
            .enumerate()
            .map(|(i, id)| {
                let role = if i % 2 == 0 { Role::User } else { Role::Assistant };
                Turn::durable(*id, key, role, format!("content of {}", id))
            })
            .collect()
    }

    fn ids(store: &MessageStore, key: &ConversationKey) -> Vec<String> {
        store.turns(key).iter().map(|t| t.id.to_string()).collect()
    }

    #[test]
    fn test_replace_filters_inactive_and_keeps_staged_turns() {
        let key = ConversationKey::durable("c1");
        let mut store = MessageStore::new();

        let staged = Turn::provisional_user(key.clone(), "pending", None, "p1", "s1");
        let staged_id = staged.id.clone();
        store.append(&key, staged);

        let mut loaded = thread("c1", &["m1", "m1a", "m2"]);
        loaded[2].active = false;
        store.replace(&key, loaded);

        let turns = store.turns(&key);
        assert_eq!(turns.len(), 3);
        assert_eq!(turns[2].id, staged_id);
    }

    #[test]
    fn test_failed_load_keeps_existing_thread() {
        let key = ConversationKey::durable("c1");
        let mut store = MessageStore::new();
        store.replace(&key, thread("c1", &["m1", "m1a"]));

        store.begin_load(&key);
        assert!(store.is_loading(&key));
        store.fail_load(&key, "timeout");

        assert!(!store.is_loading(&key));
        assert_eq!(store.error(&key), Some("timeout"));
        assert_eq!(store.len(&key), 2);
    }

    #[test]
    fn test_rekey_moves_turns_without_residue() {
        let staging = ConversationKey::provisional();
        let durable = ConversationKey::durable("c123");
        let mut store = MessageStore::new();
        store.append(
            &staging,
            Turn::provisional_user(staging.clone(), "Hello", None, "p1", "s1"),
        );

        store.rekey(&staging, &durable);

        assert!(!store.contains(&staging));
        assert_eq!(store.len(&durable), 1);
        assert_eq!(store.turns(&durable)[0].conversation, durable);
    }

    #[test]
    fn test_discard_from_keeps_new_tail() {
        let key = ConversationKey::durable("c1");
        let mut store = MessageStore::new();
        store.replace(&key, thread("c1", &["m1", "m1a", "m2", "m2a", "m3"]));

        let retry = Turn::provisional_user(key.clone(), "Retry", None, "p1", "s1");
        let retry_id = retry.id.clone();
        store.append(&key, retry);

        let removed = store.discard_from(&key, &TurnId::durable("m2"), &retry_id);

        assert_eq!(removed, Some(3));
        assert_eq!(ids(&store, &key)[..2].to_vec(), vec!["m1".to_string(), "m1a".to_string()]);
        assert_eq!(store.turns(&key)[2].id, retry_id);
    }

    #[test]
    fn test_discard_from_unknown_marker_is_noop() {
        let key = ConversationKey::durable("c1");
        let mut store = MessageStore::new();
        store.replace(&key, thread("c1", &["m1", "m1a"]));

        let keep = TurnId::provisional();
        assert_eq!(store.discard_from(&key, &TurnId::durable("zz"), &keep), None);
        assert_eq!(store.len(&key), 2);
    }

    #[test]
    fn test_confirm_turn_retags_provisional_id() {
        let key = ConversationKey::durable("c1");
        let mut store = MessageStore::new();
        let turn = Turn::provisional_user(key.clone(), "Hi", None, "p1", "s1");
        let provisional = turn.id.clone();
        store.append(&key, turn);

        store.confirm_turn(&key, &provisional, TurnId::durable("u1"));

        assert_eq!(ids(&store, &key), vec!["u1".to_string()]);
        assert!(store.remove_turn(&key, &provisional).is_none());
    }
}
