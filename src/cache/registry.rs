use chrono::{DateTime, Utc};
use std::collections::HashMap;

use super::types::{ContextEntry, ContextId, LoadTicket};
use crate::session::ConversationSummary;

/// Per-context conversation listings with loading and error flags.
///
/// At most one entry exists per context id. Summaries are upserted by
/// conversation id, never wholesale-replaced, so a summary created by a send
/// and a listing fetched from the backend merge instead of clobbering.
#[derive(Debug, Clone, Default)]
pub struct ContextRegistry {
    entries: HashMap<ContextId, ContextEntry>,
}

impl ContextRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entry(&self, context: &ContextId) -> Option<&ContextEntry> {
        self.entries.get(context)
    }

    /// Listing for a context, only if a full fetch has completed
    pub fn cached(&self, context: &ContextId) -> Option<&[ConversationSummary]> {
        self.entries
            .get(context)
            .filter(|entry| entry.loaded)
            .map(|entry| entry.conversations.as_slice())
    }

    /// Summaries known for a context, whether or not a full fetch has completed
    pub fn conversations(&self, context: &ContextId) -> &[ConversationSummary] {
        self.entries
            .get(context)
            .map(|entry| entry.conversations.as_slice())
            .unwrap_or(&[])
    }

    pub fn is_loading(&self, context: &ContextId) -> bool {
        self.entries.get(context).is_some_and(|entry| entry.loading)
    }

    pub fn error(&self, context: &ContextId) -> Option<&str> {
        self.entries.get(context).and_then(|entry| entry.error.as_deref())
    }

    /// Check-before-fetch. Marks the context loading when the caller should fetch.
    ///
    /// With `force` a cached listing is refetched, but an outstanding fetch is
    /// still never duplicated.
    pub fn begin_load(&mut self, context: &ContextId, force: bool) -> LoadTicket {
        let entry = self.entries.entry(context.clone()).or_default();

        if entry.loading {
            return LoadTicket::AlreadyLoading;
        }
        if entry.loaded && !force {
            return LoadTicket::Cached(entry.conversations.clone());
        }

        entry.loading = true;
        entry.error = None;
        LoadTicket::Start
    }

    /// Store a fetched listing. Written under its own context id regardless of
    /// which context is active by the time it resolves.
    pub fn complete_load(&mut self, context: &ContextId, fetched: Vec<ConversationSummary>) {
        for summary in fetched {
            let summary = ConversationSummary {
                context_id: context.clone(),
                ..summary
            };
            self.upsert(summary);
        }

        let entry = self.entries.entry(context.clone()).or_default();
        entry.loaded = true;
        entry.loading = false;
        entry.error = None;
    }

    /// Record a failed fetch. A previously populated listing is left in place.
    pub fn fail_load(&mut self, context: &ContextId, message: impl Into<String>) {
        let entry = self.entries.entry(context.clone()).or_default();
        entry.loading = false;
        entry.error = Some(message.into());
    }

    /// Insert a summary into its owning context, or replace it in place by id
    pub fn upsert(&mut self, summary: ConversationSummary) {
        // A conversation belongs to exactly one context
        for (context, entry) in self.entries.iter_mut() {
            if *context != summary.context_id {
                entry.conversations.retain(|existing| existing.id != summary.id);
            }
        }

        let entry = self.entries.entry(summary.context_id.clone()).or_default();
        match entry
            .conversations
            .iter_mut()
            .find(|existing| existing.id == summary.id)
        {
            Some(existing) => *existing = summary,
            None => entry.conversations.push(summary),
        }
    }

    pub fn remove(&mut self, conversation_id: &str) -> Option<ConversationSummary> {
        for entry in self.entries.values_mut() {
            if let Some(index) = entry
                .conversations
                .iter()
                .position(|summary| summary.id == conversation_id)
            {
                return Some(entry.conversations.remove(index));
            }
        }
        None
    }

    /// Look a conversation up across every context
    pub fn find(&self, conversation_id: &str) -> Option<&ConversationSummary> {
        self.entries
            .values()
            .flat_map(|entry| entry.conversations.iter())
            .find(|summary| summary.id == conversation_id)
    }

    pub fn touch(&mut self, conversation_id: &str, at: DateTime<Utc>) {
        if let Some(summary) = self
            .entries
            .values_mut()
            .flat_map(|entry| entry.conversations.iter_mut())
            .find(|summary| summary.id == conversation_id)
        {
            summary.updated_at = at;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(id: &str, context: ContextId, title: &str) -> ConversationSummary {
        ConversationSummary::new(id, context, title)
    }

    #[test]
    fn test_begin_load_is_check_before_fetch() {
        let mut registry = ContextRegistry::new();
        let personal = ContextId::Personal;

        assert_eq!(registry.begin_load(&personal, false), LoadTicket::Start);
        assert!(registry.is_loading(&personal));
        assert_eq!(registry.begin_load(&personal, false), LoadTicket::AlreadyLoading);
        assert_eq!(registry.begin_load(&personal, true), LoadTicket::AlreadyLoading);

        registry.complete_load(&personal, vec![summary("c1", personal.clone(), "One")]);
        assert!(!registry.is_loading(&personal));

        match registry.begin_load(&personal, false) {
            LoadTicket::Cached(list) => assert_eq!(list.len(), 1),
            other => panic!("Expected cached listing, got {:?}", other),
        }
        assert_eq!(registry.begin_load(&personal, true), LoadTicket::Start);
    }

    #[test]
    fn test_failed_refresh_keeps_stale_listing() {
        let mut registry = ContextRegistry::new();
        let org = ContextId::organization("acme");

        registry.begin_load(&org, false);
        registry.complete_load(&org, vec![summary("c1", org.clone(), "One")]);

        registry.begin_load(&org, true);
        registry.fail_load(&org, "connection reset");

        assert_eq!(registry.error(&org), Some("connection reset"));
        assert!(!registry.is_loading(&org));
        assert_eq!(registry.cached(&org).map(<[_]>::len), Some(1));
    }

    #[test]
    fn test_fetched_listing_merges_with_locally_created_summary() {
        let mut registry = ContextRegistry::new();
        let personal = ContextId::Personal;

        assert_eq!(registry.begin_load(&personal, false), LoadTicket::Start);
        registry.upsert(summary("fresh", personal.clone(), "Created during send"));
        registry.complete_load(
            &personal,
            vec![
                summary("old", personal.clone(), "Old"),
                summary("fresh", personal.clone(), "Server title"),
            ],
        );

        let titles: Vec<_> = registry
            .conversations(&personal)
            .iter()
            .map(|s| s.title.as_str())
            .collect();
        assert_eq!(titles, vec!["Server title", "Old"]);
    }

    #[test]
    fn test_upsert_moves_conversation_between_contexts() {
        let mut registry = ContextRegistry::new();
        let org = ContextId::organization("acme");

        registry.upsert(summary("c1", ContextId::Personal, "One"));
        registry.upsert(summary("c1", org.clone(), "One"));

        assert!(registry.conversations(&ContextId::Personal).is_empty());
        assert_eq!(registry.conversations(&org).len(), 1);
        assert_eq!(registry.find("c1").map(|s| s.context_id.clone()), Some(org));
    }

    #[test]
    fn test_remove_drops_summary() {
        let mut registry = ContextRegistry::new();
        registry.upsert(summary("c1", ContextId::Personal, "One"));

        assert!(registry.remove("c1").is_some());
        assert!(registry.remove("c1").is_none());
        assert!(registry.find("c1").is_none());
    }
}
