//! Session registry
//! Named trade history sources, one per exchange session

use crate::history::TradeHistoryService;
use std::collections::HashMap;
use std::sync::Arc;

/// Mapping from session name to its trade history source.
/// Registering a name twice replaces the earlier source.
#[derive(Clone, Default)]
pub struct SessionRegistry {
    sessions: HashMap<String, Arc<dyn TradeHistoryService>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store or replace the source registered under `name`
    pub fn insert(&mut self, name: &str, service: Arc<dyn TradeHistoryService>) {
        self.sessions.insert(name.to_string(), service);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn TradeHistoryService>> {
        self.sessions.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.sessions.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Session names in sorted order
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.sessions.keys().cloned().collect();
        names.sort();
        names
    }

    /// Snapshot of every (name, source) pair for one run
    pub fn snapshot(&self) -> Vec<(String, Arc<dyn TradeHistoryService>)> {
        self.sessions
            .iter()
            .map(|(name, service)| (name.clone(), service.clone()))
            .collect()
    }
}

impl std::fmt::Debug for SessionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionRegistry")
            .field("sessions", &self.names())
            .finish()
    }
}
