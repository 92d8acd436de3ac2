//! Live topic registry.

use crate::types::TopicInformation;
use segbag_storage::TopicMetadata;
use std::collections::BTreeMap;

/// Topics currently registered with a writer and their message counters.
///
/// The registry is the single source of truth for per-topic counts: the
/// catalog is recomputed from it when a bag is closed. Entries are created
/// by [`TopicRegistry::register`] and only disappear through
/// [`TopicRegistry::remove`]; rotation never drops them.
#[derive(Debug, Clone, Default)]
pub struct TopicRegistry {
    topics: BTreeMap<String, TopicInformation>,
}

impl TopicRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a topic.
    ///
    /// Returns false and leaves the registry unchanged if a topic with the
    /// same name is already registered.
    pub fn register(&mut self, topic: &TopicMetadata) -> bool {
        if self.topics.contains_key(&topic.name) {
            return false;
        }
        self.topics
            .insert(topic.name.clone(), TopicInformation::new(topic.clone()));
        true
    }

    /// Removes a topic, returning its entry.
    pub fn remove(&mut self, name: &str) -> Option<TopicInformation> {
        self.topics.remove(name)
    }

    /// Returns true if the topic is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.topics.contains_key(name)
    }

    /// Returns the entry for a topic.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&TopicInformation> {
        self.topics.get(name)
    }

    /// Counts one message on `name`, returning the new count.
    ///
    /// Returns `None` if the topic is not registered.
    pub fn record_message(&mut self, name: &str) -> Option<u64> {
        let info = self.topics.get_mut(name)?;
        info.message_count += 1;
        Some(info.message_count)
    }

    /// Returns the number of registered topics.
    #[must_use]
    pub fn len(&self) -> usize {
        self.topics.len()
    }

    /// Returns true if no topic is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.topics.is_empty()
    }

    /// Iterates over the registered topics, ordered by name.
    pub fn topics(&self) -> impl Iterator<Item = &TopicMetadata> {
        self.topics.values().map(|info| &info.metadata)
    }

    /// Iterates over the entries, ordered by name.
    pub fn iter(&self) -> impl Iterator<Item = &TopicInformation> {
        self.topics.values()
    }

    /// Returns the sum of all per-topic counters.
    #[must_use]
    pub fn total_messages(&self) -> u64 {
        self.topics.values().map(|info| info.message_count).sum()
    }

    /// Returns a copy of every entry keyed by topic name.
    #[must_use]
    pub fn snapshot(&self) -> BTreeMap<String, TopicInformation> {
        self.topics.clone()
    }
}
