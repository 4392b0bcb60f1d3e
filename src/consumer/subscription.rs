//! Topic to filter-expression registry

use crate::consumer::error::{ConsumerError, ConsumerResult};
use crate::core::sync::{handle_rwlock_read, handle_rwlock_write};
use crate::protocol::{FilterExpression, FilterType};
use std::collections::HashMap;
use std::sync::RwLock;

/// Subscriptions of one consumer
///
/// Subscriptions may change while the consumer runs; process queues look the
/// filter up again for every pop request.
#[derive(Debug, Default)]
pub struct SubscriptionTable {
    expressions: RwLock<HashMap<String, FilterExpression>>,
}

fn sync_error(message: String) -> ConsumerError {
    ConsumerError::Synchronisation { message }
}

impl SubscriptionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or replace the filter for `topic`, returning the previous one
    pub fn subscribe(
        &self,
        topic: &str,
        expression: FilterExpression,
    ) -> ConsumerResult<Option<FilterExpression>> {
        let invalid = |message: &str| ConsumerError::InvalidSubscription {
            topic: topic.to_string(),
            message: message.to_string(),
        };
        if topic.trim().is_empty() {
            return Err(invalid("topic cannot be empty"));
        }
        if expression.content.trim().is_empty() {
            return Err(match expression.filter_type {
                FilterType::Tag => invalid("tag expression cannot be empty, use \"*\" for all"),
                FilterType::Sql => invalid("SQL expression cannot be empty"),
            });
        }

        let mut expressions = handle_rwlock_write(self.expressions.write(), sync_error)?;
        log::debug!(
            "Subscribe topic={} with {} filter '{}'",
            topic,
            expression.filter_type,
            expression.content
        );
        Ok(expressions.insert(topic.to_string(), expression))
    }

    pub fn unsubscribe(&self, topic: &str) -> ConsumerResult<Option<FilterExpression>> {
        let mut expressions = handle_rwlock_write(self.expressions.write(), sync_error)?;
        Ok(expressions.remove(topic))
    }

    /// Filter registered for `topic`
    pub fn get(&self, topic: &str) -> Option<FilterExpression> {
        match handle_rwlock_read(self.expressions.read(), sync_error) {
            Ok(expressions) => expressions.get(topic).cloned(),
            Err(e) => {
                log::warn!("Cannot look up subscription of topic={}: {}", topic, e);
                None
            }
        }
    }

    /// Subscribed topics in lexical order
    pub fn topics(&self) -> Vec<String> {
        let mut topics: Vec<String> = handle_rwlock_read(self.expressions.read(), sync_error)
            .map(|expressions| expressions.keys().cloned().collect())
            .unwrap_or_default();
        topics.sort();
        topics
    }

    pub fn len(&self) -> usize {
        handle_rwlock_read(self.expressions.read(), sync_error)
            .map(|expressions| expressions.len())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
