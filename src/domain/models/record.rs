//! Record identifiers, cached entries and the messages built from them.

use std::fmt;

/// Attribute name carrying the record identifier.
pub const ATTRIBUTE_RECORD_ID: &str = "id";
/// Attribute name carrying the record type.
pub const ATTRIBUTE_RECORD_TYPE: &str = "type";
/// Attribute name carrying the record source.
pub const ATTRIBUTE_RECORD_SOURCE: &str = "source";
/// Attribute name carrying the record operation, when one is configured.
pub const ATTRIBUTE_RECORD_OPERATION: &str = "operation";

/// Opaque key naming one logical record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Identifier(String);

impl Identifier {
    /// Wrap a raw identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Identifier {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<String> for Identifier {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for Identifier {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Cached data associated with an identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    /// Record type, e.g. `xml`
    pub record_type: String,
    /// Name of the data source the record came from
    pub source: String,
    /// Raw record payload
    pub payload: Vec<u8>,
}

/// A single message attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    /// Attribute name
    pub name: String,
    /// Attribute value
    pub value: String,
}

impl Attribute {
    /// Create an attribute from a name/value pair.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Message handed to the outbound queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    /// Ordered attribute list
    pub attributes: Vec<Attribute>,
    /// Message body
    pub payload: Vec<u8>,
}

impl OutboundMessage {
    /// Build the outbound message for an enriched record.
    ///
    /// Attributes are always `id`, `type` and `source` in that order,
    /// followed by `operation` when one is given.
    pub fn from_entry(id: &Identifier, entry: CacheEntry, operation: Option<&str>) -> Self {
        let mut attributes = Vec::with_capacity(4);
        attributes.push(Attribute::new(ATTRIBUTE_RECORD_ID, id.as_str()));
        attributes.push(Attribute::new(ATTRIBUTE_RECORD_TYPE, entry.record_type));
        attributes.push(Attribute::new(ATTRIBUTE_RECORD_SOURCE, entry.source));
        if let Some(op) = operation {
            attributes.push(Attribute::new(ATTRIBUTE_RECORD_OPERATION, op));
        }

        Self {
            attributes,
            payload: entry.payload,
        }
    }

    /// Look up an attribute value by name.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }

    /// The record identifier this message was built for.
    pub fn record_id(&self) -> Option<&str> {
        self.attribute(ATTRIBUTE_RECORD_ID)
    }
}

/// Per-message result of a bulk send.
///
/// `succeeded[i]` is the status of the i-th message handed to the send call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryOutcome {
    succeeded: Vec<bool>,
}

impl DeliveryOutcome {
    /// Build an outcome from per-message success flags.
    pub fn new(succeeded: Vec<bool>) -> Self {
        Self { succeeded }
    }

    /// Outcome where every one of `count` messages failed.
    pub fn all_failed(count: usize) -> Self {
        Self::new(vec![false; count])
    }

    /// Number of messages the outcome covers.
    pub fn len(&self) -> usize {
        self.succeeded.len()
    }

    /// True when the outcome covers no messages.
    pub fn is_empty(&self) -> bool {
        self.succeeded.is_empty()
    }

    /// Indices of the messages that were not delivered.
    pub fn failed_indices(&self) -> Vec<usize> {
        self.succeeded
            .iter()
            .enumerate()
            .filter_map(|(ix, ok)| (!ok).then_some(ix))
            .collect()
    }

    /// Number of messages that were not delivered.
    pub fn failed_count(&self) -> usize {
        self.succeeded.iter().filter(|ok| !**ok).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry() -> CacheEntry {
        CacheEntry {
            record_type: "xml".to_string(),
            source: "sirsi".to_string(),
            payload: b"<doc/>".to_vec(),
        }
    }

    #[test]
    fn test_message_attribute_order() {
        let msg = OutboundMessage::from_entry(&Identifier::new("u123"), entry(), None);

        let names: Vec<&str> = msg.attributes.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["id", "type", "source"]);
        assert_eq!(msg.record_id(), Some("u123"));
        assert_eq!(msg.attribute("source"), Some("sirsi"));
        assert_eq!(msg.payload, b"<doc/>".to_vec());
    }

    #[test]
    fn test_message_with_operation() {
        let msg = OutboundMessage::from_entry(&Identifier::new("u1"), entry(), Some("delete"));
        assert_eq!(msg.attributes.len(), 4);
        assert_eq!(msg.attribute(ATTRIBUTE_RECORD_OPERATION), Some("delete"));
    }

    #[test]
    fn test_outcome_failed_indices() {
        let outcome = DeliveryOutcome::new(vec![true, true, false, true, true, false]);
        assert_eq!(outcome.failed_indices(), vec![2, 5]);
        assert_eq!(outcome.failed_count(), 2);
        assert_eq!(outcome.len(), 6);

        assert_eq!(DeliveryOutcome::all_failed(3).failed_indices(), vec![0, 1, 2]);
    }
}
