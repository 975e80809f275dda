//! Outbound adapters implementing domain ports for external infrastructure.
//!
//! Adapters are thin translators that convert between domain types and
//! infrastructure-specific representations. They contain no business logic
//! beyond the candidate ranking the registry cannot do itself.

pub mod records;
