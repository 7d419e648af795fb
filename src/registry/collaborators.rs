//! Seams to the surrounding catalog.
//!
//! The registry does not own published records or authorization groups; it
//! asks these collaborators about them.

use std::collections::BTreeSet;

use async_trait::async_trait;

use crate::registry::types::GroupId;

/// Knows which published records reference a DOI server
#[async_trait]
pub trait PublicationCatalog: Send + Sync {
    /// Number of published records registered through `server_id`
    async fn count_references(&self, server_id: i32) -> anyhow::Result<u64>;
}

/// Resolves authorization group identities
#[async_trait]
pub trait GroupDirectory: Send + Sync {
    /// The subset of `groups` that does not name an existing group
    async fn unknown_groups(&self, groups: &BTreeSet<GroupId>) -> anyhow::Result<BTreeSet<GroupId>>;
}

/// Group directory over a fixed set of identifiers, usually from configuration
#[derive(Debug, Clone, Default)]
pub struct StaticGroupDirectory {
    known: BTreeSet<GroupId>,
}

impl StaticGroupDirectory {
    pub fn new(known: impl IntoIterator<Item = GroupId>) -> Self {
        Self {
            known: known.into_iter().collect(),
        }
    }
}

#[async_trait]
impl GroupDirectory for StaticGroupDirectory {
    async fn unknown_groups(&self, groups: &BTreeSet<GroupId>) -> anyhow::Result<BTreeSet<GroupId>> {
        Ok(groups.difference(&self.known).copied().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_directory_reports_unknown_groups() {
        let directory = StaticGroupDirectory::new([1, 2, 5]);
        let requested: BTreeSet<GroupId> = [2, 3, 5, 8].into_iter().collect();

        let unknown = directory.unknown_groups(&requested).await.unwrap();
        assert_eq!(unknown.into_iter().collect::<Vec<_>>(), vec![3, 8]);
    }

    #[tokio::test]
    async fn test_empty_directory_knows_nothing() {
        let directory = StaticGroupDirectory::default();
        let requested: BTreeSet<GroupId> = [1].into_iter().collect();

        assert_eq!(directory.unknown_groups(&requested).await.unwrap(), requested);
    }
}
