//! Domain rank lookup used when stamping metadata and rewriting ids
//!
//! Ranks are bytes: 0 is the best domain, 255 the worst. Domains with no
//! entry rank 255.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::DocId;
use crate::error::Result;
use crate::model::id;

pub const UNRANKED: u8 = 255;

#[derive(Debug, Clone, Default)]
pub struct DomainRankings {
    ranks: FxHashMap<u32, u8>,
}

/// On-disk form: a JSON object of domain id to rank
#[derive(Serialize, Deserialize)]
#[serde(transparent)]
struct RankingsFile(BTreeMap<u32, u8>);

impl DomainRankings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs(pairs: impl IntoIterator<Item = (u32, u8)>) -> Self {
        Self {
            ranks: pairs.into_iter().collect(),
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let file: RankingsFile = serde_json::from_str(&content)?;
        Ok(Self::from_pairs(file.0))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let file = RankingsFile(self.ranks.iter().map(|(&d, &r)| (d, r)).collect());
        fs::write(path, serde_json::to_string_pretty(&file)?)?;
        Ok(())
    }

    pub fn insert(&mut self, domain_id: u32, rank: u8) {
        self.ranks.insert(domain_id, rank);
    }

    pub fn len(&self) -> usize {
        self.ranks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranks.is_empty()
    }

    pub fn ranking(&self, domain_id: u32) -> u8 {
        self.ranks.get(&domain_id).copied().unwrap_or(UNRANKED)
    }

    /// Rank of the document's domain scaled to `[0, 1]`, for `id::add_rank`
    pub fn sort_ranking(&self, doc_id: DocId) -> f32 {
        self.ranking(id::domain_id(doc_id)) as f32 / UNRANKED as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_domain_is_unranked() {
        let rankings = DomainRankings::from_pairs([(7, 10)]);
        assert_eq!(rankings.ranking(7), 10);
        assert_eq!(rankings.ranking(8), UNRANKED);
        assert_eq!(rankings.sort_ranking(id::encode_id(0, 8, 1)), 1.0);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rankings.json");
        let mut rankings = DomainRankings::new();
        rankings.insert(1, 0);
        rankings.insert(300, 128);
        rankings.save(&path).unwrap();

        let loaded = DomainRankings::load(&path).unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded.ranking(300), 128);
        assert_eq!(loaded.ranking(1), 0);
    }
}
