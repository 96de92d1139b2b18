use std::collections::BTreeMap;
use std::sync::Arc;

use log::{debug, warn};
use storage::repository::PronunciationScoreRepository;
use tutor_core::model::{Phrase, PronunciationScoreTable};
use tutor_core::pronunciation;

use crate::recognition::Recognition;

/// Owns the pronunciation score table and persists it after every update.
pub struct PronunciationScoreService {
    table: PronunciationScoreTable,
    repo: Arc<dyn PronunciationScoreRepository>,
}

impl PronunciationScoreService {
    /// Load the persisted table; unreadable records start empty.
    pub async fn restore(repo: Arc<dyn PronunciationScoreRepository>) -> Self {
        let table = match repo.load_scores().await {
            Ok(table) => table.unwrap_or_default(),
            Err(err) => {
                warn!("discarding unreadable pronunciation scores: {err}");
                if let Err(err) = repo.clear_scores().await {
                    warn!("failed to clear pronunciation scores: {err}");
                }
                PronunciationScoreTable::default()
            }
        };
        Self { table, repo }
    }

    /// Case-insensitive accuracy of a recognition against a phrase's targets.
    #[must_use]
    pub fn evaluate(phrase: &Phrase, recognition: &Recognition) -> u8 {
        let heard = recognition.transcript.to_lowercase();
        let primary = phrase.target().to_lowercase();
        let alternate = phrase.alternate_target().map(str::to_lowercase);
        pronunciation::score(
            &heard,
            &primary,
            recognition.confidence,
            alternate.as_deref(),
        )
    }

    /// Store a score and write the whole table through.
    pub async fn record(&mut self, section: usize, phrase: usize, score: u8) {
        self.table.record(section, phrase, score);
        debug!("pronunciation score section={section} phrase={phrase} score={score}");
        if let Err(err) = self.repo.save_scores(&self.table).await {
            warn!("failed to save pronunciation scores: {err}");
        }
    }

    #[must_use]
    pub fn table(&self) -> &PronunciationScoreTable {
        &self.table
    }

    #[must_use]
    pub fn score_for(&self, section: usize, phrase: usize) -> Option<u8> {
        self.table.get(section, phrase)
    }

    #[must_use]
    pub fn section_scores(&self, section: usize) -> Option<&BTreeMap<usize, u8>> {
        self.table.section(section)
    }

    /// Every phrase of the section has a stored score of at least `threshold`.
    #[must_use]
    pub fn meets_requirement(&self, section: usize, phrase_count: usize, threshold: u8) -> bool {
        self.table.all_at_least(section, phrase_count, threshold)
    }

    #[must_use]
    pub fn qualified_count(&self, section: usize, phrase_count: usize, threshold: u8) -> usize {
        self.table.count_at_least(section, phrase_count, threshold)
    }

    pub async fn clear(&mut self) {
        self.table.clear();
        if let Err(err) = self.repo.clear_scores().await {
            warn!("failed to clear pronunciation scores: {err}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storage::repository::{InMemoryStore, KeyValueStore, KvRepository, keys};

    fn repo() -> Arc<dyn PronunciationScoreRepository> {
        Arc::new(KvRepository::new(Arc::new(InMemoryStore::new())))
    }

    fn heard(transcript: &str, confidence: f64) -> Recognition {
        Recognition {
            transcript: transcript.into(),
            confidence,
        }
    }

    #[test]
    fn evaluation_ignores_case_and_punctuation() {
        let phrase = Phrase::new("Buenos días", "Dobrý den", "do-bree den", None).unwrap();
        assert_eq!(
            PronunciationScoreService::evaluate(&phrase, &heard("dobrý den!", 1.0)),
            100
        );
        assert_eq!(
            PronunciationScoreService::evaluate(&phrase, &heard("DOBRÝ DEN", 1.0)),
            100
        );
    }

    #[test]
    fn evaluation_accepts_alternate_target() {
        let phrase =
            Phrase::new("Gracias", "Děkuji", "dyeh-koo-yi", Some("Děkuju".into())).unwrap();
        assert_eq!(
            PronunciationScoreService::evaluate(&phrase, &heard("děkuju", 1.0)),
            100
        );
    }

    #[tokio::test]
    async fn records_are_written_through_and_restored() {
        let repo = repo();
        let mut service = PronunciationScoreService::restore(Arc::clone(&repo)).await;
        service.record(0, 0, 95).await;
        service.record(0, 1, 80).await;

        let restored = PronunciationScoreService::restore(repo).await;
        assert_eq!(restored.score_for(0, 0), Some(95));
        assert_eq!(restored.section_scores(0).map(BTreeMap::len), Some(2));
        assert!(!restored.meets_requirement(0, 2, 89));
        assert_eq!(restored.qualified_count(0, 2, 89), 1);
    }

    #[tokio::test]
    async fn clear_empties_table_and_store() {
        let repo = repo();
        let mut service = PronunciationScoreService::restore(Arc::clone(&repo)).await;
        service.record(1, 0, 100).await;
        service.clear().await;
        assert!(service.table().is_empty());
        assert!(repo.load_scores().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn unreadable_scores_are_cleared_from_store() {
        let store = InMemoryStore::new();
        store.set(keys::PRONUNCIATION_SCORES, "[1]").await.unwrap();
        let repo: Arc<dyn PronunciationScoreRepository> =
            Arc::new(KvRepository::new(Arc::new(store.clone())));

        let service = PronunciationScoreService::restore(Arc::clone(&repo)).await;
        assert!(service.table().is_empty());
        assert_eq!(store.get(keys::PRONUNCIATION_SCORES).await.unwrap(), None);
        assert!(repo.load_scores().await.unwrap().is_none());
    }
}
