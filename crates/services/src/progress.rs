use std::collections::BTreeSet;
use std::sync::Arc;

use log::{info, warn};
use storage::repository::ProgressRepository;
use tutor_core::Clock;
use tutor_core::exam::percentage;
use tutor_core::model::{Curriculum, ProgressState};
use tutor_core::time::days_between;

/// Aggregated view of curriculum progress, useful for UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressSummary {
    pub total_sections: usize,
    /// Sections unlocked beyond the first one.
    pub completed_sections: usize,
    pub progress_percentage: u8,
    /// 1-based, for display.
    pub current_section: usize,
    pub unlocked_sections: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionOverview {
    pub index: usize,
    pub title: String,
    pub is_unlocked: bool,
    pub is_current: bool,
}

/// Owns the current-section pointer and the unlocked set.
///
/// Every mutation is persisted before the method returns. Write failures are
/// logged and the in-memory state is kept.
pub struct ProgressTracker {
    state: ProgressState,
    section_count: usize,
    repo: Arc<dyn ProgressRepository>,
    clock: Clock,
}

impl ProgressTracker {
    /// Load persisted progress and repair it against `section_count`.
    ///
    /// Missing or malformed records start from the defaults.
    pub async fn restore(
        repo: Arc<dyn ProgressRepository>,
        clock: Clock,
        section_count: usize,
    ) -> Self {
        let (state, unreadable) = match repo.load_progress().await {
            Ok(Some(state)) => (state, false),
            Ok(None) => {
                info!("no saved progress, starting from the first section");
                (ProgressState::default(), false)
            }
            Err(err) => {
                warn!("discarding unreadable progress record: {err}");
                (ProgressState::default(), true)
            }
        };

        let mut tracker = Self {
            state,
            section_count: section_count.max(1),
            repo,
            clock,
        };
        let repaired = tracker.state.repair(tracker.section_count);
        if repaired {
            info!(
                "repaired saved progress for {} sections: current={}, unlocked={:?}",
                tracker.section_count,
                tracker.state.current_section(),
                tracker.state.unlocked_sections()
            );
        }
        if repaired || unreadable {
            tracker.persist().await;
        }
        tracker
    }

    #[must_use]
    pub fn current_section(&self) -> usize {
        self.state.current_section()
    }

    #[must_use]
    pub fn section_count(&self) -> usize {
        self.section_count
    }

    #[must_use]
    pub fn is_unlocked(&self, index: usize) -> bool {
        self.state.is_unlocked(index)
    }

    #[must_use]
    pub fn is_last_section(&self) -> bool {
        self.current_section() + 1 >= self.section_count
    }

    /// Make `index` the current section.
    ///
    /// Returns false, without writing, when the section is locked.
    pub async fn select_section(&mut self, index: usize) -> bool {
        if index >= self.section_count || !self.state.select(index) {
            return false;
        }
        self.persist().await;
        true
    }

    /// Unlock the section after the current one and move to it.
    ///
    /// Returns false when the current section is the last.
    pub async fn unlock_next(&mut self) -> bool {
        if self.is_last_section() {
            return false;
        }
        let next = self.current_section() + 1;
        self.state.unlock(next);
        self.state.select(next);
        self.persist().await;
        true
    }

    /// Unlock `index` without selecting it. Returns true if it was newly unlocked.
    pub async fn unlock_section(&mut self, index: usize) -> bool {
        if index >= self.section_count || !self.state.unlock(index) {
            return false;
        }
        self.persist().await;
        true
    }

    /// Forget all progress and start again from the first section.
    pub async fn reset(&mut self) {
        if let Err(err) = self.repo.clear_progress().await {
            warn!("failed to clear progress record: {err}");
        }
        self.state = ProgressState::default();
        self.persist().await;
    }

    #[must_use]
    pub fn summary(&self) -> ProgressSummary {
        let unlocked: Vec<usize> = self.state.unlocked_sections().iter().copied().collect();
        let completed_sections = unlocked.len().saturating_sub(1);
        ProgressSummary {
            total_sections: self.section_count,
            completed_sections,
            progress_percentage: percentage(completed_sections, self.section_count),
            current_section: self.current_section() + 1,
            unlocked_sections: unlocked,
        }
    }

    #[must_use]
    pub fn overview(&self, curriculum: &Curriculum) -> Vec<SectionOverview> {
        curriculum
            .sections()
            .iter()
            .enumerate()
            .map(|(index, section)| SectionOverview {
                index,
                title: section.title().to_owned(),
                is_unlocked: self.is_unlocked(index),
                is_current: index == self.current_section(),
            })
            .collect()
    }

    /// Whole days since progress was last saved, if it ever was.
    #[must_use]
    pub fn days_since_last_visit(&self) -> Option<i64> {
        self.state
            .last_updated()
            .map(|at| days_between(at, self.clock.now()))
    }

    #[must_use]
    pub fn unlocked(&self) -> &BTreeSet<usize> {
        self.state.unlocked_sections()
    }

    async fn persist(&mut self) {
        self.state.touch(self.clock.now());
        if let Err(err) = self.repo.save_progress(&self.state).await {
            warn!("failed to save progress: {err}");
        }
    }
}
