use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, NaiveDate, Utc};

use super::domain::{Assessment, AssessmentId, AssessmentType, RollingAverage, UserId};
use super::repository::{AssessmentRepository, RepositoryError};

type DayKey = (UserId, AssessmentType, NaiveDate);
type AverageKey = (UserId, AssessmentType);

#[derive(Debug, Clone)]
struct StoredAssessment {
    assessment: Assessment,
    day: NaiveDate,
}

#[derive(Debug, Default)]
struct MemoryState {
    assessments: HashMap<AssessmentId, StoredAssessment>,
    day_index: HashMap<DayKey, AssessmentId>,
    averages: HashMap<AverageKey, RollingAverage>,
}

impl MemoryState {
    fn matching<'a>(
        &'a self,
        user_id: &'a UserId,
        assessment_type: Option<AssessmentType>,
    ) -> impl Iterator<Item = &'a Assessment> + 'a {
        self.assessments
            .values()
            .map(|stored| &stored.assessment)
            .filter(move |assessment| &assessment.user_id == user_id)
            .filter(move |assessment| {
                assessment_type.map_or(true, |kind| assessment.assessment_type == kind)
            })
    }
}

/// Process-local repository. The day index makes `(user, type, day)` unique
/// under the same lock as the insert.
#[derive(Debug, Default, Clone)]
pub struct InMemoryAssessmentRepository {
    state: Arc<Mutex<MemoryState>>,
}

impl InMemoryAssessmentRepository {
    fn lock(&self) -> Result<MutexGuard<'_, MemoryState>, RepositoryError> {
        self.state
            .lock()
            .map_err(|_| RepositoryError::Unavailable("assessment store lock poisoned".to_string()))
    }

    pub fn assessment_count(&self) -> Result<usize, RepositoryError> {
        Ok(self.lock()?.assessments.len())
    }

    /// Drops a stored average so repair paths can be exercised.
    pub fn forget_average(
        &self,
        user_id: &UserId,
        assessment_type: AssessmentType,
    ) -> Result<Option<RollingAverage>, RepositoryError> {
        Ok(self
            .lock()?
            .averages
            .remove(&(user_id.clone(), assessment_type)))
    }
}

fn newest_first(mut assessments: Vec<Assessment>) -> Vec<Assessment> {
    assessments.sort_by(|a, b| b.date.cmp(&a.date));
    assessments
}

impl AssessmentRepository for InMemoryAssessmentRepository {
    fn insert(&self, assessment: Assessment, day: NaiveDate) -> Result<Assessment, RepositoryError> {
        let mut state = self.lock()?;
        let key = (assessment.user_id.clone(), assessment.assessment_type, day);
        if state.day_index.contains_key(&key) || state.assessments.contains_key(&assessment.id) {
            return Err(RepositoryError::Conflict);
        }

        state.day_index.insert(key, assessment.id);
        state.assessments.insert(
            assessment.id,
            StoredAssessment {
                assessment: assessment.clone(),
                day,
            },
        );
        Ok(assessment)
    }

    fn fetch(&self, id: &AssessmentId) -> Result<Option<Assessment>, RepositoryError> {
        Ok(self
            .lock()?
            .assessments
            .get(id)
            .map(|stored| stored.assessment.clone()))
    }

    fn find_in_window(
        &self,
        user_id: &UserId,
        assessment_type: AssessmentType,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Option<Assessment>, RepositoryError> {
        let state = self.lock()?;
        let found = state
            .matching(user_id, Some(assessment_type))
            .filter(|assessment| assessment.date >= start && assessment.date < end)
            .min_by_key(|assessment| assessment.date)
            .cloned();
        Ok(found)
    }

    fn delete(&self, id: &AssessmentId) -> Result<Option<Assessment>, RepositoryError> {
        let mut state = self.lock()?;
        let Some(stored) = state.assessments.remove(id) else {
            return Ok(None);
        };

        let key = (
            stored.assessment.user_id.clone(),
            stored.assessment.assessment_type,
            stored.day,
        );
        if state.day_index.get(&key) == Some(id) {
            state.day_index.remove(&key);
        }
        Ok(Some(stored.assessment))
    }

    fn recent(
        &self,
        user_id: &UserId,
        assessment_type: Option<AssessmentType>,
        limit: usize,
    ) -> Result<Vec<Assessment>, RepositoryError> {
        let state = self.lock()?;
        let mut assessments =
            newest_first(state.matching(user_id, assessment_type).cloned().collect());
        assessments.truncate(limit);
        Ok(assessments)
    }

    fn since(
        &self,
        user_id: &UserId,
        assessment_type: Option<AssessmentType>,
        since: DateTime<Utc>,
    ) -> Result<Vec<Assessment>, RepositoryError> {
        let state = self.lock()?;
        Ok(newest_first(
            state
                .matching(user_id, assessment_type)
                .filter(|assessment| assessment.date >= since)
                .cloned()
                .collect(),
        ))
    }

    fn upsert_average(&self, average: RollingAverage) -> Result<RollingAverage, RepositoryError> {
        let mut state = self.lock()?;
        let key = (average.user_id.clone(), average.assessment_type);
        let stored = match state.averages.get(&key) {
            Some(existing) => RollingAverage {
                id: existing.id,
                ..average
            },
            None => average,
        };
        state.averages.insert(key, stored.clone());
        Ok(stored)
    }

    fn fetch_average(
        &self,
        user_id: &UserId,
        assessment_type: AssessmentType,
    ) -> Result<Option<RollingAverage>, RepositoryError> {
        Ok(self
            .lock()?
            .averages
            .get(&(user_id.clone(), assessment_type))
            .cloned())
    }

    fn averages_for(&self, user_id: &UserId) -> Result<Vec<RollingAverage>, RepositoryError> {
        let state = self.lock()?;
        let mut averages: Vec<RollingAverage> = state
            .averages
            .values()
            .filter(|average| &average.user_id == user_id)
            .cloned()
            .collect();
        averages.sort_by_key(|average| average.assessment_type);
        Ok(averages)
    }
}
