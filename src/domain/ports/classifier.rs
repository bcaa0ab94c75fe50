//! Target classification of score vectors.

use crate::domain::models::score::ScoreVector;

/// Pure pass/fail decision over a score vector for the current target.
pub trait ScoreClassifier: Send + Sync {
    /// Name of the target being classified
    fn name(&self) -> &str;

    /// Whether `score` shows the target behavior
    fn classify(&self, score: &ScoreVector) -> bool;
}

/// Classifier backed by a closure.
pub struct FnClassifier<F> {
    name: String,
    f: F,
}

impl<F> FnClassifier<F>
where
    F: Fn(&ScoreVector) -> bool + Send + Sync,
{
    /// Classifier named `name` deciding with `f`.
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }
}

impl<F> ScoreClassifier for FnClassifier<F>
where
    F: Fn(&ScoreVector) -> bool + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn classify(&self, score: &ScoreVector) -> bool {
        (self.f)(score)
    }
}
