use autopost_core::PostStatus;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum KeywordOutcome {
    Posted {
        keyword: String,
        post_id: u64,
        link: String,
        slug: String,
        status: PostStatus,
        model: String,
        downgraded: bool,
    },
    /// Every stage ran except the create-post call.
    DryRun {
        keyword: String,
        slug: String,
        status: PostStatus,
        model: String,
    },
    Skipped {
        keyword: String,
        stage: String,
        reason: String,
    },
}

impl KeywordOutcome {
    pub fn keyword(&self) -> &str {
        match self {
            KeywordOutcome::Posted { keyword, .. }
            | KeywordOutcome::DryRun { keyword, .. }
            | KeywordOutcome::Skipped { keyword, .. } => keyword,
        }
    }

    /// Counts toward the per-run post target.
    pub fn is_success(&self) -> bool {
        !matches!(self, KeywordOutcome::Skipped { .. })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunReport {
    pub attempted: usize,
    pub posted: usize,
    pub dry_run: usize,
    pub skipped: usize,
    pub outcomes: Vec<KeywordOutcome>,
}

impl RunReport {
    pub fn record(&mut self, outcome: KeywordOutcome) {
        self.attempted += 1;
        match outcome {
            KeywordOutcome::Posted { .. } => self.posted += 1,
            KeywordOutcome::DryRun { .. } => self.dry_run += 1,
            KeywordOutcome::Skipped { .. } => self.skipped += 1,
        }
        self.outcomes.push(outcome);
    }

    pub fn successes(&self) -> usize {
        self.posted + self.dry_run
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts() {
        let mut report = RunReport::default();
        report.record(KeywordOutcome::Skipped {
            keyword: "a".to_string(),
            stage: "filter".to_string(),
            reason: "thin_result".to_string(),
        });
        report.record(KeywordOutcome::DryRun {
            keyword: "b".to_string(),
            slug: "b".to_string(),
            status: PostStatus::Publish,
            model: "gpt-5".to_string(),
        });

        assert_eq!(report.attempted, 2);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.successes(), 1);
        assert_eq!(report.outcomes[1].keyword(), "b");

        let value = serde_json::to_value(&report.outcomes[0]).unwrap();
        assert_eq!(value["outcome"], "skipped");
    }
}
