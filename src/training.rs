use crate::model::{FinishedEvent, OddsRow, TrainingRecord, Winner};
use crate::no_vig::no_vig_home_probability;
use crate::snapshot::OddsIndex;

/// Aggregate reasons events were left out of the training set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildStats {
    pub considered: usize,
    pub unusable_result: usize,
    pub no_snapshot: usize,
    pub no_probability: usize,
    pub kept: usize,
}

#[derive(Debug, Clone, Default)]
pub struct TrainingSet {
    pub records: Vec<TrainingRecord>,
    pub stats: BuildStats,
}

impl TrainingSet {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn features(&self) -> Vec<f64> {
        self.records.iter().map(|r| r.p_home_novig).collect()
    }

    pub fn labels(&self) -> Vec<bool> {
        self.records.iter().map(|r| r.home_won).collect()
    }
}

pub fn build_training_set(finished: &[FinishedEvent], odds: &[OddsRow]) -> TrainingSet {
    let index = OddsIndex::new(odds);
    let mut stats = BuildStats::default();
    let mut records = Vec::new();

    for item in finished {
        stats.considered += 1;
        let home_won = match item.winner {
            Winner::Home => true,
            Winner::Away => false,
            Winner::Other => {
                stats.unusable_result += 1;
                continue;
            }
        };
        if index.rows_for(&item.event.id).is_empty() {
            stats.no_snapshot += 1;
            continue;
        }
        let Some(p_home_novig) = no_vig_home_probability(&index, &item.event) else {
            stats.no_probability += 1;
            continue;
        };
        records.push(TrainingRecord {
            event_id: item.event.id.clone(),
            p_home_novig,
            home_won,
        });
    }

    stats.kept = records.len();
    TrainingSet { records, stats }
}
