//! Catalog and model configuration errors

/// A configuration inconsistency detected before any solver call.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("catalog defines no muscles")]
    NoMuscles,
    #[error("catalog defines no exercises")]
    NoExercises,
    #[error("catalog defines no day categories")]
    NoCategories,
    #[error("duplicate muscle \"{0}\"")]
    DuplicateMuscle(String),
    #[error("duplicate equipment tag \"{0}\"")]
    DuplicateEquipment(String),
    #[error("duplicate day category \"{0}\"")]
    DuplicateCategory(String),
    #[error("duplicate exercise \"{0}\"")]
    DuplicateExercise(String),
    #[error("muscle \"{muscle}\" has invalid weekly target {target}")]
    InvalidTarget { muscle: String, target: f64 },
    #[error("exercise \"{exercise}\" references unknown muscle \"{muscle}\"")]
    UnknownMuscle { exercise: String, muscle: String },
    #[error("exercise \"{exercise}\" references unknown equipment \"{equipment}\"")]
    UnknownEquipment { exercise: String, equipment: String },
    #[error("exercise \"{exercise}\" references unknown day category \"{category}\"")]
    UnknownCategory { exercise: String, category: String },
    #[error("exercise \"{0}\" is not legal in any day category")]
    ExerciseWithoutCategory(String),
    #[error("exercise \"{exercise}\" has activation {value} for \"{muscle}\" (must be within 0..=1)")]
    ActivationOutOfRange {
        exercise: String,
        muscle: String,
        value: f64,
    },
    #[error("day category \"{0}\" has no training days")]
    NoDays(String),
    #[error("day category \"{0}\" needs pairs_per_day or required_instances")]
    MissingQuota(String),
    #[error("day category \"{0}\": weekly instance total does not fit in 32 bits")]
    QuotaOverflow(String),
    #[error("day category \"{0}\" asks for no supersets")]
    EmptyQuota(String),
    #[error(
        "day category \"{category}\": {instances} instances cannot be split into whole pairs over {days} days"
    )]
    IndivisibleInstances {
        category: String,
        instances: u32,
        days: u32,
    },
    #[error("day category \"{category}\": {instances} instances given, days x pairs per day needs {expected}")]
    QuotaMismatch {
        category: String,
        instances: u32,
        expected: u32,
    },
    #[error("day category \"{category}\" has invalid sets per instance {value}")]
    InvalidSetsPerInstance { category: String, value: f64 },
    #[error("overlap threshold {0} must be a finite non-negative number")]
    InvalidThreshold(f64),
    #[error("activation floor {0} must be within 0..=1")]
    InvalidFloor(f64),
    #[error("invalid objective weight {0} (weights must be finite and non-negative)")]
    InvalidWeight(f64),
    #[error("day category \"{category}\": {pairs} pairs to schedule, {days} days x {pairs_per_day} pairs per day expected")]
    PairCountMismatch {
        category: String,
        pairs: usize,
        days: u32,
        pairs_per_day: u32,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_names_offending_category() {
        let error = ConfigError::IndivisibleInstances {
            category: "upper".to_string(),
            instances: 10,
            days: 3,
        };
        assert!(error.to_string().contains("\"upper\""));
        assert!(error.to_string().contains("10 instances"));
    }
}
