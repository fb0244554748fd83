//! Exercise catalog - muscles, equipment, day categories and exercises

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::ConfigError;
use crate::model::objective::ObjectiveKind;
use crate::model::schedule::ScheduleStrategy;

/// Coefficients below this are not developmentally meaningful
pub const DEFAULT_ACTIVATION_FLOOR: f64 = 0.1;

/// Maximum muscle overlap (activation dot product) allowed inside a superset
pub const DEFAULT_OVERLAP_THRESHOLD: f64 = 0.2;

/// A muscle (or muscle head) with its weekly volume target in sets
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Muscle {
    pub id: String,
    /// 0 means untracked
    #[serde(default)]
    pub target: f64,
}

/// A class of training day with its weekly quota
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DayCategory {
    pub id: String,
    pub days: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pairs_per_day: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_instances: Option<u32>,
    /// How many full working sets one exercise instance counts for
    pub sets_per_instance: f64,
}

/// Resolved weekly quota of a day category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quota {
    pub instances: u32,
    pub pairs: u32,
    pub days: u32,
    pub pairs_per_day: u32,
}

impl DayCategory {
    /// Resolve instance and pair totals, rejecting quotas that cannot be
    /// split into whole pairs across the category's days.
    pub fn quota(&self) -> Result<Quota, ConfigError> {
        if self.days == 0 {
            return Err(ConfigError::NoDays(self.id.clone()));
        }
        if !self.sets_per_instance.is_finite() || self.sets_per_instance <= 0.0 {
            return Err(ConfigError::InvalidSetsPerInstance {
                category: self.id.clone(),
                value: self.sets_per_instance,
            });
        }

        let overflow = || ConfigError::QuotaOverflow(self.id.clone());
        let per_pair_day = self.days.checked_mul(2).ok_or_else(overflow)?;
        let (instances, pairs_per_day) = match (self.required_instances, self.pairs_per_day) {
            (None, None) => return Err(ConfigError::MissingQuota(self.id.clone())),
            (None, Some(pairs_per_day)) => (
                per_pair_day.checked_mul(pairs_per_day).ok_or_else(overflow)?,
                pairs_per_day,
            ),
            (Some(instances), None) => {
                if instances % per_pair_day != 0 {
                    return Err(ConfigError::IndivisibleInstances {
                        category: self.id.clone(),
                        instances,
                        days: self.days,
                    });
                }
                (instances, instances / per_pair_day)
            }
            (Some(instances), Some(pairs_per_day)) => {
                if instances % per_pair_day != 0 {
                    return Err(ConfigError::IndivisibleInstances {
                        category: self.id.clone(),
                        instances,
                        days: self.days,
                    });
                }
                let expected = per_pair_day.checked_mul(pairs_per_day).ok_or_else(overflow)?;
                if instances != expected {
                    return Err(ConfigError::QuotaMismatch {
                        category: self.id.clone(),
                        instances,
                        expected,
                    });
                }
                (instances, pairs_per_day)
            }
        };

        if instances == 0 {
            return Err(ConfigError::EmptyQuota(self.id.clone()));
        }

        Ok(Quota {
            instances,
            pairs: instances / 2,
            days: self.days,
            pairs_per_day,
        })
    }
}

/// A catalog exercise: where it may appear, what it trains, what it occupies
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Exercise {
    pub name: String,
    pub categories: Vec<String>,
    pub activation: BTreeMap<String, f64>,
    #[serde(default)]
    pub equipment: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_per_category: Option<u32>,
}

impl Exercise {
    pub fn allowed_in(&self, category: &str) -> bool {
        self.categories.iter().any(|c| c == category)
    }

    /// Two exercises on the same machine cannot run back to back.
    /// An exercise with any equipment therefore conflicts with itself.
    pub fn shares_equipment(&self, other: &Exercise) -> bool {
        self.equipment.iter().any(|e| other.equipment.contains(e))
    }

    /// Weekly uses allowed within one category. An explicit limit wins over
    /// the category's day count; both are clipped to the category total.
    pub fn usage_cap(&self, quota: &Quota) -> u32 {
        self.max_per_category
            .unwrap_or(quota.days)
            .min(quota.instances)
    }
}

/// Tunable knobs of one solve
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Tuning {
    pub overlap_threshold: f64,
    pub activation_floor: f64,
    pub objective: ObjectiveKind,
    pub schedule: ScheduleStrategy,
    pub parallel_days: bool,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            overlap_threshold: DEFAULT_OVERLAP_THRESHOLD,
            activation_floor: DEFAULT_ACTIVATION_FLOOR,
            objective: ObjectiveKind::default(),
            schedule: ScheduleStrategy::default(),
            parallel_days: false,
        }
    }
}

/// Everything one solve reads. Immutable once validated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Catalog {
    pub muscles: Vec<Muscle>,
    #[serde(default)]
    pub equipment: Vec<String>,
    pub categories: Vec<DayCategory>,
    pub exercises: Vec<Exercise>,
    #[serde(default)]
    pub tuning: Tuning,
}

impl Catalog {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Failed to parse catalog JSON")
    }

    /// Load a catalog from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read catalog {}", path.display()))?;
        Self::from_json(&json).with_context(|| format!("Invalid catalog {}", path.display()))
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize catalog")
    }

    pub fn muscle_index(&self, id: &str) -> Option<usize> {
        self.muscles.iter().position(|m| m.id == id)
    }

    pub fn exercise_index(&self, name: &str) -> Option<usize> {
        self.exercises.iter().position(|e| e.name == name)
    }

    /// SHA-256 of the compact catalog JSON, used to compare stored plans
    pub fn fingerprint(&self) -> Result<String> {
        let json = serde_json::to_string(self).context("Failed to serialize catalog")?;
        let mut hasher = Sha256::new();
        hasher.update(json.as_bytes());
        Ok(hex::encode(hasher.finalize()))
    }

    /// Check every cross reference and resolve category quotas.
    /// Returned quotas are index-aligned with `categories`.
    pub fn validate(&self) -> Result<Vec<Quota>, ConfigError> {
        if self.muscles.is_empty() {
            return Err(ConfigError::NoMuscles);
        }
        if self.exercises.is_empty() {
            return Err(ConfigError::NoExercises);
        }
        if self.categories.is_empty() {
            return Err(ConfigError::NoCategories);
        }

        let tuning = &self.tuning;
        if !tuning.overlap_threshold.is_finite() || tuning.overlap_threshold < 0.0 {
            return Err(ConfigError::InvalidThreshold(tuning.overlap_threshold));
        }
        if !(0.0..=1.0).contains(&tuning.activation_floor) {
            return Err(ConfigError::InvalidFloor(tuning.activation_floor));
        }
        tuning.objective.validate()?;

        let mut muscles = HashSet::new();
        for muscle in &self.muscles {
            if !muscles.insert(muscle.id.as_str()) {
                return Err(ConfigError::DuplicateMuscle(muscle.id.clone()));
            }
            if !muscle.target.is_finite() || muscle.target < 0.0 {
                return Err(ConfigError::InvalidTarget {
                    muscle: muscle.id.clone(),
                    target: muscle.target,
                });
            }
        }

        let mut equipment = HashSet::new();
        for tag in &self.equipment {
            if !equipment.insert(tag.as_str()) {
                return Err(ConfigError::DuplicateEquipment(tag.clone()));
            }
        }

        let mut categories = HashSet::new();
        let mut quotas = Vec::with_capacity(self.categories.len());
        for category in &self.categories {
            if !categories.insert(category.id.as_str()) {
                return Err(ConfigError::DuplicateCategory(category.id.clone()));
            }
            quotas.push(category.quota()?);
        }

        let mut names = HashSet::new();
        for exercise in &self.exercises {
            if !names.insert(exercise.name.as_str()) {
                return Err(ConfigError::DuplicateExercise(exercise.name.clone()));
            }
            if exercise.categories.is_empty() {
                return Err(ConfigError::ExerciseWithoutCategory(exercise.name.clone()));
            }
            for category in &exercise.categories {
                if !categories.contains(category.as_str()) {
                    return Err(ConfigError::UnknownCategory {
                        exercise: exercise.name.clone(),
                        category: category.clone(),
                    });
                }
            }
            for (muscle, &value) in &exercise.activation {
                if !muscles.contains(muscle.as_str()) {
                    return Err(ConfigError::UnknownMuscle {
                        exercise: exercise.name.clone(),
                        muscle: muscle.clone(),
                    });
                }
                if !(0.0..=1.0).contains(&value) {
                    return Err(ConfigError::ActivationOutOfRange {
                        exercise: exercise.name.clone(),
                        muscle: muscle.clone(),
                        value,
                    });
                }
            }
            for tag in &exercise.equipment {
                if !equipment.contains(tag.as_str()) {
                    return Err(ConfigError::UnknownEquipment {
                        exercise: exercise.name.clone(),
                        equipment: tag.clone(),
                    });
                }
            }
        }

        Ok(quotas)
    }
}

// === Built-in catalog ===

pub const UPPER: &str = "upper";
pub const LOWER: &str = "lower";

const SETS_PER_INSTANCE: f64 = 4.6;

const MUSCLE_TARGETS: &[(&str, f64)] = &[
    ("chest", 12.0),
    ("upper_back", 10.0),
    ("lats", 12.0),
    ("ant_deltoid", 8.0),
    ("lat_deltoid", 8.0),
    ("post_deltoid", 8.0),
    ("biceps", 8.0),
    ("triceps", 8.0),
    ("quads", 12.0),
    ("hamstrings", 10.0),
    ("glutes", 12.0),
    ("calves", 8.0),
    ("core", 8.0),
    ("obliques", 6.0),
    ("erectors", 6.0),
    ("forearms", 4.0),
    ("adductors", 6.0),
    ("abductors", 6.0),
    ("neck", 3.0),
];

const MACHINES: &[&str] = &[
    "leg_press",
    "chest_press",
    "leg_curl",
    "lat_pulldown",
    "seated_row",
    "cable",
];

struct BuiltinExercise {
    name: &'static str,
    categories: &'static [&'static str],
    muscles: &'static [(&'static str, f64)],
    equipment: &'static [&'static str],
}

const BUILTIN_EXERCISES: &[BuiltinExercise] = &[
    // Upper
    BuiltinExercise {
        name: "Chest Press (machine/band)",
        categories: &[UPPER],
        muscles: &[("chest", 0.95), ("ant_deltoid", 0.30), ("triceps", 0.40), ("forearms", 0.20)],
        equipment: &["chest_press"],
    },
    BuiltinExercise {
        name: "Push-ups (standard/incline/decline)",
        categories: &[UPPER],
        muscles: &[("chest", 0.88), ("ant_deltoid", 0.25), ("triceps", 0.35), ("core", 0.25)],
        equipment: &[],
    },
    BuiltinExercise {
        name: "Cable / Band Chest Fly",
        categories: &[UPPER],
        muscles: &[("chest", 0.85), ("ant_deltoid", 0.20)],
        equipment: &["cable"],
    },
    BuiltinExercise {
        name: "Row (seated/band/all)",
        categories: &[UPPER],
        muscles: &[("upper_back", 0.92), ("lats", 0.42), ("biceps", 0.36), ("post_deltoid", 0.28)],
        equipment: &["seated_row"],
    },
    BuiltinExercise {
        name: "Face Pull (band/cable)",
        categories: &[UPPER],
        muscles: &[("post_deltoid", 0.85), ("upper_back", 0.40), ("lats", 0.15)],
        equipment: &["cable"],
    },
    BuiltinExercise {
        name: "Lat Pulldown (machine)",
        categories: &[UPPER],
        muscles: &[("lats", 0.93), ("upper_back", 0.35), ("biceps", 0.30)],
        equipment: &["lat_pulldown"],
    },
    BuiltinExercise {
        name: "Overhead Press (cable/band)",
        categories: &[UPPER],
        muscles: &[("ant_deltoid", 0.82), ("lat_deltoid", 0.36), ("triceps", 0.38), ("core", 0.22)],
        equipment: &["cable"],
    },
    BuiltinExercise {
        name: "Pike Push-ups (vertical press)",
        categories: &[UPPER],
        muscles: &[("ant_deltoid", 0.72), ("triceps", 0.34), ("core", 0.25)],
        equipment: &[],
    },
    BuiltinExercise {
        name: "Cable Lateral Raise",
        categories: &[UPPER],
        muscles: &[("lat_deltoid", 0.92), ("ant_deltoid", 0.15)],
        equipment: &["cable"],
    },
    BuiltinExercise {
        name: "Biceps Curl (band/cable)",
        categories: &[UPPER],
        muscles: &[("biceps", 0.92), ("forearms", 0.30)],
        equipment: &["cable"],
    },
    BuiltinExercise {
        name: "Hammer / Neutral Curl",
        categories: &[UPPER],
        muscles: &[("biceps", 0.45), ("forearms", 0.92)],
        equipment: &[],
    },
    BuiltinExercise {
        name: "Triceps (pushdown / overhead merged)",
        categories: &[UPPER],
        muscles: &[("triceps", 0.92)],
        equipment: &["cable"],
    },
    BuiltinExercise {
        name: "Close-Grip Press (machine/band)",
        categories: &[UPPER],
        muscles: &[("triceps", 0.62), ("chest", 0.30), ("ant_deltoid", 0.20)],
        equipment: &["chest_press"],
    },
    BuiltinExercise {
        name: "Band Shrug / Cable Shrug",
        categories: &[UPPER],
        muscles: &[("neck", 0.90), ("upper_back", 0.30)],
        equipment: &[],
    },
    // Both
    BuiltinExercise {
        name: "Side Plank High Pull (cable/band)",
        categories: &[UPPER, LOWER],
        muscles: &[("obliques", 0.92), ("lats", 0.30), ("upper_back", 0.30), ("ant_deltoid", 0.18)],
        equipment: &["cable"],
    },
    // Lower
    BuiltinExercise {
        name: "Glute Bridge with abduction + Band Pull-Apart",
        categories: &[LOWER],
        muscles: &[
            ("glutes", 0.82),
            ("hamstrings", 0.28),
            ("post_deltoid", 0.30),
            ("erectors", 0.25),
            ("abductors", 0.70),
        ],
        equipment: &[],
    },
    BuiltinExercise {
        name: "Pallof Press (band/cable)",
        categories: &[LOWER],
        muscles: &[("core", 0.92), ("obliques", 0.35)],
        equipment: &["cable"],
    },
    BuiltinExercise {
        name: "Leg Press / Front Squat (quad-dominant)",
        categories: &[LOWER],
        muscles: &[("quads", 0.95), ("glutes", 0.45), ("core", 0.28), ("hamstrings", 0.15)],
        equipment: &["leg_press"],
    },
    BuiltinExercise {
        name: "Leg Press (sumo/wide)",
        categories: &[LOWER],
        muscles: &[("adductors", 0.65), ("glutes", 0.70), ("quads", 0.45)],
        equipment: &["leg_press"],
    },
    BuiltinExercise {
        name: "Seated / Lying Leg Curl (machine)",
        categories: &[LOWER],
        muscles: &[("hamstrings", 0.95)],
        equipment: &["leg_curl"],
    },
    BuiltinExercise {
        name: "Cable Pull-Through",
        categories: &[LOWER],
        muscles: &[("glutes", 0.92), ("hamstrings", 0.30), ("erectors", 0.28)],
        equipment: &["cable"],
    },
    BuiltinExercise {
        name: "Mini-Band Lateral Walk",
        categories: &[LOWER],
        muscles: &[("glutes", 0.80), ("abductors", 0.70)],
        equipment: &[],
    },
    BuiltinExercise {
        name: "Calf Raise (leg press machine)",
        categories: &[LOWER],
        muscles: &[("calves", 0.95)],
        equipment: &["leg_press"],
    },
    BuiltinExercise {
        name: "Cable Woodchopper / Chop",
        categories: &[LOWER],
        muscles: &[("obliques", 0.92), ("core", 0.30)],
        equipment: &["cable"],
    },
    BuiltinExercise {
        name: "Good Morning (band/cable)",
        categories: &[LOWER],
        muscles: &[("erectors", 0.90), ("glutes", 0.25), ("hamstrings", 0.20)],
        equipment: &["cable"],
    },
    BuiltinExercise {
        name: "Banded Monster Walk",
        categories: &[LOWER],
        muscles: &[("abductors", 0.85), ("glutes", 0.60)],
        equipment: &[],
    },
    BuiltinExercise {
        name: "Cable Standing Hip Abduction",
        categories: &[LOWER],
        muscles: &[("abductors", 0.90), ("glutes", 0.30)],
        equipment: &["cable"],
    },
    BuiltinExercise {
        name: "Copenhagen Plank (adductor focus)",
        categories: &[LOWER],
        muscles: &[("adductors", 0.92), ("core", 0.25), ("glutes", 0.20)],
        equipment: &[],
    },
    BuiltinExercise {
        name: "Band Supine Hip Abduction",
        categories: &[LOWER],
        muscles: &[("abductors", 0.92), ("glutes", 0.35), ("core", 0.25)],
        equipment: &[],
    },
];

impl From<&BuiltinExercise> for Exercise {
    fn from(value: &BuiltinExercise) -> Self {
        Exercise {
            name: value.name.to_string(),
            categories: value.categories.iter().map(|c| c.to_string()).collect(),
            activation: value
                .muscles
                .iter()
                .map(|(m, a)| (m.to_string(), *a))
                .collect(),
            equipment: value.equipment.iter().map(|e| e.to_string()).collect(),
            max_per_category: None,
        }
    }
}

/// Upper/lower split, three days each, two supersets per day
pub fn builtin() -> Catalog {
    let day = |id: &str| DayCategory {
        id: id.to_string(),
        days: 3,
        pairs_per_day: Some(2),
        required_instances: Some(12),
        sets_per_instance: SETS_PER_INSTANCE,
    };

    Catalog {
        muscles: MUSCLE_TARGETS
            .iter()
            .map(|(id, target)| Muscle {
                id: id.to_string(),
                target: *target,
            })
            .collect(),
        equipment: MACHINES.iter().map(|m| m.to_string()).collect(),
        categories: vec![day(UPPER), day(LOWER)],
        exercises: BUILTIN_EXERCISES.iter().map(Exercise::from).collect(),
        tuning: Tuning::default(),
    }
}
