//! Module unlock chain.
//!
//! Modules name their prerequisites by title. The catalog resolves those
//! titles to module ids once, when it is built, so unlock checks only compare
//! ids against the learner's completed modules.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

use crate::models::{LearningModule, ModuleProgress, ProgressStatus};

/// What a prerequisite title that matches no module means.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnresolvedPrerequisitePolicy {
    /// The module stays locked.
    #[default]
    Lock,
    /// The prerequisite is skipped.
    Ignore,
}

impl FromStr for UnresolvedPrerequisitePolicy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "lock" => Ok(Self::Lock),
            "ignore" => Ok(Self::Ignore),
            other => Err(format!(
                "unknown prerequisite policy '{}' (expected 'lock' or 'ignore')",
                other
            )),
        }
    }
}

impl fmt::Display for UnresolvedPrerequisitePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Lock => f.write_str("lock"),
            Self::Ignore => f.write_str("ignore"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnresolvedPrerequisite {
    pub module_id: String,
    pub title: String,
}

/// Module list with prerequisite titles resolved to module ids.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "Vec<LearningModule>", into = "Vec<LearningModule>")]
pub struct ModuleCatalog {
    modules: Vec<LearningModule>,
    positions: HashMap<String, usize>,
    requirements: HashMap<String, Vec<String>>,
    unresolved: Vec<UnresolvedPrerequisite>,
}

impl From<Vec<LearningModule>> for ModuleCatalog {
    fn from(modules: Vec<LearningModule>) -> Self {
        Self::build(modules)
    }
}

impl From<ModuleCatalog> for Vec<LearningModule> {
    fn from(catalog: ModuleCatalog) -> Self {
        catalog.modules
    }
}

impl ModuleCatalog {
    pub fn build(mut modules: Vec<LearningModule>) -> Self {
        modules.sort_by_key(|module| module.order);

        let positions: HashMap<String, usize> = modules
            .iter()
            .enumerate()
            .map(|(position, module)| (module.id.clone(), position))
            .collect();

        // First module (by order) wins when titles collide.
        let mut by_title: HashMap<&str, &str> = HashMap::new();
        for module in &modules {
            by_title.entry(module.title.as_str()).or_insert(module.id.as_str());
        }

        let mut requirements = HashMap::new();
        let mut unresolved = Vec::new();

        for module in &modules {
            let mut ids = Vec::with_capacity(module.prerequisites.len());
            for title in &module.prerequisites {
                let resolved = by_title
                    .get(title.as_str())
                    .map(|id| id.to_string())
                    .or_else(|| positions.contains_key(title).then(|| title.clone()));

                match resolved {
                    Some(id) => ids.push(id),
                    None => {
                        tracing::warn!(
                            "Module {} lists prerequisite '{}' which matches no module",
                            module.id,
                            title
                        );
                        unresolved.push(UnresolvedPrerequisite {
                            module_id: module.id.clone(),
                            title: title.clone(),
                        });
                    }
                }
            }
            requirements.insert(module.id.clone(), ids);
        }

        Self {
            modules,
            positions,
            requirements,
            unresolved,
        }
    }

    pub fn modules(&self) -> &[LearningModule] {
        &self.modules
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    pub fn get(&self, module_id: &str) -> Option<&LearningModule> {
        self.positions
            .get(module_id)
            .and_then(|&position| self.modules.get(position))
    }

    /// Resolved prerequisite ids of `module_id`.
    pub fn requirements(&self, module_id: &str) -> &[String] {
        self.requirements
            .get(module_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn unresolved(&self) -> &[UnresolvedPrerequisite] {
        &self.unresolved
    }

    fn has_unresolved(&self, module_id: &str) -> bool {
        self.unresolved.iter().any(|u| u.module_id == module_id)
    }

    /// Whether `module_id` is open to a learner whose progress records are
    /// `progress`. Unknown modules are locked.
    pub fn is_unlocked(
        &self,
        module_id: &str,
        progress: &[ModuleProgress],
        policy: UnresolvedPrerequisitePolicy,
    ) -> bool {
        if self.get(module_id).is_none() {
            return false;
        }

        if policy == UnresolvedPrerequisitePolicy::Lock && self.has_unresolved(module_id) {
            return false;
        }

        let completed = completed_modules(progress);
        self.requirements(module_id)
            .iter()
            .all(|required| completed.contains(required.as_str()))
    }

    /// Modules that list `module_id` among their resolved prerequisites.
    pub fn dependents_of(&self, module_id: &str) -> Vec<&LearningModule> {
        self.modules
            .iter()
            .filter(|module| {
                self.requirements(&module.id)
                    .iter()
                    .any(|required| required == module_id)
            })
            .collect()
    }
}

fn completed_modules(progress: &[ModuleProgress]) -> HashSet<&str> {
    progress
        .iter()
        .filter(|record| record.status == ProgressStatus::Completed)
        .map(|record| record.module_id.as_str())
        .collect()
}
