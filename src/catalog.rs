use anyhow::Context;
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::fmt;
use std::path::Path;

/// Catalog shipped with the binary. A workspace may override it with
/// `nazim.rules.json` (same shape) next to the database file.
const DEFAULT_RULES_JSON: &str = include_str!("rules.default.json");

pub const WORKSPACE_RULES_FILE: &str = "nazim.rules.json";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    UnknownPlan(String),
    UnknownFeature {
        key: String,
        required_by: Option<String>,
    },
    DependencyCycle(Vec<String>),
}

impl CatalogError {
    pub fn code(&self) -> &'static str {
        match self {
            CatalogError::UnknownPlan(_) => "unknown_plan",
            CatalogError::UnknownFeature { .. } => "unknown_feature",
            CatalogError::DependencyCycle(_) => "dependency_cycle",
        }
    }
}

impl fmt::Display for CatalogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CatalogError::UnknownPlan(plan) => {
                write!(f, "plan '{}' is not in the plan order", plan)
            }
            CatalogError::UnknownFeature {
                key,
                required_by: Some(by),
            } => write!(f, "feature '{}' (required by '{}') is not in the catalog", key, by),
            CatalogError::UnknownFeature {
                key,
                required_by: None,
            } => write!(f, "feature '{}' is not in the catalog", key),
            CatalogError::DependencyCycle(path) => {
                write!(f, "feature dependency cycle: {}", path.join(" -> "))
            }
        }
    }
}

impl std::error::Error for CatalogError {}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FeatureSpec {
    #[serde(default)]
    pub dependencies: Vec<String>,
    /// UI grouping only. Never consulted during resolution.
    #[serde(default)]
    pub parent: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RulesConfig {
    pub plan_order: Vec<String>,
    pub features: BTreeMap<String, FeatureSpec>,
    pub plan_grants: BTreeMap<String, BTreeSet<String>>,
}

/// Validated, immutable feature catalog with per-plan resolution cached at
/// load. The catalog never changes during the process lifetime except via an
/// explicit `rules.reload`, which swaps the whole value.
#[derive(Debug, Clone)]
pub struct Catalog {
    plan_order: Vec<String>,
    features: BTreeMap<String, FeatureSpec>,
    plan_grants: BTreeMap<String, BTreeSet<String>>,
    resolved: HashMap<String, BTreeSet<String>>,
}

impl Catalog {
    pub fn from_config(cfg: RulesConfig) -> Result<Self, CatalogError> {
        validate(&cfg)?;

        let mut catalog = Catalog {
            plan_order: cfg.plan_order,
            features: cfg.features,
            plan_grants: cfg.plan_grants,
            resolved: HashMap::new(),
        };
        for plan in catalog.plan_order.clone() {
            let set = catalog.resolve_cold(&plan)?;
            catalog.resolved.insert(plan, set);
        }
        Ok(catalog)
    }

    pub fn from_json(text: &str) -> anyhow::Result<Self> {
        let cfg: RulesConfig =
            serde_json::from_str(text).context("parse rules config json")?;
        Ok(Self::from_config(cfg)?)
    }

    pub fn load_default() -> anyhow::Result<Self> {
        Self::from_json(DEFAULT_RULES_JSON).context("embedded default rules")
    }

    /// Load the workspace rules file if present, otherwise the embedded
    /// default. Returns whether a workspace override was used.
    pub fn load_for_workspace(workspace: &Path) -> anyhow::Result<(Self, bool)> {
        let path = workspace.join(WORKSPACE_RULES_FILE);
        if path.is_file() {
            let text = std::fs::read_to_string(&path)
                .with_context(|| format!("read {}", path.display()))?;
            let catalog = Self::from_json(&text)
                .with_context(|| format!("load {}", path.display()))?;
            Ok((catalog, true))
        } else {
            Ok((Self::load_default()?, false))
        }
    }

    pub fn plan_order(&self) -> &[String] {
        &self.plan_order
    }

    /// Complete feature set for a plan: explicit grants for the plan and all
    /// plans ordered before it, closed over declared dependencies.
    pub fn resolve_features_for_plan(
        &self,
        plan: &str,
    ) -> Result<&BTreeSet<String>, CatalogError> {
        self.resolved
            .get(plan)
            .ok_or_else(|| CatalogError::UnknownPlan(plan.to_string()))
    }

    pub fn has_feature(&self, plan: &str, feature: &str) -> Result<bool, CatalogError> {
        if !self.features.contains_key(feature) {
            return Err(CatalogError::UnknownFeature {
                key: feature.to_string(),
                required_by: None,
            });
        }
        Ok(self.resolve_features_for_plan(plan)?.contains(feature))
    }

    /// Uncached resolution. Used to build the startup cache; kept separate so
    /// tests can compare cold and cached answers.
    fn resolve_cold(&self, plan: &str) -> Result<BTreeSet<String>, CatalogError> {
        let pos = self
            .plan_order
            .iter()
            .position(|p| p == plan)
            .ok_or_else(|| CatalogError::UnknownPlan(plan.to_string()))?;

        // Plan inheritance: union of explicit grants up to and including plan.
        let mut included: BTreeSet<String> = self.plan_order[..=pos]
            .iter()
            .filter_map(|p| self.plan_grants.get(p))
            .flatten()
            .cloned()
            .collect();

        // Dependency closure, work-queue BFS. The visited set guarantees
        // termination independently of the acyclicity invariant.
        let mut queue: VecDeque<String> = included.iter().cloned().collect();
        let mut visited: BTreeSet<String> = BTreeSet::new();
        while let Some(key) = queue.pop_front() {
            if !visited.insert(key.clone()) {
                continue;
            }
            let spec = self.features.get(&key).ok_or_else(|| {
                CatalogError::UnknownFeature {
                    key: key.clone(),
                    required_by: Some(plan.to_string()),
                }
            })?;
            for dep in &spec.dependencies {
                included.insert(dep.clone());
                if !visited.contains(dep) {
                    queue.push_back(dep.clone());
                }
            }
        }
        Ok(included)
    }
}

fn validate(cfg: &RulesConfig) -> Result<(), CatalogError> {
    for (key, spec) in &cfg.features {
        for dep in &spec.dependencies {
            if !cfg.features.contains_key(dep) {
                return Err(CatalogError::UnknownFeature {
                    key: dep.clone(),
                    required_by: Some(key.clone()),
                });
            }
        }
    }
    for (plan, grants) in &cfg.plan_grants {
        if !cfg.plan_order.iter().any(|p| p == plan) {
            return Err(CatalogError::UnknownPlan(plan.clone()));
        }
        for key in grants {
            if !cfg.features.contains_key(key) {
                return Err(CatalogError::UnknownFeature {
                    key: key.clone(),
                    required_by: Some(plan.clone()),
                });
            }
        }
    }
    detect_cycles(&cfg.features)
}

/// Iterative three-color DFS over the dependency graph. Reports the first
/// cycle found as a key path.
fn detect_cycles(features: &BTreeMap<String, FeatureSpec>) -> Result<(), CatalogError> {
    #[derive(Clone, Copy, PartialEq)]
    enum Color {
        White,
        Gray,
        Black,
    }

    let mut color: BTreeMap<&str, Color> =
        features.keys().map(|k| (k.as_str(), Color::White)).collect();

    for root in features.keys() {
        if color[root.as_str()] != Color::White {
            continue;
        }
        // Stack of (node, next dependency index).
        let mut stack: Vec<(&str, usize)> = vec![(root.as_str(), 0)];
        color.insert(root.as_str(), Color::Gray);

        while let Some(&(node, idx)) = stack.last() {
            let deps = &features[node].dependencies;
            if idx >= deps.len() {
                color.insert(node, Color::Black);
                stack.pop();
                continue;
            }
            if let Some(entry) = stack.last_mut() {
                entry.1 += 1;
            }
            let dep = deps[idx].as_str();
            match color.get(dep).copied().unwrap_or(Color::White) {
                Color::Gray => {
                    let mut path: Vec<String> = stack
                        .iter()
                        .skip_while(|(n, _)| *n != dep)
                        .map(|(n, _)| n.to_string())
                        .collect();
                    path.push(dep.to_string());
                    return Err(CatalogError::DependencyCycle(path));
                }
                Color::White => {
                    color.insert(dep, Color::Gray);
                    stack.push((dep, 0));
                }
                Color::Black => {}
            }
        }
    }
    Ok(())
}
