use std::borrow::Cow;
use std::collections::{HashMap, HashSet};

use crate::error::{CdpError, Result};
use crate::stealth::StealthLevel;

/// The patches a minimum level profile gets.
const ESSENTIAL_PATCHES: &[&str] = &["webdriver_basic", "chrome_runtime_basic", "user_agent_basic"];

/// Prefix marking patches that only the maximum level injects.
const EXPERIMENTAL_PREFIX: &str = "experimental_";

/// One self contained stealth script.
#[derive(Debug, Clone)]
pub struct Patch {
    pub name: Cow<'static, str>,
    pub script: Cow<'static, str>,
    pub description: Cow<'static, str>,
    /// Lower priorities inject first
    pub priority: i32,
    /// Names of patches that must inject before this one
    pub dependencies: Vec<Cow<'static, str>>,
}

/// Populates a [`PatchRegistry`] at startup. The only writer the registry
/// ever has; once built, the registry is read-only.
#[derive(Debug, Default)]
pub struct PatchRegistryBuilder {
    patches: Vec<Patch>,
    by_name: HashMap<String, usize>,
}

impl PatchRegistryBuilder {
    /// Register a patch. Registering a name twice replaces the earlier patch
    /// in place, keeping its registration slot.
    pub fn register(
        &mut self,
        name: impl Into<Cow<'static, str>>,
        script: impl Into<Cow<'static, str>>,
        priority: i32,
        dependencies: &[&'static str],
        description: impl Into<Cow<'static, str>>,
    ) -> &mut Self {
        let patch = Patch {
            name: name.into(),
            script: script.into(),
            description: description.into(),
            priority,
            dependencies: dependencies.iter().map(|d| Cow::Borrowed(*d)).collect(),
        };
        tracing::debug!(name = %patch.name, priority, "registering stealth patch");
        match self.by_name.get(patch.name.as_ref()) {
            Some(&idx) => self.patches[idx] = patch,
            None => {
                self.by_name
                    .insert(patch.name.to_string(), self.patches.len());
                self.patches.push(patch);
            }
        }
        self
    }

    pub fn build(self) -> PatchRegistry {
        PatchRegistry {
            patches: self.patches,
        }
    }
}

/// The process wide, immutable table of stealth patches.
#[derive(Debug)]
pub struct PatchRegistry {
    patches: Vec<Patch>,
}

impl PatchRegistry {
    pub fn builder() -> PatchRegistryBuilder {
        PatchRegistryBuilder::default()
    }

    /// A registry populated with the built in patch catalogue.
    pub fn with_builtin_patches() -> Self {
        let mut builder = Self::builder();
        crate::stealth::patches::register_builtin(&mut builder);
        builder.build()
    }

    pub fn len(&self) -> usize {
        self.patches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patches.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Patch> {
        self.patches.iter().find(|p| p.name == name)
    }

    /// The patches a profile of `level` selects, unordered.
    fn patches_for(&self, level: StealthLevel) -> Vec<&Patch> {
        self.patches
            .iter()
            .filter(|patch| match level {
                StealthLevel::Minimum => ESSENTIAL_PATCHES.contains(&patch.name.as_ref()),
                StealthLevel::Balanced => !patch.name.starts_with(EXPERIMENTAL_PREFIX),
                StealthLevel::Maximum => true,
            })
            .collect()
    }

    /// The patches of `level` in final injection order: priority ascending,
    /// then a depth first dependency resolution that emits every patch the
    /// first time it appears.
    ///
    /// A dependency cycle is an error; a dependency on a patch outside the
    /// selection is a warning and is skipped. The result is stable for a
    /// fixed registry and level.
    pub fn get_ordered_patches(&self, level: StealthLevel) -> Result<Vec<&Patch>> {
        let selected = self.patches_for(level);
        let by_name: HashMap<&str, &Patch> = selected
            .iter()
            .map(|patch| (patch.name.as_ref(), *patch))
            .collect();

        // registration order breaks priority ties, keeping the order stable
        let mut priority_sorted = selected.clone();
        priority_sorted.sort_by_key(|patch| patch.priority);

        let mut resolved: HashSet<&str> = HashSet::new();
        let mut processing: HashSet<&str> = HashSet::new();
        let mut ordered: Vec<&Patch> = Vec::with_capacity(priority_sorted.len());

        for patch in priority_sorted.iter().copied() {
            Self::resolve(patch, &by_name, &mut resolved, &mut processing, &mut ordered)?;
        }
        Ok(ordered)
    }

    fn resolve<'a>(
        patch: &'a Patch,
        by_name: &HashMap<&str, &'a Patch>,
        resolved: &mut HashSet<&'a str>,
        processing: &mut HashSet<&'a str>,
        ordered: &mut Vec<&'a Patch>,
    ) -> Result<()> {
        let name = patch.name.as_ref();
        if resolved.contains(name) {
            return Ok(());
        }
        if !processing.insert(name) {
            return Err(CdpError::Patch {
                patch: name.to_string(),
                message: "circular dependency".to_string(),
            });
        }
        for dep in &patch.dependencies {
            match by_name.get(dep.as_ref()) {
                Some(dep_patch) => {
                    Self::resolve(dep_patch, by_name, resolved, processing, ordered)?
                }
                None => {
                    tracing::warn!(patch = %name, dependency = %dep, "missing dependency, skipping");
                }
            }
        }
        processing.remove(name);
        resolved.insert(name);
        ordered.push(patch);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(patches: &[&Patch]) -> Vec<String> {
        patches.iter().map(|p| p.name.to_string()).collect()
    }

    #[test]
    fn orders_by_priority_then_dependencies() {
        let mut builder = PatchRegistry::builder();
        builder
            .register("a", "//a", 40, &[], "")
            .register("b", "//b", 41, &["a", "h"], "")
            .register("h", "//h", 39, &[], "");
        let registry = builder.build();

        let ordered = registry.get_ordered_patches(StealthLevel::Maximum).unwrap();
        assert_eq!(names(&ordered), vec!["h", "a", "b"]);
    }

    #[test]
    fn dependencies_precede_dependents_regardless_of_priority() {
        let mut builder = PatchRegistry::builder();
        builder
            .register("late_dep", "//", 90, &[], "")
            .register("early", "//", 10, &["late_dep"], "");
        let registry = builder.build();

        let ordered = registry.get_ordered_patches(StealthLevel::Maximum).unwrap();
        assert_eq!(names(&ordered), vec!["late_dep", "early"]);
    }

    #[test]
    fn ordering_is_stable_and_duplicate_free() {
        let registry = PatchRegistry::with_builtin_patches();
        let first = names(&registry.get_ordered_patches(StealthLevel::Maximum).unwrap());
        let second = names(&registry.get_ordered_patches(StealthLevel::Maximum).unwrap());
        assert_eq!(first, second);

        let mut deduped = first.clone();
        deduped.sort();
        deduped.dedup();
        assert_eq!(deduped.len(), first.len(), "every patch appears at most once");
    }

    #[test]
    fn builtin_dependencies_precede_their_dependents() {
        let registry = PatchRegistry::with_builtin_patches();
        let ordered = names(&registry.get_ordered_patches(StealthLevel::Maximum).unwrap());
        let position = |name: &str| ordered.iter().position(|n| n == name).unwrap();

        assert!(position("chrome_runtime_basic") < position("chrome_runtime_advanced"));
        assert!(position("chrome_helpers") < position("chrome_runtime_advanced"));
        assert!(position("chrome_runtime_advanced") < position("chrome_permissions"));
        assert!(position("plugins_basic") < position("plugins_advanced"));
    }

    #[test]
    fn cycles_are_rejected() {
        let mut builder = PatchRegistry::builder();
        builder
            .register("x", "//", 1, &["y"], "")
            .register("y", "//", 2, &["x"], "");
        let registry = builder.build();

        let err = registry
            .get_ordered_patches(StealthLevel::Maximum)
            .unwrap_err();
        assert!(matches!(err, CdpError::Patch { .. }));
    }

    #[test]
    fn missing_dependencies_warn_and_skip() {
        let mut builder = PatchRegistry::builder();
        builder.register("only", "//", 1, &["ghost"], "");
        let registry = builder.build();

        let ordered = registry.get_ordered_patches(StealthLevel::Maximum).unwrap();
        assert_eq!(names(&ordered), vec!["only"]);
    }

    #[test]
    fn reregistering_a_name_wins_and_stays_acyclic() {
        let mut builder = PatchRegistry::builder();
        builder
            .register("p", "// first", 10, &[], "")
            .register("p", "// second", 11, &[], "");
        let registry = builder.build();
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("p").unwrap().script, "// second");
        assert!(registry.get_ordered_patches(StealthLevel::Maximum).is_ok());
    }

    #[test]
    fn minimum_level_selects_the_essentials_only() {
        let registry = PatchRegistry::with_builtin_patches();
        let mut ordered = names(&registry.get_ordered_patches(StealthLevel::Minimum).unwrap());
        ordered.sort();
        assert_eq!(
            ordered,
            vec!["chrome_runtime_basic", "user_agent_basic", "webdriver_basic"]
        );
    }

    #[test]
    fn balanced_level_excludes_experimental_patches() {
        let registry = PatchRegistry::with_builtin_patches();
        let ordered = names(&registry.get_ordered_patches(StealthLevel::Balanced).unwrap());
        assert!(ordered.iter().all(|n| !n.starts_with("experimental_")));
        assert!(ordered.len() > 3);
    }

    #[test]
    fn maximum_level_includes_experimental_patches() {
        let registry = PatchRegistry::with_builtin_patches();
        let ordered = names(&registry.get_ordered_patches(StealthLevel::Maximum).unwrap());
        assert!(ordered.iter().any(|n| n.starts_with("experimental_")));
    }
}
