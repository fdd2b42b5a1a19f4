//! Group selection (`--only` / `--skip`).

use std::collections::BTreeSet;

use crate::error::{ConfigError, Result};

use super::plan::{GroupName, GroupPlan};

/// Which groups participate in a run.
///
/// A group is selected iff `only` is empty or contains it, and `skip` does
/// not contain it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    /// Groups to run exclusively; empty means all.
    only: BTreeSet<String>,
    /// Groups to leave out.
    skip: BTreeSet<String>,
}

impl Selection {
    /// Creates a selection from `only` and `skip` name lists.
    #[must_use]
    pub fn new<I, J, S, T>(only: I, skip: J) -> Self
    where
        I: IntoIterator<Item = S>,
        J: IntoIterator<Item = T>,
        S: Into<String>,
        T: Into<String>,
    {
        Self {
            only: only.into_iter().map(Into::into).collect(),
            skip: skip.into_iter().map(Into::into).collect(),
        }
    }

    /// A selection that includes every group.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Returns true if the group takes part in the run.
    #[must_use]
    pub fn is_selected(&self, name: &GroupName) -> bool {
        (self.only.is_empty() || self.only.contains(name.as_str()))
            && !self.skip.contains(name.as_str())
    }

    /// Checks the selection against a plan before anything runs.
    ///
    /// # Errors
    ///
    /// Returns a configuration error naming the first `only`/`skip` entry that
    /// is not in the plan, or a name that is both selected and skipped.
    pub fn validate(&self, plan: &GroupPlan) -> Result<()> {
        for (flag, names) in [("only", &self.only), ("skip", &self.skip)] {
            if let Some(name) = names.iter().find(|n| !plan.contains(n)) {
                return Err(ConfigError::UnknownGroup {
                    flag,
                    name: name.clone(),
                }
                .into());
            }
        }
        if let Some(name) = self.only.intersection(&self.skip).next() {
            return Err(ConfigError::ConflictingSelection { name: name.clone() }.into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Group;
    use std::collections::BTreeMap;

    fn plan_of(names: &[&str]) -> GroupPlan {
        let groups = names.iter().map(|n| Group::new(*n, vec![])).collect();
        GroupPlan::new(groups, BTreeMap::new()).unwrap()
    }

    #[test]
    fn test_is_selected() {
        let none: [&str; 0] = [];
        let cases = [
            (Selection::new(none, none), "green", true),
            (Selection::new(["green"], none), "green", true),
            (Selection::new(["green"], none), "blue", false),
            (Selection::new(none, ["green"]), "green", false),
            (Selection::new(none, ["green"]), "blue", true),
        ];
        for (selection, group, want) in cases {
            assert_eq!(selection.is_selected(&GroupName::new(group)), want, "{selection:?} {group}");
        }
    }

    #[test]
    fn test_validate() {
        let none: [&str; 0] = [];
        assert!(Selection::all().validate(&plan_of(&["green"])).is_ok());
        assert!(Selection::new(["green"], none).validate(&plan_of(&["green"])).is_ok());
        assert!(Selection::new(["green"], none).validate(&plan_of(&["blue"])).is_err());
        assert!(Selection::new(none, ["green"]).validate(&plan_of(&["green"])).is_ok());
        assert!(Selection::new(none, ["green"]).validate(&plan_of(&["blue"])).is_err());
        assert!(
            Selection::new(["green"], ["blue"])
                .validate(&plan_of(&["green", "blue"]))
                .is_ok()
        );
    }

    #[test]
    fn test_validate_names_first_unknown_entry() {
        let none: [&str; 0] = [];
        let err = Selection::new(["green", "mauve"], none)
            .validate(&plan_of(&["green"]))
            .unwrap_err();
        assert!(err.to_string().contains("\"mauve\""));
        assert!(err.to_string().contains("--only"));
    }

    #[test]
    fn test_overlapping_only_and_skip_rejected_in_any_order() {
        for names in [["a", "b"], ["b", "a"]] {
            let err = Selection::new(["a"], ["a"]).validate(&plan_of(&names)).unwrap_err();
            assert!(err.to_string().contains("cannot be both selected"));
        }
    }
}
