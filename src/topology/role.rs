//! Module roles and role sets.
//!
//! A role set is how an application layout is expressed on the command line:
//! `gr` means "generators and reversers", `v` means "the validator". The
//! letters are parsed once, here, into typed values.

use crate::error::ConfigurationError;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Pipeline stage a module instance plays.
///
/// Variant order is the downstream data order and is relied on for sorting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Role {
    Generator,
    Reverser,
    Validator,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Generator, Role::Reverser, Role::Validator];

    /// Plugin name the application framework loads for this role.
    pub fn plugin(self) -> &'static str {
        match self {
            Role::Generator => "RandomDataListGenerator",
            Role::Reverser => "ListReverser",
            Role::Validator => "ReversedListValidator",
        }
    }

    /// Schema module holding this role's `ConfParams` type.
    pub fn schema_module(self) -> &'static str {
        match self {
            Role::Generator => "randomdatalistgenerator",
            Role::Reverser => "listreverser",
            Role::Validator => "reversedlistvalidator",
        }
    }

    pub fn letter(self) -> char {
        match self {
            Role::Generator => 'g',
            Role::Reverser => 'r',
            Role::Validator => 'v',
        }
    }

    fn from_letter(c: char) -> Option<Role> {
        match c {
            'g' => Some(Role::Generator),
            'r' => Some(Role::Reverser),
            'v' => Some(Role::Validator),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.plugin())
    }
}

/// Non-empty set of roles hosted by one application.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct RoleSet(BTreeSet<Role>);

impl RoleSet {
    pub fn contains(&self, role: Role) -> bool {
        self.0.contains(&role)
    }

    pub fn iter(&self) -> impl Iterator<Item = Role> + '_ {
        self.0.iter().copied()
    }

    /// Canonical letters, e.g. `gr`.
    pub fn letters(&self) -> String {
        self.0.iter().map(|r| r.letter()).collect()
    }
}

impl FromIterator<Role> for RoleSet {
    fn from_iter<I: IntoIterator<Item = Role>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl FromStr for RoleSet {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut roles = BTreeSet::new();
        for c in s.trim().chars() {
            let role = Role::from_letter(c.to_ascii_lowercase()).ok_or_else(|| {
                ConfigurationError::InvalidLayout(format!(
                    "unknown role letter {:?} in {:?} (expected g, r or v)",
                    c, s
                ))
            })?;
            if !roles.insert(role) {
                return Err(ConfigurationError::InvalidLayout(format!(
                    "role {:?} repeated in {:?}",
                    c, s
                )));
            }
        }
        if roles.is_empty() {
            return Err(ConfigurationError::InvalidLayout(
                "empty role set".to_string(),
            ));
        }
        Ok(Self(roles))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("gr", "gr")]
    #[case("rg", "gr")]
    #[case("V", "v")]
    #[case("vrg", "grv")]
    fn parses_to_canonical_letters(#[case] input: &str, #[case] letters: &str) {
        let set: RoleSet = input.parse().unwrap();
        assert_eq!(set.letters(), letters);
    }

    #[rstest]
    #[case("")]
    #[case("gx")]
    #[case("gg")]
    #[case("s")]
    fn rejects_bad_role_sets(#[case] input: &str) {
        let err = input.parse::<RoleSet>().unwrap_err();
        assert!(matches!(err, ConfigurationError::InvalidLayout(_)));
    }

    #[test]
    fn roles_sort_in_data_order() {
        let mut roles = vec![Role::Validator, Role::Generator, Role::Reverser];
        roles.sort();
        assert_eq!(roles, Role::ALL.to_vec());
    }
}
