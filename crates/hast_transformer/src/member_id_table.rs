//! Numeric IDs the host uses to start hardware entry points.

use crate::error::TransformError;
use crate::tree::Member;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Bidirectional mapping between entry point names and dense member IDs.
///
/// IDs are assigned in sorted full-name order, so the same set of entry
/// points always yields the same table regardless of input order. Aliases
/// resolve to the ID of the member they belong to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberIdTable {
    ids: BTreeMap<String, u32>,
    names: BTreeMap<u32, String>,
}

impl MemberIdTable {
    /// Builds the table for `members`.
    ///
    /// Fails if two members, or a member and an alias, share a name.
    pub fn build<'a>(members: impl IntoIterator<Item = &'a Member>) -> Result<Self, TransformError> {
        let mut members: Vec<&Member> = members.into_iter().collect();
        members.sort_by(|a, b| a.full_name.cmp(&b.full_name));

        let mut table = Self::default();
        for (id, member) in (0u32..).zip(members) {
            table.insert(&member.full_name, id)?;
            table.names.insert(id, member.full_name.clone());
            for alias in &member.aliases {
                table.insert(alias, id)?;
            }
        }
        Ok(table)
    }

    fn insert(&mut self, name: &str, id: u32) -> Result<(), TransformError> {
        match self.ids.get(name) {
            Some(existing) if *existing == id => Ok(()),
            Some(_) => Err(TransformError::DuplicateMemberId(name.to_string())),
            None => {
                self.ids.insert(name.to_string(), id);
                Ok(())
            }
        }
    }

    /// ID of a member, by full name or alias.
    pub fn id_of(&self, name: &str) -> Option<u32> {
        self.ids.get(name).copied()
    }

    /// Full name of the member with `id`.
    pub fn name_of(&self, id: u32) -> Option<&str> {
        self.names.get(&id).map(String::as_str)
    }

    /// Number of members (aliases not counted).
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Returns `true` if the table has no members.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// `(id, full name)` pairs in ID order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &str)> {
        self.names.iter().map(|(id, name)| (*id, name.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn members() -> Vec<Member> {
        let mut run = Member::new("Samples.Prime::IsPrime()");
        run.aliases.push("Samples.Prime::IsPrimeAsync()".to_string());
        vec![
            Member::new("Samples.Fib::Compute()"),
            run,
            Member::new("Samples.Calc::Add()"),
        ]
    }

    #[test]
    fn ids_follow_sorted_names() {
        let members = members();
        let table = MemberIdTable::build(&members).unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(table.id_of("Samples.Calc::Add()"), Some(0));
        assert_eq!(table.id_of("Samples.Fib::Compute()"), Some(1));
        assert_eq!(table.id_of("Samples.Prime::IsPrime()"), Some(2));
        assert_eq!(table.name_of(1), Some("Samples.Fib::Compute()"));
    }

    #[test]
    fn order_independent() {
        let members = members();
        let mut reversed = members.clone();
        reversed.reverse();
        assert_eq!(
            MemberIdTable::build(&members).unwrap(),
            MemberIdTable::build(&reversed).unwrap()
        );
    }

    #[test]
    fn aliases_share_the_id() {
        let members = members();
        let table = MemberIdTable::build(&members).unwrap();
        assert_eq!(table.id_of("Samples.Prime::IsPrimeAsync()"), Some(2));
        assert_eq!(table.iter().count(), 3);
    }

    #[test]
    fn alias_clash_is_an_error() {
        let mut members = members();
        members[2].aliases.push("Samples.Fib::Compute()".to_string());
        let err = MemberIdTable::build(&members).unwrap_err();
        assert!(matches!(err, TransformError::DuplicateMemberId(ref name) if name == "Samples.Fib::Compute()"));
    }

    #[test]
    fn serde_roundtrip() {
        let members = members();
        let table = MemberIdTable::build(&members).unwrap();
        let json = serde_json::to_string(&table).unwrap();
        let back: MemberIdTable = serde_json::from_str(&json).unwrap();
        assert_eq!(back, table);
    }
}
