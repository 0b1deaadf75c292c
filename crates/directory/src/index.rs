//! Normalized-name index over a directory snapshot.

use std::collections::HashMap;

use herald_common::types::Employee;

/// Case-normalized (first, last) name pair used as the lookup key for the
/// supervisor relation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NameKey {
    first: String,
    last: String,
}

impl NameKey {
    pub fn new(first_name: &str, last_name: &str) -> Self {
        Self {
            first: first_name.trim().to_uppercase(),
            last: last_name.trim().to_uppercase(),
        }
    }

    /// Key of an employee's supervisor reference, if one is set.
    pub fn supervisor_of(employee: &Employee) -> Option<Self> {
        match (
            employee.supervisor_first_name.as_deref(),
            employee.supervisor_last_name.as_deref(),
        ) {
            (Some(first), Some(last)) => Some(Self::new(first, last)),
            _ => None,
        }
    }
}

/// Name-keyed lookup table over a directory snapshot.
///
/// Built once per filter invocation so the ancestor walk is O(depth) per
/// employee instead of rescanning the directory on every hop. Duplicate name
/// pairs keep the first record seen; later duplicates share its subtree
/// position, mirroring the subscriber-id collision policy.
pub struct DirectoryIndex<'a> {
    by_name: HashMap<NameKey, &'a Employee>,
}

impl<'a> DirectoryIndex<'a> {
    pub fn build(employees: &'a [Employee]) -> Self {
        let mut by_name = HashMap::with_capacity(employees.len());
        for employee in employees {
            let key = NameKey::new(&employee.first_name, &employee.last_name);
            by_name.entry(key).or_insert(employee);
        }
        Self { by_name }
    }

    /// Resolve a name pair to its directory record, if present.
    pub fn lookup(&self, key: &NameKey) -> Option<&'a Employee> {
        self.by_name.get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}
