//! Graph-reachability authorization over the supervisor forest.

use herald_common::types::{Admin, AdminRole, Employee};

use crate::index::{DirectoryIndex, NameKey};

/// Hard cap on supervisor-chain hops.
///
/// The supervisor reference is free-form data and nothing upstream enforces
/// acyclicity; the cap makes a cyclic or absurdly deep chain fail safe
/// (treated as "does not reach the admin") instead of looping.
pub const MAX_SUPERVISOR_DEPTH: usize = 64;

/// Compute the subset of `employees` the acting admin may see and target.
///
/// - `Root` admins get the full directory, unfiltered.
/// - `Manager` admins get every employee whose supervisor chain reaches the
///   admin's name pair within [`MAX_SUPERVISOR_DEPTH`] hops. Matching is
///   case-insensitive on the (first, last) pair; a chain that dangles (no
///   matching directory record) terminates without a match.
/// - The acting admin is *not* part of their own visible set; only true
///   subordinates match. Callers that want self-inclusion must add it
///   explicitly.
///
/// Pure read, no locking. Resolving the acting identity against the admin
/// collection is the caller's job; an unknown admin never reaches this
/// function and yields no access.
pub fn visible_employees<'a>(acting: &Admin, employees: &'a [Employee]) -> Vec<&'a Employee> {
    if acting.role == AdminRole::Root {
        return employees.iter().collect();
    }

    let index = DirectoryIndex::build(employees);
    let admin_key = NameKey::new(&acting.first_name, &acting.last_name);

    let visible: Vec<&Employee> = employees
        .iter()
        .filter(|employee| reports_to(&index, employee, &admin_key))
        .collect();

    tracing::debug!(
        admin_id = %acting.id,
        directory = employees.len(),
        visible = visible.len(),
        "Authorization filter applied"
    );

    visible
}

/// Walk the supervisor chain upward from `employee`, looking for `admin_key`.
fn reports_to(index: &DirectoryIndex<'_>, employee: &Employee, admin_key: &NameKey) -> bool {
    let mut current = employee;
    for _ in 0..MAX_SUPERVISOR_DEPTH {
        let Some(supervisor_key) = NameKey::supervisor_of(current) else {
            return false;
        };
        if supervisor_key == *admin_key {
            return true;
        }
        match index.lookup(&supervisor_key) {
            Some(supervisor) => current = supervisor,
            // Dangling reference: the chain ends here.
            None => return false,
        }
    }
    tracing::warn!(
        employee_id = %employee.id,
        cap = MAX_SUPERVISOR_DEPTH,
        "Supervisor chain exceeded depth cap; treating as unreachable (possible cycle)"
    );
    false
}
