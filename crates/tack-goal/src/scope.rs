// scope.rs — The option scopes known once backends are loaded.

use std::collections::HashSet;

use crate::catalog::GoalCatalog;

/// The global scope. Global options live here.
pub const GLOBAL_SCOPE: &str = "";

/// Reserved scope for run tracker options.
pub const RUN_TRACKER_SCOPE: &str = "run-tracker";

/// Compute the ordered set of option scopes.
///
/// Always starts with the global scope and the run tracker scope, followed by
/// each goal's scopes in catalog order. Enclosing scopes precede the scopes
/// they enclose. Empty names and repeats are dropped, keeping the first
/// occurrence. Must be called after backends have registered their goals and
/// before options are parsed.
pub fn known_scopes(catalog: &GoalCatalog) -> Vec<String> {
    let mut scopes = vec![GLOBAL_SCOPE.to_string(), RUN_TRACKER_SCOPE.to_string()];
    let mut seen: HashSet<String> = scopes.iter().cloned().collect();
    for goal in catalog.all() {
        for scope in goal.known_scopes() {
            if !scope.is_empty() && seen.insert(scope.clone()) {
                scopes.push(scope);
            }
        }
    }
    scopes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::GoalCatalogBuilder;
    use crate::goal::TaskInfo;

    #[test]
    fn empty_catalog_yields_minimal_scopes() {
        let catalog = GoalCatalogBuilder::new().build();
        assert_eq!(known_scopes(&catalog), vec!["", "run-tracker"]);
    }

    #[test]
    fn goal_scopes_follow_catalog_order() {
        let mut builder = GoalCatalogBuilder::new();
        builder.install("compile", TaskInfo::new("java")).unwrap();
        builder.install("test", TaskInfo::new("junit")).unwrap();
        let catalog = builder.build();

        assert_eq!(
            known_scopes(&catalog),
            vec!["", "run-tracker", "compile", "compile.java", "test", "test.junit"]
        );
    }
}
