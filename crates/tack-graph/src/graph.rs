// graph.rs — TargetGraph: materialized targets and their dependency edges.
//
// The graph, not the orchestrator, owns targets. Injecting an address pulls
// in its whole dependency closure; injecting an address that is already
// present is a no-op that returns the same shared target.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::address::Address;
use crate::error::GraphError;
use crate::mapper::{AddressMapper, TargetDecl};

/// A target materialized in the graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub address: Address,
    pub kind: String,
    /// Direct dependencies, in declaration order.
    pub dependencies: Vec<Address>,
}

impl From<TargetDecl> for Target {
    fn from(decl: TargetDecl) -> Self {
        Self {
            address: decl.address,
            kind: decl.kind,
            dependencies: decl.dependencies,
        }
    }
}

pub struct TargetGraph {
    mapper: Arc<dyn AddressMapper>,
    targets: HashMap<Address, Arc<Target>>,
    /// Insertion order; every target appears after all of its dependencies.
    order: Vec<Address>,
}

impl TargetGraph {
    pub fn new(mapper: Arc<dyn AddressMapper>) -> Self {
        Self {
            mapper,
            targets: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// Inject `address` and its transitive dependencies, returning the
    /// materialized target.
    pub fn inject_address_closure(&mut self, address: &Address) -> Result<Arc<Target>, GraphError> {
        let mut path = Vec::new();
        self.inject(address, &mut path)
    }

    fn inject(&mut self, address: &Address, path: &mut Vec<Address>) -> Result<Arc<Target>, GraphError> {
        if let Some(target) = self.targets.get(address) {
            return Ok(Arc::clone(target));
        }
        if let Some(start) = path.iter().position(|a| a == address) {
            let mut cycle: Vec<String> = path[start..].iter().map(Address::to_string).collect();
            cycle.push(address.to_string());
            return Err(GraphError::Cycle { path: cycle });
        }

        let decl = self.mapper.resolve(address)?;
        path.push(address.clone());
        for dependency in &decl.dependencies {
            self.inject(dependency, path).map_err(|e| match e {
                GraphError::BuildFileNotFound { .. } | GraphError::TargetNotFound { .. } => {
                    GraphError::MissingDependency {
                        target: address.to_string(),
                        dependency: dependency.to_string(),
                    }
                }
                other => other,
            })?;
        }
        path.pop();

        let target = Arc::new(Target::from(decl));
        self.targets.insert(address.clone(), Arc::clone(&target));
        self.order.push(address.clone());
        tracing::trace!(address = %address, "injected target");
        Ok(target)
    }

    pub fn get_target(&self, address: &Address) -> Option<Arc<Target>> {
        self.targets.get(address).cloned()
    }

    pub fn contains(&self, address: &Address) -> bool {
        self.targets.contains_key(address)
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// All targets, dependencies before dependents.
    pub fn targets(&self) -> impl Iterator<Item = &Arc<Target>> {
        self.order.iter().filter_map(|a| self.targets.get(a))
    }

    /// The transitive dependency closure of `roots` (roots included), each
    /// target once, dependencies before dependents.
    pub fn closure(&self, roots: &[Arc<Target>]) -> Vec<Arc<Target>> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for root in roots {
            self.walk(&root.address, &mut seen, &mut out);
        }
        out
    }

    fn walk(
        &self,
        address: &Address,
        seen: &mut HashSet<Address>,
        out: &mut Vec<Arc<Target>>,
    ) {
        if !seen.insert(address.clone()) {
            return;
        }
        if let Some(target) = self.targets.get(address) {
            for dependency in &target.dependencies {
                self.walk(dependency, seen, out);
            }
            out.push(Arc::clone(target));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapper::InMemoryAddressMapper;

    fn graph(declare: impl FnOnce(&mut InMemoryAddressMapper)) -> TargetGraph {
        let mut mapper = InMemoryAddressMapper::new();
        declare(&mut mapper);
        TargetGraph::new(Arc::new(mapper))
    }

    fn addr(spec: &str) -> Address {
        Address::parse(spec, "").unwrap()
    }

    #[test]
    fn injects_transitive_closure_dependencies_first() {
        let mut graph = graph(|m| {
            m.declare("app:bin", &["lib:core"]).unwrap();
            m.declare("lib:core", &["util:util"]).unwrap();
            m.declare("util:util", &[]).unwrap();
            m.declare("other:x", &[]).unwrap();
        });
        let target = graph.inject_address_closure(&addr("app:bin")).unwrap();
        assert_eq!(target.address, addr("app:bin"));
        assert_eq!(graph.len(), 3);
        assert!(!graph.contains(&addr("other:x")));

        let order: Vec<String> = graph.targets().map(|t| t.address.to_string()).collect();
        assert_eq!(order, vec!["util:util", "lib:core", "app:bin"]);
    }

    #[test]
    fn injection_is_idempotent() {
        let mut graph = graph(|m| {
            m.declare("a:a", &["b:b"]).unwrap();
            m.declare("b:b", &[]).unwrap();
        });
        let first = graph.inject_address_closure(&addr("a:a")).unwrap();
        let second = graph.inject_address_closure(&addr("a:a")).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(graph.len(), 2);
        assert!(Arc::ptr_eq(&graph.get_target(&addr("a:a")).unwrap(), &first));
    }

    #[test]
    fn detects_cycles() {
        let mut graph = graph(|m| {
            m.declare("a:a", &["b:b"]).unwrap();
            m.declare("b:b", &["c:c"]).unwrap();
            m.declare("c:c", &["a:a"]).unwrap();
        });
        match graph.inject_address_closure(&addr("a:a")) {
            Err(GraphError::Cycle { path }) => {
                assert_eq!(path, vec!["a:a", "b:b", "c:c", "a:a"]);
            }
            other => panic!("expected cycle, got {other:?}"),
        }
        assert!(graph.is_empty());
    }

    #[test]
    fn missing_dependency_names_both_ends() {
        let mut graph = graph(|m| {
            m.declare("a:a", &["gone:gone"]).unwrap();
        });
        match graph.inject_address_closure(&addr("a:a")) {
            Err(GraphError::MissingDependency { target, dependency }) => {
                assert_eq!(target, "a:a");
                assert_eq!(dependency, "gone:gone");
            }
            other => panic!("expected missing dependency, got {other:?}"),
        }
    }

    #[test]
    fn missing_root_is_not_a_missing_dependency() {
        let mut graph = graph(|_| {});
        assert!(matches!(
            graph.inject_address_closure(&addr("a:a")),
            Err(GraphError::BuildFileNotFound { .. })
        ));
    }

    #[test]
    fn closure_visits_each_target_once() {
        let mut graph = graph(|m| {
            m.declare("a:a", &["c:c"]).unwrap();
            m.declare("b:b", &["c:c"]).unwrap();
            m.declare("c:c", &[]).unwrap();
        });
        let a = graph.inject_address_closure(&addr("a:a")).unwrap();
        let b = graph.inject_address_closure(&addr("b:b")).unwrap();
        let closure: Vec<String> = graph
            .closure(&[a, b])
            .iter()
            .map(|t| t.address.to_string())
            .collect();
        assert_eq!(closure, vec!["c:c", "a:a", "b:b"]);
    }
}
