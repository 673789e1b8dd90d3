// SPDX-License-Identifier: MPL-2.0

//! Transitive dependency resolution: BFS frontier expansion with bounded
//! parallel metadata fetch, followed by a stable Kahn topological sort.

use indexmap::{IndexMap, IndexSet};

use crate::descriptor::{Descriptor, Name};

/// Anything that can turn a package name into a [`Descriptor`]. Lets the
/// resolver stay agnostic to whether names come from the Homebrew
/// formula API, a cask feed, or an APT index.
pub trait DescriptorSource: Sync {
    fn fetch(&self, name: &str) -> Result<Descriptor, FetchError>;
}

#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct FetchError(pub String);

/// Resolve `roots` and their full transitive closure, returning
/// descriptors in a topological install order (dependencies first).
pub fn resolve(roots: &[Name], source: &dyn DescriptorSource) -> Result<Vec<Descriptor>, Error> {
    let mut known: IndexMap<Name, Descriptor> = IndexMap::new();
    let mut edges: IndexMap<Name, Vec<Name>> = IndexMap::new();

    let mut frontier: Vec<Name> = roots.to_vec();
    let mut queued: IndexSet<Name> = roots.iter().cloned().collect();

    while !frontier.is_empty() {
        // Bounded fan-out: fetch the whole frontier in parallel (rayon's
        // global pool caps concurrency without us managing threads here).
        let fetched: Vec<Result<Descriptor, Error>> = {
            use rayon::prelude::*;
            frontier
                .par_iter()
                .map(|name| {
                    source
                        .fetch(name)
                        .map_err(|e| Error::NotFound(name.clone(), e.0))
                })
                .collect()
        };

        let mut next = Vec::new();

        for result in fetched {
            let descriptor = result?;
            let name = descriptor.name.clone();

            for dep in &descriptor.dependencies {
                if !known.contains_key(dep) && queued.insert(dep.clone()) {
                    next.push(dep.clone());
                }
            }

            edges.insert(name.clone(), descriptor.dependencies.clone());
            known.insert(name, descriptor);
        }

        frontier = next;
    }

    kahn_sort(known, edges)
}

fn kahn_sort(
    known: IndexMap<Name, Descriptor>,
    edges: IndexMap<Name, Vec<Name>>,
) -> Result<Vec<Descriptor>, Error> {
    // in-degree here means "number of direct dependencies"; a package is
    // ready once all of its dependencies have been emitted.
    let mut remaining: IndexMap<Name, usize> = known
        .keys()
        .map(|name| (name.clone(), edges.get(name).map(Vec::len).unwrap_or(0)))
        .collect();

    // Reverse edges: dependents[d] = packages that depend on d.
    let mut dependents: IndexMap<Name, Vec<Name>> = IndexMap::new();
    for (name, deps) in &edges {
        for dep in deps {
            dependents.entry(dep.clone()).or_default().push(name.clone());
        }
    }

    // Seed the ready queue in insertion order for reproducible output
    // when multiple nodes are ready at once.
    let mut queue: std::collections::VecDeque<Name> = remaining
        .iter()
        .filter(|(_, degree)| **degree == 0)
        .map(|(name, _)| name.clone())
        .collect();

    let mut order = Vec::with_capacity(known.len());

    while let Some(name) = queue.pop_front() {
        order.push(known[&name].clone());

        if let Some(parents) = dependents.get(&name) {
            for parent in parents {
                if let Some(degree) = remaining.get_mut(parent) {
                    *degree -= 1;
                    if *degree == 0 {
                        queue.push_back(parent.clone());
                    }
                }
            }
        }
    }

    if order.len() < known.len() {
        let stuck: Vec<Name> = remaining
            .iter()
            .filter(|(name, degree)| **degree > 0 && known.contains_key(*name))
            .map(|(name, _)| name.clone())
            .collect();
        return Err(Error::Cycle(stuck));
    }

    Ok(order)
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("package not found: {0} ({1})")]
    NotFound(Name, String),
    #[error("dependency cycle involving: {}", .0.join(", "))]
    Cycle(Vec<Name>),
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::descriptor::Artifact;
    use std::collections::HashMap;

    struct FakeSource(HashMap<&'static str, Vec<&'static str>>);

    impl DescriptorSource for FakeSource {
        fn fetch(&self, name: &str) -> Result<Descriptor, FetchError> {
            let deps = self.0.get(name).ok_or_else(|| FetchError(format!("no such package: {name}")))?;
            Ok(Descriptor {
                name: name.to_string(),
                version: "1.0".into(),
                rebuild: 0,
                desc: String::new(),
                dependencies: deps.iter().map(|d| d.to_string()).collect(),
                artifact: Artifact::Binary { url: "https://example.test/x".into(), sha256: "a".repeat(64) },
                caveats: None,
                post_install_defined: false,
            })
        }
    }

    #[test]
    fn dependencies_precede_dependents() {
        let mut graph = HashMap::new();
        graph.insert("wget", vec!["openssl", "libidn2"]);
        graph.insert("openssl", vec!["ca-certificates"]);
        graph.insert("libidn2", vec!["libunistring"]);
        graph.insert("ca-certificates", vec![]);
        graph.insert("libunistring", vec![]);

        let order = resolve(&["wget".to_string()], &FakeSource(graph)).unwrap();
        let position = |n: &str| order.iter().position(|d| d.name == n).unwrap();

        assert_eq!(order.len(), 5);
        assert!(position("ca-certificates") < position("openssl"));
        assert!(position("openssl") < position("wget"));
        assert!(position("libunistring") < position("libidn2"));
        assert!(position("libidn2") < position("wget"));
    }

    #[test]
    fn diamond_dependency_only_visited_once() {
        let mut graph = HashMap::new();
        graph.insert("app", vec!["liba", "libb"]);
        graph.insert("liba", vec!["shared"]);
        graph.insert("libb", vec!["shared"]);
        graph.insert("shared", vec![]);

        let order = resolve(&["app".to_string()], &FakeSource(graph)).unwrap();
        assert_eq!(order.len(), 4);
        assert_eq!(order.iter().filter(|d| d.name == "shared").count(), 1);
    }

    #[test]
    fn cycle_is_reported_without_partial_order() {
        let mut graph = HashMap::new();
        graph.insert("a", vec!["b"]);
        graph.insert("b", vec!["a"]);

        let err = resolve(&["a".to_string()], &FakeSource(graph)).unwrap_err();
        match err {
            Error::Cycle(stuck) => {
                assert_eq!(stuck.len(), 2);
            }
            other => panic!("expected cycle, got {other:?}"),
        }
    }

    #[test]
    fn unknown_root_is_not_found() {
        let graph = HashMap::new();
        let err = resolve(&["mystery".to_string()], &FakeSource(graph)).unwrap_err();
        assert!(matches!(err, Error::NotFound(name, _) if name == "mystery"));
    }
}
