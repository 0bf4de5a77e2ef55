// tests/resolver_properties.rs

use std::sync::Arc;

use proptest::prelude::*;
use pipewright::config::ConfigStore;
use pipewright::errors::PipewrightError;
use pipewright::template::Resolver;
use pipewright_test_utils::ConfigBuilder;

/// Node `i` may only reference nodes `j < i`, so the graph is acyclic.
fn acyclic_refs(max_nodes: usize) -> impl Strategy<Value = Vec<Vec<usize>>> {
    (1..=max_nodes).prop_flat_map(|n| {
        proptest::collection::vec(proptest::collection::vec(any::<usize>(), 0..4), n).prop_map(
            |raw| {
                raw.into_iter()
                    .enumerate()
                    .map(|(i, picks)| {
                        if i == 0 {
                            Vec::new()
                        } else {
                            picks.into_iter().map(|p| p % i).collect()
                        }
                    })
                    .collect()
            },
        )
    })
}

fn template_for(i: usize, refs: &[usize]) -> String {
    let mut s = format!("n{i}");
    for j in refs {
        s.push_str(&format!("-{{{{ nodes.k{j} }}}}"));
    }
    s
}

fn expected(i: usize, graph: &[Vec<usize>]) -> String {
    let mut s = format!("n{i}");
    for &j in &graph[i] {
        s.push('-');
        s.push_str(&expected(j, graph));
    }
    s
}

fn build_store(graph: &[Vec<usize>]) -> ConfigStore {
    let mut builder = ConfigBuilder::new();
    for (i, refs) in graph.iter().enumerate() {
        builder = builder.set(&format!("nodes.k{i}"), template_for(i, refs));
    }
    builder.build()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn acyclic_templates_resolve_and_are_idempotent(graph in acyclic_refs(8)) {
        let resolver = Resolver::new(Arc::new(build_store(&graph)));

        for i in (0..graph.len()).rev() {
            let path = format!("nodes.k{i}");
            let first = resolver.resolve_path(&path).unwrap();
            let second = resolver.resolve_path(&path).unwrap();

            prop_assert!(first.is_concrete());
            prop_assert_eq!(&first, &second);
            prop_assert_eq!(first.as_str().unwrap(), expected(i, &graph));
        }

        // A fresh resolver (no memoized values) agrees with the first one.
        let fresh = Resolver::new(Arc::new(build_store(&graph)));
        let last = format!("nodes.k{}", graph.len() - 1);
        prop_assert_eq!(fresh.resolve_path(&last).unwrap(), resolver.resolve_path(&last).unwrap());
    }

    #[test]
    fn reference_rings_always_report_a_closed_chain(len in 1usize..6, start in 0usize..6) {
        let mut builder = ConfigBuilder::new();
        for i in 0..len {
            builder = builder.set(&format!("r{i}"), format!("{{{{ r{} }}}}", (i + 1) % len));
        }
        let resolver = Resolver::new(Arc::new(builder.build()));
        let start = start % len;

        match resolver.resolve_path(&format!("r{start}")) {
            Err(PipewrightError::CycleDetected { chain }) => {
                prop_assert_eq!(chain.len(), len + 1);
                prop_assert_eq!(chain.first(), chain.last());
                prop_assert_eq!(chain[0].clone(), format!("r{start}"));
            }
            other => prop_assert!(false, "expected CycleDetected, got {:?}", other),
        }
    }
}
