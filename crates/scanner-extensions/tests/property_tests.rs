use std::sync::Arc;

use proptest::prelude::*;
use scanner_extensions::metadata::resolve_phase;
use scanner_extensions::{Capability, DependencyGraph, Error, Extension, ExtensionType, Phase};
use scanner_test_utils::fixtures::{FakeExtension, dictionary_of};

/// Node count plus forward edges `(i, j)` with `i < j`, so the graph is a DAG
/// whatever the edges. Nodes are inserted in a permuted order.
fn dag() -> impl Strategy<Value = (Vec<usize>, Vec<(usize, usize)>)> {
    (1usize..24).prop_flat_map(|n| {
        let edges = prop::collection::vec((0..n, 0..n), 0..n * 2).prop_map(|pairs| {
            pairs
                .into_iter()
                .filter(|(a, b)| a != b)
                .map(|(a, b)| (a.min(b), a.max(b)))
                .collect::<Vec<_>>()
        });
        (Just((0..n).collect::<Vec<_>>()).prop_shuffle(), edges)
    })
}

fn phase_type(phase: Phase) -> Arc<ExtensionType> {
    ExtensionType::builder(format!("{phase}Sensor"))
        .role(Capability::Sensor)
        .phase(phase)
        .build()
}

fn any_phase() -> impl Strategy<Value = Phase> {
    prop_oneof![Just(Phase::Pre), Just(Phase::Default), Just(Phase::Post)]
}

proptest! {
    #[test]
    fn test_sort_respects_every_edge((order, edges) in dag()) {
        let mut graph = DependencyGraph::new();
        let index_of: Vec<usize> = {
            let mut index_of = vec![0; order.len()];
            for label in &order {
                index_of[*label] = graph.add_node(*label);
            }
            index_of
        };
        for (before, after) in &edges {
            graph.add_edge(index_of[*before], index_of[*after]);
        }

        let sorted = graph.topological_sort(|n| n.to_string()).unwrap();
        prop_assert_eq!(sorted.len(), order.len());

        let position = |label: usize| sorted.iter().position(|n| *n == label).unwrap();
        for (before, after) in &edges {
            prop_assert!(position(*before) < position(*after));
        }
    }

    #[test]
    fn test_sort_without_edges_is_identity((order, _) in dag()) {
        let mut graph = DependencyGraph::new();
        for label in &order {
            graph.add_node(*label);
        }
        prop_assert_eq!(graph.topological_sort(|n| n.to_string()).unwrap(), order);
    }

    #[test]
    fn test_back_edge_always_fails((order, edges) in dag(), pick in any::<prop::sample::Index>()) {
        prop_assume!(!edges.is_empty());
        let (before, after) = edges[pick.index(edges.len())];

        let mut graph = DependencyGraph::new();
        for label in 0..order.len() {
            graph.add_node(label);
        }
        for (a, b) in &edges {
            graph.add_edge(*a, *b);
        }
        graph.add_edge(after, before);

        match graph.topological_sort(|n| n.to_string()) {
            Err(Error::DependencyCycle { participants }) => {
                prop_assert!(participants.contains(&before.to_string()));
                prop_assert!(participants.contains(&after.to_string()));
            }
            other => prop_assert!(false, "expected a cycle, got {:?}", other.map(|v| v.len())),
        }
    }

    #[test]
    fn test_phases_partition_selection(phases in prop::collection::vec(any_phase(), 0..16)) {
        let types = [Phase::Pre, Phase::Default, Phase::Post].map(phase_type);
        let extensions: Vec<Arc<dyn Extension>> = phases
            .iter()
            .enumerate()
            .map(|(i, phase)| {
                let ty = &types[*phase as usize];
                FakeExtension::new(i.to_string(), ty).into_arc()
            })
            .collect();

        let order = dictionary_of(extensions)
            .select_without_filter(Capability::Sensor)
            .unwrap();
        prop_assert_eq!(order.len(), phases.len());

        let emitted: Vec<(Phase, usize)> = order
            .iter()
            .map(|ext| {
                let phase = resolve_phase(&ext.extension_type());
                (phase, ext.name().parse::<usize>().unwrap())
            })
            .collect();
        // Phases ascend; registration order holds within each phase.
        let mut expected = emitted.clone();
        expected.sort();
        prop_assert_eq!(emitted, expected);
    }
}
