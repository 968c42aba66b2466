use proptest::prelude::*;
use serde_json::Value;

use vigil_core::schema::{TypeDescriptor, TypeKind};
use vigil_core::stats::{aggregate, ExecutionStats};

// ---------------------------------------------------------------------------
// Strategies
// ---------------------------------------------------------------------------

fn arb_stats() -> impl Strategy<Value = Option<ExecutionStats>> {
    prop::option::of(
        (
            prop::option::of(0u32..1_000),
            prop::option::of(0u64..100_000),
            prop::option::of(0u64..100_000),
        )
            .prop_map(|(cost, input_tokens, output_tokens)| ExecutionStats {
                // Quarter-unit costs keep float sums exact.
                cost: cost.map(|c| f64::from(c) / 4.0),
                input_tokens,
                output_tokens,
            }),
    )
}

fn arb_leaf() -> impl Strategy<Value = TypeDescriptor> {
    prop_oneof![
        Just(TypeDescriptor::new(TypeKind::Boolean)),
        Just(TypeDescriptor::new(TypeKind::String)),
        Just(TypeDescriptor::new(TypeKind::Integer)),
        Just(TypeDescriptor::new(TypeKind::Any)),
        Just(TypeDescriptor::new(TypeKind::File)),
    ]
}

fn arb_descriptor() -> impl Strategy<Value = TypeDescriptor> {
    arb_leaf().prop_recursive(6, 48, 4, |inner| {
        prop_oneof![
            inner.clone().prop_map(TypeDescriptor::list),
            inner.clone().prop_map(TypeDescriptor::dict),
            prop::collection::vec(inner.clone(), 0..4).prop_map(TypeDescriptor::one_of),
            prop::collection::btree_map("[a-z]{1,6}", inner, 0..4)
                .prop_map(TypeDescriptor::object),
        ]
    })
}

/// Count descriptor nodes by walking the descriptor.
fn count_descriptors(t: &TypeDescriptor) -> usize {
    let mut count = 0;
    let mut stack = vec![t];
    while let Some(node) = stack.pop() {
        count += 1;
        if let Some(props) = &node.properties {
            stack.extend(props.values());
        }
        if let Some(elements) = &node.elements {
            stack.push(elements);
        }
        if let Some(vigil_core::schema::Variants::Types(types)) = &node.variants {
            stack.extend(types.iter());
        }
    }
    count
}

/// Count schema fragments produced for descriptor nodes (objects reachable
/// through `properties`/`items`/`additionalProperties`/`oneOf`).
fn count_fragments(schema: &Value) -> usize {
    let mut count = 0;
    let mut stack = vec![schema];
    while let Some(node) = stack.pop() {
        count += 1;
        // File leaves embed a fixed `properties` block that is not a descriptor.
        let is_file = node.get("properties").and_then(|p| p.get("fileName")).is_some();
        if !is_file {
            if let Some(Value::Object(props)) = node.get("properties") {
                stack.extend(props.values());
            }
        }
        if let Some(items) = node.get("items") {
            stack.push(items);
        }
        if let Some(extra) = node.get("additionalProperties") {
            stack.push(extra);
        }
        if let Some(Value::Array(variants)) = node.get("oneOf") {
            stack.extend(variants.iter());
        }
    }
    count
}

// ===========================================================================
// Stats aggregation
// ===========================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(300))]

    /// The aggregate equals the field-wise sum, absent counting as zero.
    #[test]
    fn aggregate_is_fieldwise_sum(stats in prop::collection::vec(arb_stats(), 0..12)) {
        let total = aggregate(stats.iter().map(Option::as_ref));

        let present = stats.iter().flatten();
        let cost: f64 = present.clone().map(ExecutionStats::cost_or_zero).sum();
        let input: u64 = present.clone().map(ExecutionStats::input_tokens_or_zero).sum();
        let output: u64 = present.clone().map(ExecutionStats::output_tokens_or_zero).sum();

        prop_assert_eq!(total.cost_or_zero(), cost);
        prop_assert_eq!(total.input_tokens_or_zero(), input);
        prop_assert_eq!(total.output_tokens_or_zero(), output);
    }

    /// Adding one more entry raises the total by exactly that entry.
    #[test]
    fn aggregate_adding_entry_adds_its_stats(
        stats in prop::collection::vec(arb_stats(), 0..8),
        extra in arb_stats(),
    ) {
        let before = aggregate(stats.iter().map(Option::as_ref));
        let after = aggregate(stats.iter().chain(std::iter::once(&extra)).map(Option::as_ref));
        let extra = extra.unwrap_or_default();

        prop_assert_eq!(after.cost_or_zero(), before.cost_or_zero() + extra.cost_or_zero());
        prop_assert_eq!(
            after.input_tokens_or_zero(),
            before.input_tokens_or_zero() + extra.input_tokens_or_zero()
        );
        prop_assert_eq!(
            after.output_tokens_or_zero(),
            before.output_tokens_or_zero() + extra.output_tokens_or_zero()
        );
    }

    /// The aggregate is independent of node order.
    #[test]
    fn aggregate_is_order_independent(stats in prop::collection::vec(arb_stats(), 0..8)) {
        let forward = aggregate(stats.iter().map(Option::as_ref));
        let backward = aggregate(stats.iter().rev().map(Option::as_ref));
        prop_assert_eq!(forward, backward);
    }
}

// ===========================================================================
// Type descriptor rendering
// ===========================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Every descriptor node yields exactly one schema fragment.
    #[test]
    fn schema_has_one_fragment_per_descriptor(t in arb_descriptor()) {
        let schema = t.to_json_schema();
        prop_assert_eq!(count_fragments(&schema), count_descriptors(&t));
    }

    /// Object property names survive rendering.
    #[test]
    fn object_property_names_preserved(
        props in prop::collection::btree_map("[a-z]{1,6}", arb_leaf(), 0..6),
    ) {
        let names: Vec<String> = props.keys().cloned().collect();
        let schema = TypeDescriptor::object(props).to_json_schema();
        let rendered: Vec<String> = schema["properties"]
            .as_object()
            .map(|m| m.keys().cloned().collect())
            .unwrap_or_default();
        prop_assert_eq!(rendered, names);
    }
}
