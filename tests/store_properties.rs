use std::collections::{HashMap, HashSet};

use proptest::prelude::*;
use smartclip_core::db::{ClipboardStore, HistoryItem, ItemFilter, ItemType, StoreConfig};

fn store_with_interval(cleanup_interval: u32) -> ClipboardStore {
    let mut config = StoreConfig::from_app_dir(&std::env::temp_dir().join("smartclip-props"));
    config.cleanup_interval = cleanup_interval;
    ClipboardStore::open_in_memory(config).expect("open memory store")
}

fn all_items(store: &ClipboardStore) -> Vec<HistoryItem> {
    store.get_items("", ItemFilter::All).expect("list items")
}

#[derive(Debug, Clone)]
enum Op {
    Add(u8),
    /// 只置顶，不取消
    Pin(usize),
    TogglePin(usize),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (0u8..6).prop_map(Op::Add),
        1 => (0usize..32).prop_map(Op::Pin),
        1 => (0usize..32).prop_map(Op::TogglePin),
    ]
}

/// 取消置顶会让置顶副本回到未置顶列表，和去重无关，所以去重性质只用 Add / Pin
fn add_or_pin_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (0u8..6).prop_map(Op::Add),
        1 => (0usize..32).prop_map(Op::Pin),
    ]
}

fn apply(store: &ClipboardStore, op: &Op) {
    match op {
        Op::Add(n) => {
            store.add_item(Some(&format!("clip-{n}")), None, ItemType::Text).expect("add");
        }
        Op::Pin(pick) => {
            let unpinned: Vec<i64> = all_items(store).iter().filter(|i| !i.pinned).map(|i| i.id).collect();
            if !unpinned.is_empty() {
                store.toggle_pin(unpinned[pick % unpinned.len()]).expect("pin");
            }
        }
        Op::TogglePin(pick) => {
            let items = all_items(store);
            if !items.is_empty() {
                let id = items[pick % items.len()].id;
                store.toggle_pin(id).expect("toggle pin");
            }
        }
    }
}

fn assert_pinned_first(items: &[HistoryItem]) {
    let first_unpinned = items.iter().position(|i| !i.pinned).unwrap_or(items.len());
    assert!(items[first_unpinned..].iter().all(|i| !i.pinned), "pinned rows must come first");

    for pair in items[..first_unpinned].windows(2) {
        let (a, b) = (&pair[0], &pair[1]);
        assert!(
            a.pin_order < b.pin_order || (a.pin_order == b.pin_order && a.id > b.id),
            "pinned order broken: {:?} then {:?}",
            (a.id, a.pin_order),
            (b.id, b.pin_order)
        );
    }
    for pair in items[first_unpinned..].windows(2) {
        assert!(pair[0].id > pair[1].id, "unpinned rows must be newest first");
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn at_most_one_unpinned_row_per_content(ops in proptest::collection::vec(add_or_pin_strategy(), 1..40)) {
        let store = store_with_interval(1_000);
        let mut last_added = None;
        for op in &ops {
            apply(&store, op);
            if let Op::Add(n) = op {
                last_added = Some(format!("clip-{n}"));
            }
        }

        let items = all_items(&store);
        let mut unpinned: HashMap<String, usize> = HashMap::new();
        for item in items.iter().filter(|i| !i.pinned) {
            *unpinned.entry(item.content.clone().unwrap_or_default()).or_default() += 1;
        }
        prop_assert!(unpinned.values().all(|&count| count == 1), "duplicates: {:?}", unpinned);

        if let Some(last) = last_added {
            let newest = items.iter().max_by_key(|i| i.id).expect("non-empty");
            prop_assert_eq!(newest.content.as_deref(), Some(last.as_str()));
        }
    }

    #[test]
    fn listing_is_always_pinned_first(ops in proptest::collection::vec(op_strategy(), 1..40)) {
        let store = store_with_interval(1_000);
        for op in &ops {
            apply(&store, op);
        }
        assert_pinned_first(&all_items(&store));
    }

    #[test]
    fn eviction_keeps_unpinned_within_limit(
        count in 1usize..50,
        pin_every in 2usize..9,
    ) {
        let store = store_with_interval(1);
        store.set_max_history(10).expect("set max history");

        let mut pinned = HashSet::new();
        for i in 0..count {
            let id = store.add_item(Some(&format!("item-{i}")), None, ItemType::Text).expect("add");
            if i % pin_every == 0 {
                prop_assert!(store.toggle_pin(id).expect("pin"));
                pinned.insert(id);
            }

            let items = all_items(&store);
            let unpinned = items.iter().filter(|i| !i.pinned).count();
            prop_assert!(unpinned <= 10, "{} unpinned rows after insert {}", unpinned, i);
        }

        let survivors: HashSet<i64> = all_items(&store).iter().filter(|i| i.pinned).map(|i| i.id).collect();
        prop_assert_eq!(survivors, pinned);
    }

    #[test]
    fn reorder_assigns_positions_in_given_order(seed in proptest::collection::vec(any::<u16>(), 1..12)) {
        let store = store_with_interval(1_000);
        let mut ids = Vec::new();
        for (i, _) in seed.iter().enumerate() {
            let id = store.add_item(Some(&format!("pin-{i}")), None, ItemType::Text).expect("add");
            store.toggle_pin(id).expect("pin");
            ids.push(id);
        }
        let mut order: Vec<(u16, i64)> = seed.iter().copied().zip(ids.iter().copied()).collect();
        order.sort();
        let ordered: Vec<i64> = order.into_iter().map(|(_, id)| id).collect();

        store.update_pin_orders(&ordered).expect("reorder");

        let listed: Vec<i64> = store
            .get_items("", ItemFilter::Pinned)
            .expect("pinned")
            .iter()
            .map(|i| i.id)
            .collect();
        prop_assert_eq!(listed, ordered);
    }
}
