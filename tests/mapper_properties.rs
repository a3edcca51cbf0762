//! Behavioral properties of the bounded mapper

mod common;

use asana_migrate::concurrency::{map_concurrent, BoundedMapper, Concurrency};
use common::OverlapGauge;
use proptest::prelude::*;
use std::collections::HashSet;
use std::convert::Infallible;
use std::time::Duration;

fn slots(n: usize) -> Concurrency {
    Concurrency::new(n).unwrap()
}

#[tokio::test]
async fn test_empty_input_never_calls_transform() {
    let gauge = OverlapGauge::new();
    let results: Vec<i32> = map_concurrent(Vec::<i32>::new(), slots(4), |x| {
        gauge.enter();
        async move { Ok::<_, Infallible>(x) }
    })
    .await
    .unwrap();

    assert!(results.is_empty());
    assert_eq!(gauge.started(), 0);
}

#[tokio::test]
async fn test_doubling_with_two_slots() {
    let gauge = OverlapGauge::new();
    let results = map_concurrent(vec![1, 2, 3, 4, 5], slots(2), |x| {
        let gauge = gauge.clone();
        async move {
            gauge.enter();
            tokio::time::sleep(Duration::from_millis(5 * x as u64)).await;
            gauge.exit();
            Ok::<_, Infallible>(x * 2)
        }
    })
    .await
    .unwrap();

    let set: HashSet<_> = results.into_iter().collect();
    assert_eq!(set, HashSet::from([2, 4, 6, 8, 10]));
    assert!(gauge.peak() <= 2);
    assert_eq!(gauge.peak(), 2);
}

#[tokio::test]
async fn test_failure_with_all_slots_busy() {
    let err = map_concurrent(vec!["a", "b", "c"], slots(3), |s| async move {
        if s == "b" {
            Err("bad")
        } else {
            Ok(s)
        }
    })
    .await
    .unwrap_err();
    assert_eq!(err, "bad");
}

#[tokio::test]
async fn test_failure_is_not_blocked_by_remaining_work() {
    // 50 items, 2 slots: the failure must surface without waiting for the rest
    let items: Vec<u32> = (0..50).collect();
    let gauge = OverlapGauge::new();
    let result = tokio::time::timeout(
        Duration::from_secs(5),
        map_concurrent(items, slots(2), |x| {
            let gauge = gauge.clone();
            async move {
                gauge.enter();
                tokio::time::sleep(Duration::from_millis(5)).await;
                gauge.exit();
                if x == 45 {
                    Err(format!("item {x} failed"))
                } else {
                    Ok(x)
                }
            }
        }),
    )
    .await
    .expect("mapper hung after a failure");

    assert_eq!(result.unwrap_err(), "item 45 failed");
    assert!(gauge.started() < 50);
}

#[tokio::test]
async fn test_single_item_with_many_slots() {
    let direct = async { Ok::<_, String>("x".repeat(3)) }.await;
    let mapped = map_concurrent(vec![3usize], slots(5), |n| async move {
        Ok::<_, String>("x".repeat(n))
    })
    .await;
    assert_eq!(mapped, direct.map(|v| vec![v]));
}

#[tokio::test]
async fn test_default_is_strictly_sequential() {
    let gauge = OverlapGauge::new();
    let mapper = BoundedMapper::default();
    assert_eq!(mapper.concurrency(), Concurrency::SEQUENTIAL);

    let results = mapper
        .map(0..8u64, |x| {
            let gauge = gauge.clone();
            async move {
                gauge.enter();
                tokio::time::sleep(Duration::from_millis(2)).await;
                gauge.exit();
                Ok::<_, Infallible>(x)
            }
        })
        .await
        .unwrap();

    assert_eq!(results.len(), 8);
    assert_eq!(gauge.peak(), 1);
}

#[tokio::test]
async fn test_more_slots_than_items_runs_everything_at_once() {
    let gauge = OverlapGauge::new();
    map_concurrent(0..4u64, slots(100), |x| {
        let gauge = gauge.clone();
        async move {
            gauge.enter();
            tokio::time::sleep(Duration::from_millis(20)).await;
            gauge.exit();
            Ok::<_, Infallible>(x)
        }
    })
    .await
    .unwrap();
    assert_eq!(gauge.peak(), 4);
}

#[test]
fn test_zero_slots_is_a_configuration_error() {
    assert!(Concurrency::new(0).is_err());
    assert!("0".parse::<Concurrency>().is_err());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_detached_respects_bound_across_threads() {
    let gauge = OverlapGauge::new();
    let mapper = BoundedMapper::new(slots(3));
    let results = mapper
        .map_detached(0..30u64, |x| {
            let gauge = gauge.clone();
            async move {
                gauge.enter();
                tokio::time::sleep(Duration::from_millis(3)).await;
                gauge.exit();
                Ok::<_, Infallible>(x)
            }
        })
        .await
        .unwrap();

    assert_eq!(results.len(), 30);
    assert!(gauge.peak() <= 3);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_complete_and_bounded(
        items in prop::collection::vec(0u32..1000, 0..40),
        concurrency in 1usize..8,
    ) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .unwrap();
        let gauge = OverlapGauge::new();

        let mut results = runtime.block_on(map_concurrent(items.clone(), slots(concurrency), |x| {
            let gauge = gauge.clone();
            async move {
                gauge.enter();
                tokio::time::sleep(Duration::from_micros(u64::from(x % 7) * 100)).await;
                gauge.exit();
                Ok::<_, Infallible>(u64::from(x) + 1)
            }
        }))
        .unwrap();

        let mut expected: Vec<u64> = items.iter().map(|&x| u64::from(x) + 1).collect();
        results.sort_unstable();
        expected.sort_unstable();
        prop_assert_eq!(results, expected);
        prop_assert!(gauge.peak() <= concurrency);
        prop_assert_eq!(gauge.started(), items.len());
    }

    #[test]
    fn prop_any_single_failure_surfaces(
        len in 2usize..30,
        fail_at in 0usize..30,
        concurrency in 1usize..6,
    ) {
        let fail_at = fail_at % len;
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .unwrap();

        let result = runtime.block_on(map_concurrent(0..len, slots(concurrency), |x| async move {
            tokio::task::yield_now().await;
            if x == fail_at { Err(x) } else { Ok(x) }
        }));

        prop_assert_eq!(result, Err(fail_at));
    }
}
