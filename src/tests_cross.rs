use crate::*;

#[test]
fn test_bitmap_to_interval_coalesces() {
    let bits = BitmapSet::new([1i64, 2, 3, 15, 20, 21, 22, 23]).unwrap();
    let set = IntervalSet::from(&bits);
    let pairs: Vec<(i64, i64)> = set.runs().collect();
    assert_eq!(pairs, vec![(1, 3), (15, 15), (20, 23)]);
    assert_eq!(set.len(), bits.len());
}

#[test]
fn test_bitmap_to_interval_across_chunk_boundary() {
    // 61 and 62 are adjacent members in different chunks; the conversion
    // must still fuse them into one run.
    let bits = BitmapSet::new([60i64, 61, 62, 63]).unwrap();
    let set = IntervalSet::from(&bits);
    assert_eq!(set.runs().collect::<Vec<_>>(), vec![(60, 63)]);
}

#[test]
fn test_interval_to_bitmap_exact() {
    let set = IntervalSet::from_ranges([(0, 5), (100, 130)]);
    let bits = BitmapSet::try_from(&set).unwrap();
    assert_eq!(bits.len(), set.len());
    assert_eq!(bits.iter().collect::<Vec<_>>(), set.iter().collect::<Vec<_>>());
}

#[test]
fn test_interval_to_bitmap_rejects_negative() {
    let set = IntervalSet::from_ranges([(-3, 5)]);
    assert_eq!(
        BitmapSet::try_from(&set),
        Err(SetError::NegativeValue(-3))
    );
}

#[test]
fn test_cross_equality() {
    let values = [0i64, 1, 2, 61, 62, 100];
    let set = IntervalSet::new(values).unwrap();
    let bits = BitmapSet::new(values).unwrap();
    assert_eq!(set, bits);
    assert_eq!(bits, set);

    let mut bits2 = bits.clone();
    bits2.add(7).unwrap();
    assert_ne!(set, bits2);
    assert_ne!(bits2, set);

    // Same cardinality, different members.
    let other = IntervalSet::new([0i64, 1, 2, 61, 62, 101]).unwrap();
    assert_ne!(other, bits);
}

#[test]
fn test_interval_lhs_operators() {
    let set = IntervalSet::from_ranges([(0, 10)]);
    let bits = BitmapSet::new([5i64, 6, 7, 20]).unwrap();

    let union = &set | &bits;
    assert_eq!(union.runs().collect::<Vec<_>>(), vec![(0, 10), (20, 20)]);

    let inter = &set & &bits;
    assert_eq!(inter.runs().collect::<Vec<_>>(), vec![(5, 7)]);

    let diff = &set - &bits;
    assert_eq!(diff.runs().collect::<Vec<_>>(), vec![(0, 4), (8, 10)]);

    let xor = &set ^ &bits;
    assert_eq!(
        xor.runs().collect::<Vec<_>>(),
        vec![(0, 4), (8, 10), (20, 20)]
    );
}

#[test]
fn test_bitmap_lhs_operators() {
    let bits = BitmapSet::new([0i64, 5, 6, 70]).unwrap();
    // The interval operand may reach below zero; intersection and
    // difference results are subsets of the bitmap, so that part clips.
    let set = IntervalSet::from_ranges([(-10, 5)]);

    let inter = &bits & &set;
    assert_eq!(inter.iter().collect::<Vec<_>>(), vec![0, 5]);

    let diff = &bits - &set;
    assert_eq!(diff.iter().collect::<Vec<_>>(), vec![6, 70]);
}

#[test]
fn test_bitmap_union_with_interval_source() {
    let set = IntervalSet::from_ranges([(3, 5)]);
    let bits = BitmapSet::new([0i64]).unwrap();
    let union = bits.union([&set]).unwrap();
    assert_eq!(union.iter().collect::<Vec<_>>(), vec![0, 3, 4, 5]);

    let negative = IntervalSet::from_ranges([(-1, 5)]);
    assert_eq!(
        bits.union([&negative]).unwrap_err(),
        SetError::NegativeValue(-1)
    );
}

#[test]
fn test_update_across_representations() {
    let bits = BitmapSet::new([2i64, 3, 100]).unwrap();
    let mut set = IntervalSet::new([0i64]).unwrap();
    set.update([&bits]).unwrap();
    assert_eq!(set.runs().collect::<Vec<_>>(), vec![(0, 0), (2, 3), (100, 100)]);

    let intervals = IntervalSet::from_ranges([(10, 12)]);
    let mut bits = BitmapSet::new([0i64]).unwrap();
    bits.update([&intervals]).unwrap();
    assert_eq!(bits.iter().collect::<Vec<_>>(), vec![0, 10, 11, 12]);
}

#[test]
fn test_interval_difference_with_bitmap_source() {
    let bits = BitmapSet::new([1i64, 3, 5]).unwrap();
    let mut set = IntervalSet::from_ranges([(0, 6)]);
    set.difference_update([&bits]).unwrap();
    assert_eq!(set.runs().collect::<Vec<_>>(), vec![(0, 0), (2, 2), (4, 4), (6, 6)]);
}

#[test]
fn test_cross_subset_via_conversion() {
    let bits = BitmapSet::new([2i64, 3]).unwrap();
    let set = IntervalSet::from_ranges([(0, 10)]);
    assert!(IntervalSet::from(&bits).issubset(&set));
    assert!(BitmapSet::try_from(&set).unwrap().issuperset(&bits));
}

mod proptests {
    use std::collections::BTreeSet;

    use proptest::prelude::*;

    use crate::*;

    /// Canonical form: even length, ordered pairs, a gap of at least one
    /// value between consecutive pairs.
    fn assert_canonical(set: &IntervalSet) {
        let pairs: Vec<(i64, i64)> = set.runs().collect();
        let mut prev_end: Option<i64> = None;
        for &(start, end) in &pairs {
            assert!(start <= end, "inverted pair ({start}, {end})");
            if let Some(prev) = prev_end {
                assert!(
                    prev + 1 < start,
                    "pairs touch or overlap: ..{prev} and {start}.."
                );
            }
            prev_end = Some(end);
        }
    }

    fn interval_of(values: &[i64]) -> IntervalSet {
        values.iter().copied().collect()
    }

    fn bitmap_of(values: &[i64]) -> BitmapSet {
        BitmapSet::new(values.to_vec()).unwrap()
    }

    fn oracle_of(values: &[i64]) -> BTreeSet<i64> {
        values.iter().copied().collect()
    }

    proptest! {
        #[test]
        fn prop_interval_matches_oracle(
            ops in prop::collection::vec((any::<bool>(), -200i64..200), 0..120)
        ) {
            let mut set = IntervalSet::default();
            let mut oracle = BTreeSet::new();
            for &(insert, value) in &ops {
                if insert {
                    set.add(value);
                    oracle.insert(value);
                } else {
                    set.discard(value);
                    oracle.remove(&value);
                }
                assert_canonical(&set);
            }
            prop_assert_eq!(set.len(), oracle.len() as u64);
            prop_assert_eq!(
                set.iter().collect::<Vec<_>>(),
                oracle.iter().copied().collect::<Vec<_>>()
            );
        }

        #[test]
        fn prop_bitmap_matches_oracle(
            ops in prop::collection::vec((any::<bool>(), 0i64..300), 0..120)
        ) {
            let mut set = BitmapSet::default();
            let mut oracle = BTreeSet::new();
            for &(insert, value) in &ops {
                if insert {
                    set.add(value).unwrap();
                    oracle.insert(value);
                } else {
                    set.discard(value);
                    oracle.remove(&value);
                }
                for (_, word) in set.chunks() {
                    prop_assert_ne!(word, 0);
                }
            }
            prop_assert_eq!(set.len(), oracle.len() as u64);
            prop_assert_eq!(
                set.iter().collect::<Vec<_>>(),
                oracle.iter().copied().collect::<Vec<_>>()
            );
        }

        #[test]
        fn prop_interval_run_insert_matches_oracle(
            pairs in prop::collection::vec((-100i64..100, 0i64..20), 0..40)
        ) {
            let mut set = IntervalSet::default();
            let mut oracle = BTreeSet::new();
            for &(start, width) in &pairs {
                set.update([Source::from((start, start + width + 1, 1))]).unwrap();
                oracle.extend(start..=start + width);
                assert_canonical(&set);
            }
            prop_assert_eq!(
                set.iter().collect::<Vec<_>>(),
                oracle.iter().copied().collect::<Vec<_>>()
            );
        }

        #[test]
        fn prop_interval_algebra_matches_oracle(
            a in prop::collection::vec(-150i64..150, 0..80),
            b in prop::collection::vec(-150i64..150, 0..80),
        ) {
            let sa = interval_of(&a);
            let sb = interval_of(&b);
            let oa = oracle_of(&a);
            let ob = oracle_of(&b);

            let union: Vec<i64> = (&sa | &sb).iter().collect();
            prop_assert_eq!(union, oa.union(&ob).copied().collect::<Vec<_>>());

            let inter: Vec<i64> = (&sa & &sb).iter().collect();
            prop_assert_eq!(inter, oa.intersection(&ob).copied().collect::<Vec<_>>());

            let diff: Vec<i64> = (&sa - &sb).iter().collect();
            prop_assert_eq!(diff, oa.difference(&ob).copied().collect::<Vec<_>>());

            let xor: Vec<i64> = (&sa ^ &sb).iter().collect();
            prop_assert_eq!(xor, oa.symmetric_difference(&ob).copied().collect::<Vec<_>>());

            assert_canonical(&(&sa | &sb));
            assert_canonical(&(&sa & &sb));
            assert_canonical(&(&sa - &sb));
            assert_canonical(&(&sa ^ &sb));
        }

        #[test]
        fn prop_bitmap_algebra_matches_oracle(
            a in prop::collection::vec(0i64..300, 0..80),
            b in prop::collection::vec(0i64..300, 0..80),
        ) {
            let sa = bitmap_of(&a);
            let sb = bitmap_of(&b);
            let oa = oracle_of(&a);
            let ob = oracle_of(&b);

            let union: Vec<i64> = (&sa | &sb).iter().collect();
            prop_assert_eq!(union, oa.union(&ob).copied().collect::<Vec<_>>());

            let inter: Vec<i64> = (&sa & &sb).iter().collect();
            prop_assert_eq!(inter, oa.intersection(&ob).copied().collect::<Vec<_>>());

            let diff: Vec<i64> = (&sa - &sb).iter().collect();
            prop_assert_eq!(diff, oa.difference(&ob).copied().collect::<Vec<_>>());

            let xor: Vec<i64> = (&sa ^ &sb).iter().collect();
            prop_assert_eq!(xor, oa.symmetric_difference(&ob).copied().collect::<Vec<_>>());
        }

        #[test]
        fn prop_union_commutes_and_associates(
            a in prop::collection::vec(-100i64..100, 0..50),
            b in prop::collection::vec(-100i64..100, 0..50),
            c in prop::collection::vec(-100i64..100, 0..50),
        ) {
            let (sa, sb, sc) = (interval_of(&a), interval_of(&b), interval_of(&c));
            prop_assert_eq!(&sa | &sb, &sb | &sa);
            prop_assert_eq!(&sa & &sb, &sb & &sa);
            prop_assert_eq!(&(&sa | &sb) | &sc, &sa | &(&sb | &sc));
        }

        #[test]
        fn prop_difference_and_intersection_partition(
            a in prop::collection::vec(-100i64..100, 0..60),
            b in prop::collection::vec(-100i64..100, 0..60),
        ) {
            let sa = interval_of(&a);
            let sb = interval_of(&b);
            let kept = &sa & &sb;
            let dropped = &sa - &sb;
            prop_assert!(kept.isdisjoint(&dropped));
            prop_assert_eq!(&kept | &dropped, sa);
        }

        #[test]
        fn prop_representations_agree(
            values in prop::collection::vec(0i64..400, 0..100)
        ) {
            let set = interval_of(&values);
            let bits = bitmap_of(&values);
            prop_assert_eq!(&set, &bits);
            prop_assert_eq!(&bits, &set);

            // Conversions are exact in both directions.
            prop_assert_eq!(IntervalSet::from(&bits), set.clone());
            prop_assert_eq!(BitmapSet::try_from(&set).unwrap(), bits);
        }

        #[test]
        fn prop_mixed_operators_agree_with_same_representation(
            a in prop::collection::vec(0i64..200, 0..60),
            b in prop::collection::vec(0i64..200, 0..60),
        ) {
            let ia = interval_of(&a);
            let ib = interval_of(&b);
            let ba = bitmap_of(&a);
            let bb = bitmap_of(&b);

            prop_assert_eq!(&ia | &bb, &ia | &ib);
            prop_assert_eq!(&ia & &bb, &ia & &ib);
            prop_assert_eq!(&ia - &bb, &ia - &ib);
            prop_assert_eq!(&ia ^ &bb, &ia ^ &ib);

            prop_assert_eq!(&ba & &ib, &ba & &bb);
            prop_assert_eq!(&ba - &ib, &ba - &bb);
        }

        #[test]
        fn prop_subset_order_is_consistent(
            a in prop::collection::vec(-100i64..100, 0..40),
            extra in prop::collection::vec(-100i64..100, 1..20),
        ) {
            let sa = interval_of(&a);
            let mut sb = sa.clone();
            for &v in &extra {
                sb.add(v);
            }
            prop_assert!(sa.issubset(&sb));
            prop_assert!(sb.issuperset(&sa));
            prop_assert!(sa <= sb);
        }

        #[test]
        fn prop_pop_drains_in_order(
            values in prop::collection::vec(0i64..200, 0..60)
        ) {
            let mut set = interval_of(&values);
            let mut bits = bitmap_of(&values);
            let expected: Vec<i64> = oracle_of(&values).into_iter().collect();

            let mut drained = Vec::new();
            while let Ok(v) = set.pop() {
                drained.push(v);
            }
            prop_assert_eq!(&drained, &expected);

            drained.clear();
            while let Ok(v) = bits.pop() {
                drained.push(v);
            }
            prop_assert_eq!(&drained, &expected);
        }
    }
}
