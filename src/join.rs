//! Inner join of timestamp-keyed sequences. Rows whose key is not
//! present in every joined sequence are dropped; that is the intended
//! semantics of the merge stage, not a failure mode.

use itertools::{EitherOrBoth, Itertools};

#[derive(Debug, Clone, PartialEq)]
pub struct KeyVal<K, V> {
    pub key: K,
    pub val: V,
}

impl<K, V> KeyVal<K, V> {
    pub fn new(key: K, val: V) -> Self {
        Self { key, val }
    }
}

/// Strict inner join of two sequences ordered by key. Keys present on
/// only one side are silently dropped, so the result never has more
/// rows than the shorter input.
pub fn keyval_inner_join_2<K: Ord, V1, V2>(
    a: impl IntoIterator<Item = KeyVal<K, V1>>,
    b: impl IntoIterator<Item = KeyVal<K, V2>>,
) -> impl Iterator<Item = KeyVal<K, (V1, V2)>> {
    a.into_iter()
        .merge_join_by(b.into_iter(), |a, b| a.key.cmp(&b.key))
        .filter_map(|eob| match eob {
            EitherOrBoth::Both(a, b) => Some(KeyVal {
                key: a.key,
                val: (a.val, b.val),
            }),
            EitherOrBoth::Left(_) => None,
            EitherOrBoth::Right(_) => None,
        })
}

/// Sort a keyed sequence in place so it is valid join input. The
/// reconstructed-timestamp sources are naturally ordered except when a
/// run wraps past midnight, where the fold-back breaks the ordering.
pub fn sort_by_key<K: Ord + Copy, V>(rows: &mut [KeyVal<K, V>]) {
    rows.sort_by_key(|kv| kv.key);
}
