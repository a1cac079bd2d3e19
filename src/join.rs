use itertools::{EitherOrBoth, Itertools};

#[derive(Debug, Clone, PartialEq)]
pub struct KeyVal<K, V> {
    pub key: K,
    pub val: V,
}

/// Full outer join of two sequences of `KeyVal` that are ordered by
/// `KeyVal.key`. Keys missing on one side get `None` there.
pub fn keyval_outer_join_2<K: Ord, V1, V2>(
    a: impl IntoIterator<Item = KeyVal<K, V1>>,
    b: impl IntoIterator<Item = KeyVal<K, V2>>,
) -> impl Iterator<Item = KeyVal<K, (Option<V1>, Option<V2>)>> {
    a.into_iter()
        .merge_join_by(b, |a, b| a.key.cmp(&b.key))
        .map(|eob| match eob {
            EitherOrBoth::Both(a, b) => KeyVal {
                key: a.key,
                val: (Some(a.val), Some(b.val)),
            },
            EitherOrBoth::Left(a) => KeyVal {
                key: a.key,
                val: (Some(a.val), None),
            },
            EitherOrBoth::Right(b) => KeyVal {
                key: b.key,
                val: (None, Some(b.val)),
            },
        })
}

/// Outer join of any number of sequences ordered by `KeyVal.key`:
/// every key present in any sequence is yielded once, with a `Vec`
/// of the same length as `sequences`, holding `None` where that
/// sequence lacks the key.
pub fn keyval_outer_join<K: Ord, V>(
    sequences: Vec<Vec<KeyVal<K, V>>>,
) -> Vec<KeyVal<K, Vec<Option<V>>>> {
    let mut joined: Vec<KeyVal<K, Vec<Option<V>>>> = Vec::new();
    for (i, sequence) in sequences.into_iter().enumerate() {
        joined = keyval_outer_join_2(joined, sequence)
            .map(|KeyVal { key, val }| {
                let (previous, new) = val;
                let mut vals = previous.unwrap_or_else(|| (0..i).map(|_| None).collect());
                vals.push(new);
                KeyVal { key, val: vals }
            })
            .collect();
    }
    joined
}
