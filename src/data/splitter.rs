// ============================================================
// Layer 4 — Stratified Train/Test Splitter
// ============================================================
// Splits samples into a training set and a held-out test set
// while keeping each class's share the same in both.
//
// Why stratify?
//   Financial sentiment corpora are imbalanced (neutral headlines
//   dominate). A purely random 10% split of a small table can end
//   up with no negative examples at all, which makes the held-out
//   F1 meaningless.
//
// How the test set is sized:
//   n_test = ceil(test_size * n)
//   Each class gets floor(n_test * class_count / n) test rows; the
//   rows left over go to the classes with the largest fractional
//   remainder. For {0: 60, 1: 30, 2: 10} and test_size = 0.1 that
//   is exactly {0: 6, 1: 3, 2: 1}.
//
// The shuffle inside each class uses a seeded StdRng so the same
// seed always produces the same split.
//
// Reference: rand crate documentation (SeedableRng, SliceRandom)

use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};
use std::collections::BTreeMap;

use crate::data::error::DataError;

/// Split `samples` into (train, test), stratified by `classes`.
///
/// # Arguments
/// * `samples`   - All samples (consumed by this function)
/// * `classes`   - Class id of each sample, same length as `samples`
/// * `test_size` - Held-out fraction, strictly between 0 and 1
/// * `seed`      - Seed for the shuffles
pub fn stratified_split<T>(
    samples:   Vec<T>,
    classes:   &[usize],
    test_size: f64,
    seed:      u64,
) -> Result<(Vec<T>, Vec<T>), DataError> {
    if samples.len() != classes.len() {
        return Err(DataError::Stratification(format!(
            "{} samples but {} class ids",
            samples.len(),
            classes.len()
        )));
    }
    if !(test_size > 0.0 && test_size < 1.0) {
        return Err(DataError::Stratification(format!(
            "test_size must be between 0 and 1, got {test_size}"
        )));
    }

    let total = samples.len();

    // Group sample indices by class (BTreeMap keeps class order stable)
    let mut by_class: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for (i, &c) in classes.iter().enumerate() {
        by_class.entry(c).or_default().push(i);
    }

    if let Some((class, members)) = by_class.iter().find(|(_, m)| m.len() < 2) {
        return Err(DataError::Stratification(format!(
            "class {class} has only {} member(s); every class needs at least 2",
            members.len()
        )));
    }

    let n_test  = held_out_count(total, test_size);
    let n_train = total - n_test;
    if n_test < by_class.len() || n_train < by_class.len() {
        return Err(DataError::Stratification(format!(
            "a split of {n_train} train / {n_test} test rows cannot hold all {} classes",
            by_class.len()
        )));
    }

    let counts: Vec<(usize, usize)> = by_class.iter().map(|(&c, m)| (c, m.len())).collect();
    let quotas = allocate(&counts, total, n_test);

    // ── Shuffle within each class and take the quota for test ────────────────
    let mut rng = StdRng::seed_from_u64(seed);
    let mut train_idx = Vec::with_capacity(n_train);
    let mut test_idx  = Vec::with_capacity(n_test);

    for (class, mut members) in by_class {
        members.shuffle(&mut rng);
        let take = quotas.get(&class).copied().unwrap_or(0);
        test_idx.extend_from_slice(&members[..take]);
        train_idx.extend_from_slice(&members[take..]);
    }

    // Interleave classes so mini-batches are not class-sorted
    train_idx.shuffle(&mut rng);
    test_idx.shuffle(&mut rng);

    // ── Move samples out by index ─────────────────────────────────────────────
    let mut slots: Vec<Option<T>> = samples.into_iter().map(Some).collect();
    let train = train_idx.iter().filter_map(|&i| slots[i].take()).collect::<Vec<_>>();
    let test  = test_idx.iter().filter_map(|&i| slots[i].take()).collect::<Vec<_>>();

    tracing::debug!(
        "Stratified split: {} training, {} held-out ({} classes)",
        train.len(),
        test.len(),
        counts.len()
    );

    Ok((train, test))
}

/// ceil(test_size * n), ignoring float noise such as 10.000000000000002.
fn held_out_count(total: usize, test_size: f64) -> usize {
    let raw = test_size * total as f64;
    let rounded = raw.round();
    if (raw - rounded).abs() < 1e-9 {
        rounded as usize
    } else {
        raw.ceil() as usize
    }
}

/// Distribute `n_test` rows across classes in proportion to their size.
fn allocate(counts: &[(usize, usize)], total: usize, n_test: usize) -> BTreeMap<usize, usize> {
    let mut quotas = BTreeMap::new();
    let mut remainders = Vec::with_capacity(counts.len());
    let mut assigned = 0usize;

    for &(class, count) in counts {
        let exact = n_test as f64 * count as f64 / total as f64;
        let floor = exact.floor() as usize;
        quotas.insert(class, floor);
        assigned += floor;
        remainders.push((class, count, exact - floor as f64));
    }

    // Largest remainder first; bigger classes win ties, then lower ids
    remainders.sort_by(|a, b| {
        b.2.partial_cmp(&a.2)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(b.1.cmp(&a.1))
            .then(a.0.cmp(&b.0))
    });

    for (class, count, _) in remainders.into_iter().take(n_test.saturating_sub(assigned)) {
        if let Some(q) = quotas.get_mut(&class) {
            // Never take every member of a class
            if *q + 1 < count {
                *q += 1;
            }
        }
    }

    quotas
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn class_counts(classes: &[usize]) -> BTreeMap<usize, usize> {
        let mut m = BTreeMap::new();
        for &c in classes {
            *m.entry(c).or_insert(0) += 1;
        }
        m
    }

    #[test]
    fn test_proportions_are_preserved() {
        // {0: 60, 1: 30, 2: 10}
        let classes: Vec<usize> = (0..100)
            .map(|i| if i < 60 { 0 } else if i < 90 { 1 } else { 2 })
            .collect();
        let samples: Vec<(usize, usize)> = classes.iter().copied().enumerate().collect();

        let (train, test) = stratified_split(samples, &classes, 0.1, 42).unwrap();
        assert_eq!(test.len(), 10);
        assert_eq!(train.len(), 90);

        let test_classes: Vec<usize> = test.iter().map(|&(_, c)| c).collect();
        let counts = class_counts(&test_classes);
        assert_eq!(counts[&0], 6);
        assert_eq!(counts[&1], 3);
        assert_eq!(counts[&2], 1);
    }

    #[test]
    fn test_all_items_preserved_once() {
        let classes: Vec<usize> = (0..50).map(|i| i % 3).collect();
        let samples: Vec<usize> = (0..50).collect();
        let (train, test) = stratified_split(samples, &classes, 0.2, 7).unwrap();

        let mut all: Vec<usize> = train.into_iter().chain(test).collect();
        all.sort_unstable();
        assert_eq!(all, (0..50).collect::<Vec<_>>());
    }

    #[test]
    fn test_same_seed_same_split() {
        let classes: Vec<usize> = (0..40).map(|i| i % 2).collect();
        let a = stratified_split((0..40).collect::<Vec<_>>(), &classes, 0.25, 42).unwrap();
        let b = stratified_split((0..40).collect::<Vec<_>>(), &classes, 0.25, 42).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_cycling_labels_cover_every_class() {
        let classes: Vec<usize> = (0..100).map(|i| i % 3).collect();
        let (train, test) =
            stratified_split((0..100).collect::<Vec<usize>>(), &classes, 0.1, 42).unwrap();
        assert_eq!(test.len(), 10);
        let train_classes: Vec<usize> = train.iter().map(|&i| classes[i]).collect();
        assert_eq!(class_counts(&train_classes).len(), 3);
    }

    #[test]
    fn test_singleton_class_is_rejected() {
        let classes = vec![0, 0, 0, 1];
        let err = stratified_split(vec![1, 2, 3, 4], &classes, 0.5, 0).unwrap_err();
        assert!(matches!(err, DataError::Stratification(_)));
    }

    #[test]
    fn test_invalid_test_size_is_rejected() {
        let classes = vec![0, 0, 1, 1];
        assert!(stratified_split(vec![1, 2, 3, 4], &classes, 1.0, 0).is_err());
        assert!(stratified_split(vec![1, 2, 3, 4], &classes, 0.0, 0).is_err());
    }
}
