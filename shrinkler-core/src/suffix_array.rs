//! Suffix array construction over an integer alphabet (SA-IS).
//!
//! Ported from `SuffixArray.c`'s induced-sorting algorithm: sort LMS
//! substrings, name them, recurse if names aren't already unique, then
//! induce the full suffix array from the sorted LMS suffixes. The input
//! must carry a sentinel symbol, strictly smaller than every other symbol
//! in the alphabet, at its last position.

const UNINITIALIZED: i32 = -1;

fn is_lms(i: i32, stype: &[bool]) -> bool {
    i > 0 && stype[i as usize] && !stype[i as usize - 1]
}

fn substrings_equal(data: &[i32], mut i1: i32, mut i2: i32, stype: &[bool]) -> bool {
    loop {
        if data[i1 as usize] != data[i2 as usize] {
            return false;
        }
        i1 += 1;
        i2 += 1;
        if is_lms(i1, stype) && is_lms(i2, stype) {
            return true;
        }
    }
}

fn induce(
    data: &[i32],
    suffix_array: &mut [i32],
    alphabet_size: usize,
    stype: &[bool],
    buckets: &[i32],
    bucket_index: &mut [i32],
) {
    let length = suffix_array.len();

    // Induce L suffixes.
    bucket_index[..alphabet_size].copy_from_slice(&buckets[..alphabet_size]);
    for s in 0..length {
        let index = suffix_array[s];
        if index > 0 && !stype[(index - 1) as usize] {
            let b = data[(index - 1) as usize] as usize;
            suffix_array[bucket_index[b] as usize] = index - 1;
            bucket_index[b] += 1;
        }
    }

    // Induce S suffixes.
    for b in 0..alphabet_size {
        bucket_index[b] = buckets[b + 1];
    }
    for s in (0..length).rev() {
        let index = suffix_array[s];
        debug_assert_ne!(index, UNINITIALIZED);
        if index > 0 && stype[(index - 1) as usize] {
            let b = data[(index - 1) as usize] as usize;
            bucket_index[b] -= 1;
            suffix_array[bucket_index[b] as usize] = index - 1;
        }
    }
}

/// Compute the suffix array of `data` over an alphabet of `alphabet_size`
/// symbols (`0..alphabet_size`). `data`'s last element must be strictly
/// smaller than every other element (the sentinel).
///
/// Writes `data.len()` entries into `suffix_array`, a permutation of
/// `0..data.len()`.
pub fn compute_suffix_array(data: &[i32], suffix_array: &mut [i32], alphabet_size: usize) {
    let length = data.len();
    debug_assert!(length >= 1);
    debug_assert_eq!(suffix_array.len(), length);
    if length == 1 {
        suffix_array[0] = 0;
        return;
    }

    let mut stype = vec![false; length];
    let mut buckets = vec![0i32; alphabet_size + 1];

    stype[length - 1] = true;
    buckets[data[length - 1] as usize] = 1;
    let mut is_s = true;
    let mut lms_count = 0usize;
    for i in (0..length - 1).rev() {
        buckets[data[i] as usize] += 1;
        match data[i].cmp(&data[i + 1]) {
            std::cmp::Ordering::Greater => {
                if is_s {
                    lms_count += 1;
                }
                is_s = false;
            }
            std::cmp::Ordering::Less => {
                is_s = true;
            }
            std::cmp::Ordering::Equal => {}
        }
        stype[i] = is_s;
    }

    let mut l = 0i32;
    for b in buckets.iter_mut() {
        let l_next = l + *b;
        *b = l;
        l = l_next;
    }
    debug_assert_eq!(l as usize, length);

    suffix_array.fill(UNINITIALIZED);
    let mut bucket_index = vec![0i32; alphabet_size];
    for b in 0..alphabet_size {
        bucket_index[b] = buckets[b + 1];
    }
    for i in (1..length as i32).rev() {
        if is_lms(i, &stype) {
            let b = data[i as usize] as usize;
            bucket_index[b] -= 1;
            suffix_array[bucket_index[b] as usize] = i;
        }
    }

    induce(
        data,
        suffix_array,
        alphabet_size,
        &stype,
        &buckets,
        &mut bucket_index,
    );

    // Compact LMS indices at the front.
    let mut j = 0usize;
    for s in 0..length {
        let index = suffix_array[s];
        if is_lms(index, &stype) {
            suffix_array[j] = index;
            j += 1;
        }
    }
    debug_assert_eq!(j, lms_count);

    // Name LMS substrings using the second half of suffix_array as scratch.
    let split = length / 2;
    let sub_capacity = length - split;
    for slot in suffix_array[split..].iter_mut() {
        *slot = UNINITIALIZED;
    }
    let mut name = 0i32;
    let mut prev_index = UNINITIALIZED;
    for s in 0..lms_count {
        let index = suffix_array[s];
        debug_assert_ne!(index, UNINITIALIZED);
        if prev_index != UNINITIALIZED && !substrings_equal(data, prev_index, index, &stype) {
            name += 1;
        }
        debug_assert_eq!(suffix_array[split + index as usize / 2], UNINITIALIZED);
        suffix_array[split + index as usize / 2] = name;
        prev_index = index;
    }
    let new_alphabet_size = (name + 1) as usize;

    if new_alphabet_size != lms_count {
        // Compact named LMS symbols.
        let mut j = 0usize;
        for i in 0..sub_capacity {
            let n = suffix_array[split + i];
            if n != UNINITIALIZED {
                suffix_array[split + j] = n;
                j += 1;
            }
        }
        debug_assert_eq!(j, lms_count);

        let (sorted_prefix, sub_data_region) = suffix_array.split_at_mut(split);
        let sub_data = &mut sub_data_region[..lms_count];
        let mut recursed_sa = vec![0i32; lms_count];
        compute_suffix_array(&sub_data[..lms_count], &mut recursed_sa, new_alphabet_size);

        // Map named-symbol indices back to LMS positions in the original string.
        let mut j = 0usize;
        for i in 1..length {
            if is_lms(i as i32, &stype) {
                sub_data[j] = i as i32;
                j += 1;
            }
        }
        debug_assert_eq!(j, lms_count);
        for s in 0..lms_count {
            debug_assert!((recursed_sa[s] as usize) < lms_count);
            sorted_prefix[s] = sub_data[recursed_sa[s] as usize];
        }
    }

    // Place sorted LMS suffixes at the ends of their buckets.
    let mut j = length;
    let mut s = lms_count as i32 - 1;
    for b in (0..alphabet_size).rev() {
        while s >= 0 && data[suffix_array[s as usize] as usize] as usize == b {
            j -= 1;
            suffix_array[j] = suffix_array[s as usize];
            s -= 1;
        }
        debug_assert!(j >= buckets[b] as usize);
        while j > buckets[b] as usize {
            j -= 1;
            suffix_array[j] = UNINITIALIZED;
        }
    }

    induce(
        data,
        suffix_array,
        alphabet_size,
        &stype,
        &buckets,
        &mut bucket_index,
    );
}

/// Build the suffix array, inverse suffix array and LCP array (Kasai's
/// algorithm) for `data`, which must already carry a unique-minimum
/// sentinel at its last position.
pub fn build_tables(data: &[i32], alphabet_size: usize) -> (Vec<i32>, Vec<i32>, Vec<i32>) {
    let length = data.len();
    let mut suffix_array = vec![0i32; length];
    compute_suffix_array(data, &mut suffix_array, alphabet_size);

    let mut inverse = vec![0i32; length];
    for (rank, &pos) in suffix_array.iter().enumerate() {
        inverse[pos as usize] = rank as i32;
    }

    let mut lcp = vec![0i32; length];
    let mut h = 0i32;
    for i in 0..length - 1 {
        let rank = inverse[i] as usize;
        if rank + 1 >= length {
            // The max-rank suffix has no "next" entry in the suffix array
            // to compare against; leave lcp[rank] at its default 0.
            continue;
        }
        let j = suffix_array[rank + 1] as usize;
        let m = (length - i.max(j)) as i32;
        while h < m && data[i + h as usize] == data[j + h as usize] {
            h += 1;
        }
        lcp[rank] = h;
        if h > 0 {
            h -= 1;
        }
    }
    lcp[length - 1] = 0;

    (suffix_array, inverse, lcp)
}
