// Copyright (C) 2016-2018  ERGO-Code
//
// Doubly linked count-bucket lists (see [1] section 5.5)
//
// Maintain rows or columns of the active submatrix in doubly linked lists
// indexed by their current nonzero count. The implementation uses arrays
//
//     first[0..ncount],  next[0..nelem-1],  last[0..nelem-1]
//
// first[c] is the head element of the list for count c, or -1 when that
// list is empty. For an element i somewhere in a chain, next[i] and last[i]
// are its neighbours (-1 terminates the chain forward). The back link of a
// chain head is the sentinel -2 - c, so a chain self-identifies the bucket
// it belongs to and an element can be unlinked in constant time without a
// separate is-head flag.
//
//    [1] Istvan Maros, Computational Techniques of the Simplex Method

use crate::consts::Int;

/// Prepend element `elem` to the chain for count `count`.
/// `elem` must not currently be in any chain.
pub(crate) fn link_add(
    elem: Int,
    count: Int,
    first: &mut [Int],
    next: &mut [Int],
    last: &mut [Int],
) {
    let mover = first[count as usize];
    last[elem as usize] = -2 - count;
    next[elem as usize] = mover;
    first[count as usize] = elem;
    if mover >= 0 {
        last[mover as usize] = elem;
    }
}

/// Unlink element `elem` from whatever chain it is in. The head case is
/// recognized by the negative back-link sentinel, which recovers the
/// bucket as -last - 2.
pub(crate) fn link_del(elem: Int, first: &mut [Int], next: &mut [Int], last: &mut [Int]) {
    let xlast = last[elem as usize];
    let xnext = next[elem as usize];
    if xlast >= 0 {
        next[xlast as usize] = xnext;
    } else {
        first[(-xlast - 2) as usize] = xnext;
    }
    if xnext >= 0 {
        last[xnext as usize] = xlast;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(first: &[Int], next: &[Int], count: Int) -> Vec<Int> {
        let mut out = Vec::new();
        let mut e = first[count as usize];
        while e >= 0 {
            out.push(e);
            e = next[e as usize];
        }
        out
    }

    #[test]
    fn add_prepends_and_del_unlinks() {
        let mut first = vec![-1; 4];
        let mut next = vec![-1; 6];
        let mut last = vec![-1; 6];

        link_add(0, 2, &mut first, &mut next, &mut last);
        link_add(1, 2, &mut first, &mut next, &mut last);
        link_add(2, 2, &mut first, &mut next, &mut last);
        assert_eq!(collect(&first, &next, 2), vec![2, 1, 0]);
        // head carries the bucket sentinel
        assert_eq!(last[2], -4);

        // unlink middle, head, tail
        link_del(1, &mut first, &mut next, &mut last);
        assert_eq!(collect(&first, &next, 2), vec![2, 0]);
        link_del(2, &mut first, &mut next, &mut last);
        assert_eq!(collect(&first, &next, 2), vec![0]);
        assert_eq!(last[0], -4);
        link_del(0, &mut first, &mut next, &mut last);
        assert_eq!(collect(&first, &next, 2), Vec::<Int>::new());
        assert_eq!(first[2], -1);
    }

    #[test]
    fn chains_in_distinct_buckets_do_not_interfere() {
        let mut first = vec![-1; 5];
        let mut next = vec![-1; 4];
        let mut last = vec![-1; 4];

        link_add(3, 1, &mut first, &mut next, &mut last);
        link_add(0, 4, &mut first, &mut next, &mut last);
        link_add(1, 1, &mut first, &mut next, &mut last);
        assert_eq!(collect(&first, &next, 1), vec![1, 3]);
        assert_eq!(collect(&first, &next, 4), vec![0]);

        link_del(3, &mut first, &mut next, &mut last);
        link_add(3, 4, &mut first, &mut next, &mut last);
        assert_eq!(collect(&first, &next, 1), vec![1]);
        assert_eq!(collect(&first, &next, 4), vec![3, 0]);
    }
}
