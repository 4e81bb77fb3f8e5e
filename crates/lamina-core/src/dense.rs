/// Removes `slot` from a dense vector by swapping the last element into its
/// place, in O(1).
///
/// Returns the previous position of the element that now occupies `slot`, so
/// the caller can rewrite any external indices that referenced it, or `None`
/// when the removed slot was already the last one. Both the action-log
/// payload buckets and the document's polygon arena rely on this to keep
/// their index arrays referentially correct without rescanning payloads.
///
/// Panics if `slot` is out of bounds, like `Vec::swap_remove`.
pub fn dense_remove<T>(items: &mut Vec<T>, slot: usize) -> Option<usize> {
    debug_assert!(slot < items.len());
    items.swap_remove(slot);
    if slot < items.len() {
        Some(items.len())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remove_middle_reports_moved_slot() {
        let mut v = vec!['a', 'b', 'c', 'd'];
        let moved = dense_remove(&mut v, 1);
        assert_eq!(moved, Some(3));
        assert_eq!(v, vec!['a', 'd', 'c']);
    }

    #[test]
    fn test_remove_last_moves_nothing() {
        let mut v = vec![1, 2, 3];
        assert_eq!(dense_remove(&mut v, 2), None);
        assert_eq!(v, vec![1, 2]);
    }

    #[test]
    fn test_remove_only_element() {
        let mut v = vec![42];
        assert_eq!(dense_remove(&mut v, 0), None);
        assert!(v.is_empty());
    }
}
