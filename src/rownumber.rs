//! 1-based row numbers derived from a row's position in the rendered sequence.
//! Numbers are never stored; they are recomputed on every derivation.

use crate::row::{Row, RowId};

/// Number of `id` within `ordered`, or `None` when the row isn't being rendered.
pub fn number_of(id: &RowId, ordered: &[&Row]) -> Option<usize> {
    ordered.iter().position(|row| row.id() == id).map(|idx| idx + 1)
}

/// Pair every rendered row with its number, `1..=n` in order.
pub fn project<'a>(ordered: &[&'a Row]) -> Vec<(usize, &'a Row)> {
    ordered
        .iter()
        .enumerate()
        .map(|(idx, &row)| (idx + 1, row))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numbers_follow_position() {
        let rows: Vec<Row> = ["x", "y", "z"].iter().map(|id| Row::new(*id)).collect();
        let ordered: Vec<&Row> = vec![&rows[2], &rows[0]];
        assert_eq!(number_of(&RowId::from("z"), &ordered), Some(1));
        assert_eq!(number_of(&RowId::from("x"), &ordered), Some(2));
        assert_eq!(number_of(&RowId::from("y"), &ordered), None);
    }

    #[test]
    fn test_project_is_contiguous() {
        let rows: Vec<Row> = (0..5u64).map(Row::new).collect();
        let ordered: Vec<&Row> = rows.iter().rev().collect();
        let numbers: Vec<usize> = project(&ordered).into_iter().map(|(n, _)| n).collect();
        assert_eq!(numbers, vec![1, 2, 3, 4, 5]);
        assert_eq!(project(&ordered)[0].1.id(), &RowId::from("4"));
        assert!(project(&[]).is_empty());
    }
}
