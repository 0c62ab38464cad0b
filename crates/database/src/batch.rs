//! Statement batching bounds
//!
//! SQLite caps the number of bound variables per statement. Every
//! multi-row statement in this crate chunks its rows so that
//! `rows_per_statement * columns_per_row` stays under that cap; narrow
//! tables (the 3-column junction) get larger batches than wide ones.

/// SQLite's default `SQLITE_MAX_VARIABLE_NUMBER`
pub const MAX_BIND_PARAMS: usize = 999;

/// Column counts of the batched tables
pub const TRACK_COLUMNS: usize = 21;
pub const BOOK_COLUMNS: usize = 7;
pub const AUTHOR_COLUMNS: usize = 4;
pub const CROSS_REF_COLUMNS: usize = 3;

/// Rows per statement for a table of `columns` bound values per row
pub const fn batch_rows(columns: usize) -> usize {
    MAX_BIND_PARAMS / columns
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_sizes_respect_bind_cap() {
        for columns in [
            TRACK_COLUMNS,
            BOOK_COLUMNS,
            AUTHOR_COLUMNS,
            CROSS_REF_COLUMNS,
            1,
        ] {
            assert!(batch_rows(columns) * columns <= MAX_BIND_PARAMS);
            assert!(batch_rows(columns) >= 1);
        }
    }

    #[test]
    fn test_cross_ref_batch_bound() {
        assert!(batch_rows(CROSS_REF_COLUMNS) * 3 <= MAX_BIND_PARAMS);
    }

    #[test]
    fn test_narrow_tables_get_larger_batches() {
        assert!(batch_rows(CROSS_REF_COLUMNS) > batch_rows(TRACK_COLUMNS));
    }
}
