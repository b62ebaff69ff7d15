//! Rectangular row-tables, the unit handed to a [`crate::TableExporter`].

use serde::Serialize;

/// A named sheet with one header and rows of equal width.
///
/// The header is the union of every row's keys in first-seen order; a row that
/// lacks a key holds an empty cell in that column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowTable {
    sheet_name: String,
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl RowTable {
    /// Builds a table from rows of `(column, cell)` pairs.
    ///
    /// `declared` columns come first, in the given order, whether or not any
    /// row carries them; undeclared keys follow in first-seen order.
    pub fn from_rows<I>(sheet_name: impl Into<String>, declared: &[&str], rows: I) -> Self
    where
        I: IntoIterator<Item = Vec<(String, String)>>,
    {
        let mut columns: Vec<String> = declared.iter().map(|c| (*c).to_owned()).collect();
        let rows: Vec<Vec<(String, String)>> = rows.into_iter().collect();
        for row in &rows {
            for (key, _) in row {
                if !columns.iter().any(|c| c == key) {
                    columns.push(key.clone());
                }
            }
        }

        let rows = rows
            .into_iter()
            .map(|row| {
                columns
                    .iter()
                    .map(|column| {
                        row.iter()
                            .find(|(key, _)| key == column)
                            .map(|(_, cell)| cell.clone())
                            .unwrap_or_default()
                    })
                    .collect()
            })
            .collect();

        Self {
            sheet_name: sheet_name.into(),
            columns,
            rows,
        }
    }

    /// The sheet name.
    pub fn sheet_name(&self) -> &str {
        &self.sheet_name
    }

    /// The header.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// The rows; each has exactly `columns().len()` cells.
    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// Number of data rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// `true` when there are no data rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// The cell at `row` under `column`.
    pub fn cell(&self, row: usize, column: &str) -> Option<&str> {
        let index = self.columns.iter().position(|c| c == column)?;
        self.rows.get(row).map(|r| r[index].as_str())
    }

    /// Every value of one column, top to bottom.
    pub fn column(&self, column: &str) -> Vec<&str> {
        (0..self.rows.len())
            .filter_map(|row| self.cell(row, column))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect()
    }

    #[test]
    fn header_is_first_seen_union_and_rows_are_padded() {
        let table = RowTable::from_rows(
            "mixed",
            &[],
            vec![
                row(&[("a", "1"), ("b", "2")]),
                row(&[("c", "3"), ("a", "4")]),
            ],
        );
        assert_eq!(table.columns(), ["a", "b", "c"]);
        assert_eq!(table.rows(), [vec!["1", "2", ""], vec!["4", "", "3"]]);
    }

    #[test]
    fn declared_columns_lead_even_when_unused() {
        let table = RowTable::from_rows("declared", &["x", "y"], vec![row(&[("z", "1"), ("y", "2")])]);
        assert_eq!(table.columns(), ["x", "y", "z"]);
        assert_eq!(table.cell(0, "x"), Some(""));
        assert_eq!(table.cell(0, "y"), Some("2"));
        assert_eq!(table.cell(0, "missing"), None);
        assert_eq!(table.cell(3, "y"), None);
    }

    #[test]
    fn column_reads_top_to_bottom() {
        let table = RowTable::from_rows(
            "col",
            &["n"],
            vec![row(&[("n", "1")]), row(&[("n", "2")]), row(&[])],
        );
        assert_eq!(table.column("n"), ["1", "2", ""]);
        assert_eq!(table.len(), 3);
    }
}
