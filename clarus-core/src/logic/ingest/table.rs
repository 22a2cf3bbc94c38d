//! In-memory table of raw CSV cells
//!
//! Cells are kept as the original text so the scored file reproduces the
//! upload verbatim; numeric interpretation happens in `features`.

/// Row-major table with a header row
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    /// Build a table. Short rows are padded with empty cells, long rows truncated.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        let width = columns.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, String::new());
                row
            })
            .collect();
        Self { columns, rows }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of the first column called `name`
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Cells of one column, top to bottom
    pub fn column(&self, index: usize) -> impl Iterator<Item = &str> + '_ {
        self.rows.iter().map(move |row| row[index].as_str())
    }

    /// Trim surrounding whitespace from every column name
    pub fn trim_column_names(&mut self) {
        for name in &mut self.columns {
            let trimmed = name.trim();
            if trimmed.len() != name.len() {
                *name = trimmed.to_string();
            }
        }
    }

    /// New table holding only the given rows, in the given order
    pub fn select_rows(&self, indices: &[usize]) -> Table {
        Table {
            columns: self.columns.clone(),
            rows: indices.iter().map(|&i| self.rows[i].clone()).collect(),
        }
    }

    /// New table without any column whose trimmed name is in `names`
    pub fn without_columns(&self, names: &[&str]) -> Table {
        let keep: Vec<usize> = (0..self.columns.len())
            .filter(|&i| !names.contains(&self.columns[i].trim()))
            .collect();

        Table {
            columns: keep.iter().map(|&i| self.columns[i].clone()).collect(),
            rows: self
                .rows
                .iter()
                .map(|row| keep.iter().map(|&i| row[i].clone()).collect())
                .collect(),
        }
    }

    /// Replace the cells of column `name` in place, or append it when absent.
    ///
    /// Later columns with the same name are dropped so `name` appears once.
    pub fn set_column(&mut self, name: &str, values: Vec<String>) {
        let Some(index) = self.column_index(name) else {
            self.push_column(name, values);
            return;
        };

        assert_eq!(values.len(), self.rows.len(), "column length must match row count");
        for (row, value) in self.rows.iter_mut().zip(values) {
            row[index] = value;
        }

        let duplicates: Vec<usize> = (index + 1..self.columns.len())
            .filter(|&i| self.columns[i] == name)
            .collect();
        for &i in duplicates.iter().rev() {
            self.columns.remove(i);
            for row in &mut self.rows {
                row.remove(i);
            }
        }
    }

    /// Append a column; `values` must have one entry per row
    pub fn push_column(&mut self, name: impl Into<String>, values: Vec<String>) {
        assert_eq!(values.len(), self.rows.len(), "column length must match row count");
        self.columns.push(name.into());
        for (row, value) in self.rows.iter_mut().zip(values) {
            row.push(value);
        }
    }
}
