use serde::{Deserialize, Serialize};

use crate::{Error, Position, Result};

/// A generic 2D grid structure.
///
/// Stores elements of type `T` in a flat vector using row-major order.
/// Cells are addressed by [`Position`] (row, column).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grid<T> {
    rows: usize,
    columns: usize,
    cells: Vec<T>,
}

impl<T> Grid<T> {
    /// Builds a grid from nested rows.
    ///
    /// Fails if there are no rows, the first row is empty, or the rows are
    /// not all the same length.
    pub fn from_rows(rows: Vec<Vec<T>>) -> Result<Self> {
        let row_count = rows.len();
        let columns = rows.first().map(Vec::len).unwrap_or(0);
        if row_count == 0 || columns == 0 {
            return Err(Error::configuration("grid has no cells"));
        }

        let mut cells = Vec::with_capacity(row_count * columns);
        for (row, values) in rows.into_iter().enumerate() {
            if values.len() != columns {
                return Err(Error::configuration(format!(
                    "inconsistent width at row {}: expected {}, found {}",
                    row,
                    columns,
                    values.len()
                )));
            }
            cells.extend(values);
        }

        Ok(Grid {
            rows: row_count,
            columns,
            cells,
        })
    }

    /// Returns the number of rows.
    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Returns the number of columns.
    #[inline]
    pub fn columns(&self) -> usize {
        self.columns
    }

    /// Converts a position to a flat vector index.
    ///
    /// Returns `None` if the position is out of bounds.
    #[inline]
    pub fn position_to_index(&self, position: Position) -> Option<usize> {
        if self.is_valid(position) {
            Some(position.row * self.columns + position.column)
        } else {
            None
        }
    }

    /// Checks if the given position is within the grid boundaries.
    #[inline]
    pub fn is_valid(&self, position: Position) -> bool {
        position.row < self.rows && position.column < self.columns
    }

    /// Gets a reference to the cell at the given position.
    ///
    /// Returns `Err(Error::OutOfBounds)` if the position is invalid.
    pub fn get(&self, position: Position) -> Result<&T> {
        self.position_to_index(position)
            .and_then(|index| self.cells.get(index))
            .ok_or(Error::OutOfBounds {
                position,
                rows: self.rows,
                columns: self.columns,
            })
    }

    /// Returns an iterator over the cells of the grid in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.cells.iter()
    }
}
