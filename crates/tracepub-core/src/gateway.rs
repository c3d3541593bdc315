//! Read/write boundary to the remote tabular document.
//!
//! The engine only ever talks to a [`DocumentGateway`]; network transports
//! implement it elsewhere, and [`MemoryGateway`] backs tests and dry runs.

use std::cell::RefCell;
use std::str::FromStr;

use rustc_hash::FxHashMap;
use thiserror::Error;
use tracepub_common::{Dimension, Location, RefError, Span};

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error(transparent)]
    Ref(#[from] RefError),
    #[error("transport error: {0}")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),
    #[error("unexpected document response: {0}")]
    Protocol(String),
}

impl GatewayError {
    pub fn transport<E: std::error::Error + Send + Sync + 'static>(err: E) -> Self {
        GatewayError::Transport(Box::new(err))
    }
}

/// The batched update flushed at the end of a run: an ordered sequence of
/// locations with the values to lay out from each one.
#[derive(Clone, Debug, Default)]
pub struct WritePlan {
    entries: Vec<(Location, Vec<String>)>,
}

impl WritePlan {
    pub fn push(&mut self, location: Location, values: Vec<String>) {
        self.entries.push((location, values));
    }

    pub fn entries(&self) -> &[(Location, Vec<String>)] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Synchronous access to the remote document.
///
/// The `dimension` of every call is the axis along which the value
/// sequence extends from the location's first cell: `Rows` lays values
/// downward, `Columns` rightward.
pub trait DocumentGateway {
    /// Read the values covered by `location` walking along `dimension`.
    /// Missing trailing cells are absent from the result, not padded;
    /// intermediate gaps read as empty strings.
    fn read(&self, location: &Location, dimension: Dimension) -> Result<Vec<String>, GatewayError>;

    /// Read the first cell of `location`; empty string if unset.
    fn read_one(&self, location: &Location) -> Result<String, GatewayError>;

    /// Lay `values` out from `location` along `dimension`.
    fn write(
        &self,
        location: &Location,
        values: &[String],
        dimension: Dimension,
    ) -> Result<(), GatewayError>;

    /// Write a single value into a single cell.
    fn write_one(&self, location: &Location, value: &str) -> Result<(), GatewayError>;

    /// Flush the whole plan as one transaction, every entry laid out along
    /// `dimension`.
    fn batch_write(&self, plan: &WritePlan, dimension: Dimension) -> Result<(), GatewayError>;
}

/// In-memory document used by the test suite and available for dry runs.
/// Cells are keyed by (sheet, column, row); a cell may hold an empty string
/// and still count as present, which is how a manually blanked cell differs
/// from one that was never written.
#[derive(Debug, Default)]
pub struct MemoryGateway {
    cells: RefCell<FxHashMap<(String, String, u32), String>>,
    writes: RefCell<usize>,
}

impl MemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a cell, parsing `location` as a single-cell reference.
    pub fn set(&self, location: &str, value: &str) {
        let loc = Location::from_str(location).and_then(|l| l.single_cell().cloned().map(|c| (l, c)));
        let (loc, cell) = loc.unwrap_or_else(|e| panic!("bad seed location {location}: {e}"));
        self.cells.borrow_mut().insert(
            (
                loc.sheet().unwrap_or_default().to_string(),
                cell.column().as_str().to_string(),
                cell.row(),
            ),
            value.to_string(),
        );
    }

    /// Value of a single cell, `None` if never written.
    pub fn get(&self, location: &str) -> Option<String> {
        let loc: Location = location.parse().ok()?;
        let cell = loc.single_cell().ok()?;
        self.cells
            .borrow()
            .get(&(
                loc.sheet().unwrap_or_default().to_string(),
                cell.column().as_str().to_string(),
                cell.row(),
            ))
            .cloned()
    }

    /// Number of cell writes performed, across all calls.
    pub fn write_count(&self) -> usize {
        *self.writes.borrow()
    }

    fn lookup(&self, location: &Location, cell: &tracepub_common::Cell) -> Option<String> {
        self.cells
            .borrow()
            .get(&(
                location.sheet().unwrap_or_default().to_string(),
                cell.column().as_str().to_string(),
                cell.row(),
            ))
            .cloned()
    }
}

impl DocumentGateway for MemoryGateway {
    fn read(&self, location: &Location, dimension: Dimension) -> Result<Vec<String>, GatewayError> {
        let (start, end) = match location.span() {
            Span::Cell(c) => (c.clone(), c.clone()),
            Span::Range(start, end) => (start.clone(), end.clone()),
        };
        let inverted = match dimension {
            Dimension::Rows => start.row() > end.row(),
            Dimension::Columns => start.column() > end.column(),
        };
        if inverted {
            return Ok(Vec::new());
        }
        let mut values: Vec<Option<String>> = Vec::new();
        let mut cursor = start;
        loop {
            values.push(self.lookup(location, &cursor));
            if cursor == end {
                break;
            }
            cursor = cursor.next(dimension);
        }
        // Trailing never-written cells are absent, interior ones read "".
        while matches!(values.last(), Some(None)) {
            values.pop();
        }
        Ok(values.into_iter().map(Option::unwrap_or_default).collect())
    }

    fn read_one(&self, location: &Location) -> Result<String, GatewayError> {
        Ok(self.lookup(location, location.start()).unwrap_or_default())
    }

    fn write(
        &self,
        location: &Location,
        values: &[String],
        dimension: Dimension,
    ) -> Result<(), GatewayError> {
        let mut cursor = location.start().clone();
        for value in values {
            self.cells.borrow_mut().insert(
                (
                    location.sheet().unwrap_or_default().to_string(),
                    cursor.column().as_str().to_string(),
                    cursor.row(),
                ),
                value.clone(),
            );
            *self.writes.borrow_mut() += 1;
            cursor = cursor.next(dimension);
        }
        Ok(())
    }

    fn write_one(&self, location: &Location, value: &str) -> Result<(), GatewayError> {
        let values = [value.to_string()];
        self.write(location, &values, Dimension::Rows)
    }

    fn batch_write(&self, plan: &WritePlan, dimension: Dimension) -> Result<(), GatewayError> {
        for (location, values) in plan.entries() {
            self.write(location, values, dimension)?;
        }
        Ok(())
    }
}
