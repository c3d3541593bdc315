//! Reads the identifiers already present in the document and reconciles
//! incoming trace items against them.
//!
//! The loader owns the walking coordinate: a single movable part (row or
//! column, depending on the walk dimension) shared by every output column.
//! It advances once per scanned identifier position, blanks included, so
//! the cursor stays aligned with the source sheet; `create` then continues
//! the same walk to append rows for tests the sheet does not know yet.

use rustc_hash::{FxHashMap, FxHashSet};
use thiserror::Error;
use tracepub_common::{Cell, CellPart, Dimension, Item, Location, RefError};

use crate::gateway::{DocumentGateway, GatewayError};
use crate::test::{Test, TestLocations};

#[derive(Debug, Error)]
pub enum LoadError {
    #[error(transparent)]
    Ref(#[from] RefError),
    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

/// How one trace item was routed by [`Loader::reconcile`].
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ReconcileOutcome {
    /// Appended to an aggregate that already existed in this run.
    Appended,
    /// First sighting of an unknown identifier: aggregate created, item
    /// appended.
    Created,
    /// Dropped: destination not writable, or no identifier at all.
    Skipped,
}

/// Identifier-keyed aggregate map preserving first-insertion order, so the
/// write plan comes out deterministic.
#[derive(Debug, Default)]
pub struct TestMap {
    index: FxHashMap<String, usize>,
    tests: Vec<Test>,
}

impl TestMap {
    pub fn insert(&mut self, test: Test) {
        match self.index.get(test.id()) {
            Some(&i) => self.tests[i] = test,
            None => {
                self.index.insert(test.id().to_string(), self.tests.len());
                self.tests.push(test);
            }
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&Test> {
        self.index.get(id).map(|&i| &self.tests[i])
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Test> {
        self.index.get(id).copied().map(|i| &mut self.tests[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &Test> {
        self.tests.iter()
    }

    pub fn len(&self) -> usize {
        self.tests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tests.is_empty()
    }
}

/// Sheet plus fixed coordinate of one output column; combined with the
/// loader's movable cursor it yields the column's cell at the current walk
/// position.
#[derive(Clone, Debug)]
struct OutputColumn {
    sheet: Option<String>,
    fixed: CellPart,
}

impl OutputColumn {
    fn from_location(location: &Location, dimension: Dimension) -> Result<Self, RefError> {
        let cell = location.single_cell()?;
        Ok(OutputColumn {
            sheet: location.sheet().map(str::to_string),
            fixed: cell.fixed_part(dimension),
        })
    }

    fn at(&self, movable: &CellPart) -> Result<Location, RefError> {
        let cell = Cell::from_parts(&self.fixed, movable)?;
        Ok(Location::cell(self.sheet.clone(), cell))
    }

    /// The adjacent output column, one step further along the fixed axis.
    fn shifted(&self) -> OutputColumn {
        OutputColumn {
            sheet: self.sheet.clone(),
            fixed: self.fixed.next(),
        }
    }
}

/// Walks the document's identifier column, building aggregates for rows
/// whose output destination is still empty and remembering the rest as
/// not writable.
pub struct Loader<'g, G: DocumentGateway> {
    gateway: &'g G,
    cursor: CellPart,
    id_column: OutputColumn,
    name_column: OutputColumn,
    message_column: OutputColumn,
    result_column: Option<OutputColumn>,
    asserts_column: Option<OutputColumn>,
    not_writable: FxHashSet<String>,
}

impl<'g, G: DocumentGateway> Loader<'g, G> {
    /// All locations must be single cells; the walk starts at the
    /// first-identifier location's movable coordinate. The name column for
    /// appended rows sits immediately after the identifier column.
    pub fn new(
        gateway: &'g G,
        dimension: Dimension,
        first_id_location: &Location,
        first_message_location: &Location,
        result_location: Option<&Location>,
        asserts_location: Option<&Location>,
    ) -> Result<Self, RefError> {
        let cursor = first_id_location.single_cell()?.movable_part(dimension);
        let id_column = OutputColumn::from_location(first_id_location, dimension)?;
        let name_column = id_column.shifted();
        Ok(Loader {
            gateway,
            cursor,
            name_column,
            id_column,
            message_column: OutputColumn::from_location(first_message_location, dimension)?,
            result_column: result_location
                .map(|loc| OutputColumn::from_location(loc, dimension))
                .transpose()?,
            asserts_column: asserts_location
                .map(|loc| OutputColumn::from_location(loc, dimension))
                .transpose()?,
            not_writable: FxHashSet::default(),
        })
    }

    /// Walk `ids` in document order, one cursor step per position. Blank
    /// identifiers advance the cursor but create nothing; identifiers with
    /// an already-populated message cell are recorded as not writable so
    /// re-runs never clobber published output.
    pub fn load(&mut self, ids: &[String]) -> Result<TestMap, LoadError> {
        let mut map = TestMap::default();
        for id in ids {
            if !id.is_empty() {
                let message = self.message_column.at(&self.cursor)?;
                if self.gateway.read_one(&message)?.is_empty() {
                    map.insert(Test::new(
                        id.clone(),
                        None,
                        self.locations_at_cursor(message, false)?,
                        false,
                    ));
                } else {
                    tracing::debug!(test = %id, location = %message, "output already present, skipping");
                    self.not_writable.insert(id.clone());
                }
            }
            self.cursor = self.cursor.next();
        }
        tracing::info!(
            writable = map.len(),
            skipped = self.not_writable.len(),
            "existing tests loaded"
        );
        Ok(map)
    }

    /// Allocate an aggregate for an identifier the document does not have,
    /// at the first free position past the scanned range, then advance so
    /// the next unseen test gets the following slot.
    pub fn create(&mut self, id: impl Into<String>, name: Option<String>) -> Result<Test, RefError> {
        let message = self.message_column.at(&self.cursor)?;
        let locations = self.locations_at_cursor(message, true)?;
        let test = Test::new(id, name, locations, true);
        self.cursor = self.cursor.next();
        Ok(test)
    }

    /// Route one parsed item: drop it if its destination is not writable
    /// (or it has no identifier), append to a known aggregate, or create a
    /// fresh one. Evaluated per item, since items for one identifier may
    /// arrive interleaved with first sightings of others.
    pub fn reconcile(
        &mut self,
        map: &mut TestMap,
        item: Item,
    ) -> Result<ReconcileOutcome, RefError> {
        let Some(id) = item.test_id.clone() else {
            tracing::warn!("dropping trace item without a test identifier");
            return Ok(ReconcileOutcome::Skipped);
        };
        if self.not_writable.contains(&id) {
            tracing::debug!(test = %id, "dropping item for non-writable test");
            return Ok(ReconcileOutcome::Skipped);
        }
        let created = if map.contains(&id) {
            false
        } else {
            tracing::info!(test = %id, "found new test");
            let test = self.create(id.clone(), item.test_name.clone())?;
            map.insert(test);
            true
        };
        if let Some(test) = map.get_mut(&id) {
            test.append(item);
        }
        Ok(if created {
            ReconcileOutcome::Created
        } else {
            ReconcileOutcome::Appended
        })
    }

    fn locations_at_cursor(
        &self,
        first_message: Location,
        new_row: bool,
    ) -> Result<TestLocations, RefError> {
        Ok(TestLocations {
            id: new_row
                .then(|| self.id_column.at(&self.cursor))
                .transpose()?,
            name: new_row
                .then(|| self.name_column.at(&self.cursor))
                .transpose()?,
            first_message,
            result: self
                .result_column
                .as_ref()
                .map(|col| col.at(&self.cursor))
                .transpose()?,
            asserts: self
                .asserts_column
                .as_ref()
                .map(|col| col.at(&self.cursor))
                .transpose()?,
        })
    }
}
