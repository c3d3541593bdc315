//! Spreadsheet reference arithmetic: columns as base-26 letter numerals,
//! cells as (column, row) pairs, locations as optionally sheet-qualified
//! cells or ranges.
//!
//! Column letters form a base-26 numeral with no zero digit (`A`=1 ...
//! `Z`=26, `AA`=27). Increment/decrement is carried out directly on the
//! letter sequence so the arithmetic has no upper bound; the only bounded
//! values are the scan limits used when extending a cell into a range.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Last row probed when extending a cell into an identifier-scan range.
pub const SCAN_LAST_ROW: u32 = 1001;
/// Last column probed when extending a cell into an identifier-scan range.
pub const SCAN_LAST_COLUMN: &str = "AC";

const SHEET_DELIMITER: char = '!';
const RANGE_DELIMITER: char = ':';

/// The `InvalidReference` error kind: malformed or out-of-domain cell,
/// location, or dimension input. Unrecoverable within a run.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum RefError {
    #[error("empty reference")]
    Empty,
    #[error("could not parse cell `{0}`")]
    BadCell(String),
    #[error("column letters must be uppercase A-Z, got `{0}`")]
    BadColumn(String),
    #[error("could not parse location `{0}`")]
    BadLocation(String),
    #[error("row index must be 1 or greater")]
    ZeroRow,
    #[error("no column before A")]
    ColumnUnderflow,
    #[error("no row before 1")]
    RowUnderflow,
    #[error("expected a single cell, got range `{0}`")]
    NotSingleCell(String),
    #[error("mismatched cell parts: expected one column and one row")]
    MismatchedParts,
}

/// Axis along which a directional operation advances.
///
/// `Rows` walks down (the row varies, the column stays fixed); `Columns`
/// walks right (the column varies, the row stays fixed). Always passed by
/// value and compared structurally.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Dimension {
    Rows,
    Columns,
}

impl Dimension {
    /// The other axis.
    pub fn opposite(self) -> Self {
        match self {
            Dimension::Rows => Dimension::Columns,
            Dimension::Columns => Dimension::Rows,
        }
    }
}

/// A column letter sequence in canonical uppercase form.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct Column(String);

impl Column {
    /// Validate and wrap a letter sequence. Rejects empty input and any
    /// character outside `A`-`Z`.
    pub fn new(letters: &str) -> Result<Self, RefError> {
        if letters.is_empty() {
            return Err(RefError::Empty);
        }
        if !letters.bytes().all(|b| b.is_ascii_uppercase()) {
            return Err(RefError::BadColumn(letters.to_string()));
        }
        Ok(Column(letters.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The next column to the right, with base-26 carry: `Z` wraps to `A`
    /// carrying into the next-more-significant letter, and an all-`Z`
    /// sequence grows by one letter (`Z` -> `AA`, `ZZ` -> `AAA`).
    pub fn next(&self) -> Column {
        let mut letters: Vec<u8> = self.0.bytes().collect();
        let mut carry = true;
        for b in letters.iter_mut().rev() {
            if !carry {
                break;
            }
            if *b == b'Z' {
                *b = b'A';
            } else {
                *b += 1;
                carry = false;
            }
        }
        if carry {
            letters.insert(0, b'A');
        }
        // Bytes stay within A-Z by construction.
        Column(String::from_utf8(letters).unwrap_or_default())
    }

    /// The previous column, inverse of [`Column::next`]. Fails when asked
    /// to go before `A`.
    pub fn previous(&self) -> Result<Column, RefError> {
        let mut letters: Vec<u8> = self.0.bytes().collect();
        let mut borrow = true;
        for b in letters.iter_mut().rev() {
            if !borrow {
                break;
            }
            if *b == b'A' {
                *b = b'Z';
            } else {
                *b -= 1;
                borrow = false;
            }
        }
        if borrow {
            // The sequence was all `A`s: one letter shorter, all `Z`s.
            letters.remove(0);
            if letters.is_empty() {
                return Err(RefError::ColumnUnderflow);
            }
        }
        Ok(Column(String::from_utf8(letters).unwrap_or_default()))
    }

    /// 1-based numeric value of the letter sequence (`A`=1, `AA`=27).
    pub fn index(&self) -> u64 {
        self.0
            .bytes()
            .fold(0u64, |acc, b| acc * 26 + u64::from(b - b'A') + 1)
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Column {
    type Err = RefError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Column::new(s)
    }
}

impl PartialOrd for Column {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Column {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // Shorter sequences are always numerically smaller; same-length
        // sequences compare lexicographically.
        (self.0.len(), &self.0).cmp(&(other.0.len(), &other.0))
    }
}

/// One coordinate of a cell, relative to a walk dimension: the column that
/// stays fixed while walking rows, or the row that stays fixed while
/// walking columns (and vice versa for the movable coordinate).
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub enum CellPart {
    Column(Column),
    Row(u32),
}

impl CellPart {
    /// Advance this part by one step along its own axis.
    pub fn next(&self) -> CellPart {
        match self {
            CellPart::Column(c) => CellPart::Column(c.next()),
            CellPart::Row(r) => CellPart::Row(r + 1),
        }
    }
}

/// A single cell: column letters plus a 1-based row.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct Cell {
    column: Column,
    row: u32,
}

impl Cell {
    pub fn new(column: Column, row: u32) -> Result<Self, RefError> {
        if row == 0 {
            return Err(RefError::ZeroRow);
        }
        Ok(Cell { column, row })
    }

    pub fn column(&self) -> &Column {
        &self.column
    }

    pub fn row(&self) -> u32 {
        self.row
    }

    /// The adjacent cell along `dimension`: one row down for `Rows`, one
    /// column right for `Columns`.
    pub fn next(&self, dimension: Dimension) -> Cell {
        match dimension {
            Dimension::Rows => Cell {
                column: self.column.clone(),
                row: self.row + 1,
            },
            Dimension::Columns => Cell {
                column: self.column.next(),
                row: self.row,
            },
        }
    }

    /// The adjacent cell against `dimension`. Fails before column `A` or
    /// row 1.
    pub fn previous(&self, dimension: Dimension) -> Result<Cell, RefError> {
        match dimension {
            Dimension::Rows => {
                if self.row == 1 {
                    return Err(RefError::RowUnderflow);
                }
                Ok(Cell {
                    column: self.column.clone(),
                    row: self.row - 1,
                })
            }
            Dimension::Columns => Ok(Cell {
                column: self.column.previous()?,
                row: self.row,
            }),
        }
    }

    /// The coordinate that stays constant while walking along `dimension`.
    pub fn fixed_part(&self, dimension: Dimension) -> CellPart {
        match dimension {
            Dimension::Rows => CellPart::Column(self.column.clone()),
            Dimension::Columns => CellPart::Row(self.row),
        }
    }

    /// The coordinate that advances while walking along `dimension`.
    pub fn movable_part(&self, dimension: Dimension) -> CellPart {
        match dimension {
            Dimension::Rows => CellPart::Row(self.row),
            Dimension::Columns => CellPart::Column(self.column.clone()),
        }
    }

    /// Recompose a cell from one column part and one row part, in either
    /// order. Fails when handed two parts of the same kind.
    pub fn from_parts(a: &CellPart, b: &CellPart) -> Result<Cell, RefError> {
        match (a, b) {
            (CellPart::Column(c), CellPart::Row(r)) | (CellPart::Row(r), CellPart::Column(c)) => {
                Cell::new(c.clone(), *r)
            }
            _ => Err(RefError::MismatchedParts),
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.column, self.row)
    }
}

impl FromStr for Cell {
    type Err = RefError;

    /// Parses letters-then-digits. Fails on an empty letter part, a missing
    /// or zero row, or trailing garbage.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(RefError::Empty);
        }
        let split = s.find(|ch: char| ch.is_ascii_digit()).unwrap_or(s.len());
        let (letters, digits) = s.split_at(split);
        if letters.is_empty() || digits.is_empty() {
            return Err(RefError::BadCell(s.to_string()));
        }
        let column = Column::new(letters).map_err(|_| RefError::BadCell(s.to_string()))?;
        let row: u32 = digits.parse().map_err(|_| RefError::BadCell(s.to_string()))?;
        if row == 0 {
            return Err(RefError::ZeroRow);
        }
        Cell::new(column, row)
    }
}

/// The cell or cell-range part of a location.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub enum Span {
    Cell(Cell),
    Range(Cell, Cell),
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Span::Cell(c) => c.fmt(f),
            Span::Range(start, end) => write!(f, "{start}{RANGE_DELIMITER}{end}"),
        }
    }
}

/// An optionally sheet-qualified cell or cell range, e.g. `C10`,
/// `Sheet1!C10`, or `Sheet1!A2:A1001`. A bare cell (no sheet) is valid and
/// distinct from a sheet-qualified one.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct Location {
    sheet: Option<String>,
    span: Span,
}

impl Location {
    pub fn new(sheet: Option<String>, span: Span) -> Location {
        Location { sheet, span }
    }

    pub fn cell(sheet: Option<String>, cell: Cell) -> Location {
        Location {
            sheet,
            span: Span::Cell(cell),
        }
    }

    pub fn sheet(&self) -> Option<&str> {
        self.sheet.as_deref()
    }

    pub fn span(&self) -> &Span {
        &self.span
    }

    /// The single cell this location names. Rejects ranges, for callers
    /// that require exactly one destination.
    pub fn single_cell(&self) -> Result<&Cell, RefError> {
        match &self.span {
            Span::Cell(c) => Ok(c),
            Span::Range(..) => Err(RefError::NotSingleCell(self.to_string())),
        }
    }

    /// The first cell of the location, whether cell or range.
    pub fn start(&self) -> &Cell {
        match &self.span {
            Span::Cell(c) => c,
            Span::Range(start, _) => start,
        }
    }

    /// Same sheet, different cell.
    pub fn with_cell(&self, cell: Cell) -> Location {
        Location::cell(self.sheet.clone(), cell)
    }

    /// Grow a single-cell location into the range scanned for existing
    /// identifiers: down to [`SCAN_LAST_ROW`] along `Rows`, right to
    /// [`SCAN_LAST_COLUMN`] along `Columns`. Bounds the scan only; the
    /// coordinate arithmetic itself is unbounded.
    pub fn extend_to_range(&self, dimension: Dimension) -> Result<Location, RefError> {
        let start = self.single_cell()?.clone();
        let end = match dimension {
            Dimension::Rows => Cell::new(start.column().clone(), SCAN_LAST_ROW)?,
            Dimension::Columns => Cell::new(Column::new(SCAN_LAST_COLUMN)?, start.row())?,
        };
        Ok(Location {
            sheet: self.sheet.clone(),
            span: Span::Range(start, end),
        })
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(sheet) = &self.sheet {
            write!(f, "{sheet}{SHEET_DELIMITER}")?;
        }
        self.span.fmt(f)
    }
}

impl FromStr for Location {
    type Err = RefError;

    /// Splits on the sheet delimiter if present; its absence means "no
    /// sheet", not an error.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(RefError::Empty);
        }
        let (sheet, rest) = match s.split_once(SHEET_DELIMITER) {
            Some((sheet, rest)) => {
                if sheet.is_empty() {
                    return Err(RefError::BadLocation(s.to_string()));
                }
                (Some(sheet.to_string()), rest)
            }
            None => (None, s),
        };
        let span = match rest.split_once(RANGE_DELIMITER) {
            Some((first, last)) => Span::Range(first.parse()?, last.parse()?),
            None => Span::Cell(rest.parse()?),
        };
        Ok(Location { sheet, span })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cell(s: &str) -> Cell {
        s.parse().unwrap()
    }

    #[test]
    fn cell_parse_roundtrip() {
        for (input, col, row) in [
            ("A3", "A", 3),
            ("F9", "F", 9),
            ("C1", "C", 1),
            ("AD3", "AD", 3),
            ("A3090", "A", 3090),
        ] {
            let c = cell(input);
            assert_eq!(c.column().as_str(), col);
            assert_eq!(c.row(), row);
            assert_eq!(c.to_string(), input);
        }
    }

    #[test]
    fn cell_parse_rejects_malformed() {
        for input in ["3", "AA", "", "F0", "A-1", "1A", "A1B"] {
            assert!(input.parse::<Cell>().is_err(), "accepted {input:?}");
        }
    }

    #[test]
    fn column_next_carries() {
        for (from, to) in [
            ("A", "B"),
            ("Z", "AA"),
            ("AA", "AB"),
            ("AZ", "BA"),
            ("ZZ", "AAA"),
            ("ZZZZZZ", "AAAAAAA"),
        ] {
            assert_eq!(Column::new(from).unwrap().next().as_str(), to);
        }
    }

    #[test]
    fn column_previous_inverts_next() {
        for letters in ["A", "B", "Z", "AA", "AZ", "BA", "ZZ", "AAA"] {
            let col = Column::new(letters).unwrap();
            assert_eq!(col.next().previous().unwrap(), col);
        }
        assert_eq!(
            Column::new("A").unwrap().previous(),
            Err(RefError::ColumnUnderflow)
        );
        assert_eq!(Column::new("AA").unwrap().previous().unwrap().as_str(), "Z");
    }

    #[test]
    fn column_ordering_is_numeric() {
        let b = Column::new("B").unwrap();
        let aa = Column::new("AA").unwrap();
        assert!(b < aa);
        assert_eq!(b.index(), 2);
        assert_eq!(aa.index(), 27);
    }

    #[test]
    fn next_cell_along_both_axes() {
        assert_eq!(cell("A3").next(Dimension::Rows), cell("A4"));
        assert_eq!(cell("A3").next(Dimension::Columns), cell("B3"));
        assert_eq!(cell("AA3").next(Dimension::Columns), cell("AB3"));
    }

    #[test]
    fn previous_cell_underflows() {
        assert_eq!(cell("A2").previous(Dimension::Rows).unwrap(), cell("A1"));
        assert_eq!(
            cell("A1").previous(Dimension::Rows),
            Err(RefError::RowUnderflow)
        );
        assert_eq!(
            cell("A1").previous(Dimension::Columns),
            Err(RefError::ColumnUnderflow)
        );
    }

    #[test]
    fn cell_parts_decompose_and_recompose() {
        let c = cell("D7");
        assert_eq!(
            c.fixed_part(Dimension::Rows),
            CellPart::Column(Column::new("D").unwrap())
        );
        assert_eq!(c.movable_part(Dimension::Rows), CellPart::Row(7));
        assert_eq!(c.fixed_part(Dimension::Columns), CellPart::Row(7));

        let fixed = c.fixed_part(Dimension::Rows);
        let movable = c.movable_part(Dimension::Rows).next();
        assert_eq!(Cell::from_parts(&fixed, &movable).unwrap(), cell("D8"));
        assert_eq!(
            Cell::from_parts(&fixed, &c.fixed_part(Dimension::Rows)),
            Err(RefError::MismatchedParts)
        );
    }

    #[test]
    fn location_parse_with_and_without_sheet() {
        let loc: Location = "Sheet1!C10".parse().unwrap();
        assert_eq!(loc.sheet(), Some("Sheet1"));
        assert_eq!(loc.single_cell().unwrap(), &cell("C10"));
        assert_eq!(loc.to_string(), "Sheet1!C10");

        let bare: Location = "C10".parse().unwrap();
        assert_eq!(bare.sheet(), None);
        assert_eq!(bare.to_string(), "C10");
        assert_ne!(loc, bare);
    }

    #[test]
    fn location_parse_range() {
        let loc: Location = "Sheet1!A2:A1001".parse().unwrap();
        assert!(matches!(loc.span(), Span::Range(..)));
        assert!(loc.single_cell().is_err());
        assert_eq!(loc.start(), &cell("A2"));
    }

    #[test]
    fn location_rejects_malformed() {
        for input in ["", "!C10", "Sheet1!", "Sheet1!:A1", "Sheet1!A0"] {
            assert!(input.parse::<Location>().is_err(), "accepted {input:?}");
        }
    }

    #[test]
    fn extend_to_scan_range() {
        let loc: Location = "Sheet1!A2".parse().unwrap();
        assert_eq!(
            loc.extend_to_range(Dimension::Rows).unwrap().to_string(),
            "Sheet1!A2:A1001"
        );
        assert_eq!(
            loc.extend_to_range(Dimension::Columns).unwrap().to_string(),
            "Sheet1!A2:AC2"
        );
        let range: Location = "A1:B2".parse().unwrap();
        assert!(range.extend_to_range(Dimension::Rows).is_err());
    }

    #[test]
    fn dimension_opposite() {
        assert_eq!(Dimension::Rows.opposite(), Dimension::Columns);
        assert_eq!(Dimension::Columns.opposite(), Dimension::Rows);
    }
}
