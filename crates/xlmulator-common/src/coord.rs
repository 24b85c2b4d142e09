//! Cell coordinates for macro sheets.
//!
//! `CellCoord` is a 1-based (row, column) pair with Excel's grid limits:
//! 1,048,576 rows × 16,384 columns. Ordering is row-major, so a sorted
//! collection of coordinates iterates row by row, then column by column.
//! That ordering is what makes evaluation passes reproducible.
//!
//! The canonical textual form is the R1C1-style label `$R<row>$C<col>`,
//! used both when a destination reference is passed to a function as a
//! string and as the line prefix of the formula dump.

use core::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

pub const ROW_MAX: u32 = 1 << 20;
pub const COL_MAX: u32 = 1 << 14;

/// Absolute 1-based grid coordinate.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellCoord {
    pub row: u32,
    pub col: u32,
}

impl CellCoord {
    /// Construct a coordinate, returning `None` outside the supported grid.
    pub fn new(row: u32, col: u32) -> Option<Self> {
        if row == 0 || col == 0 || row > ROW_MAX || col > COL_MAX {
            return None;
        }
        Some(Self { row, col })
    }

    /// Shift by signed offsets. Results that leave the grid yield `None`.
    pub fn offset(self, d_row: i64, d_col: i64) -> Option<Self> {
        let row = i64::from(self.row) + d_row;
        let col = i64::from(self.col) + d_col;
        let row = u32::try_from(row).ok()?;
        let col = u32::try_from(col).ok()?;
        Self::new(row, col)
    }

    /// The `$R<row>$C<col>` label.
    pub fn label(self) -> String {
        self.to_string()
    }

    /// Parse an R1C1-style absolute label: `$R12$C3`, `R12C3` or `r12c3`.
    pub fn parse_label(s: &str) -> Option<Self> {
        let s = s.trim().to_ascii_uppercase().replace('$', "");
        let rest = s.strip_prefix('R')?;
        let c_pos = rest.find('C')?;
        let (row_str, col_str) = (&rest[..c_pos], &rest[c_pos + 1..]);
        if row_str.is_empty() || col_str.is_empty() {
            return None;
        }
        if !row_str.bytes().all(|b| b.is_ascii_digit()) || !col_str.bytes().all(|b| b.is_ascii_digit())
        {
            return None;
        }
        let row = row_str.parse::<u32>().ok()?;
        let col = col_str.parse::<u32>().ok()?;
        Self::new(row, col)
    }

    /// Parse an A1-style cell id (`HO1`, `$EC$210`, `a$3`).
    pub fn from_a1(a1: &str) -> Option<Self> {
        let s = a1.trim().replace('$', "");
        let split = s.find(|c: char| c.is_ascii_digit())?;
        let (letters, digits) = s.split_at(split);
        if !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let col = column_index(letters)?;
        let row = digits.parse::<u32>().ok()?;
        Self::new(row, col)
    }

    /// A1-style rendering (`A1`, `HO1`).
    pub fn to_a1(self) -> String {
        format!("{}{}", column_letters(self.col), self.row)
    }
}

impl fmt::Display for CellCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "$R{}$C{}", self.row, self.col)
    }
}

/// Convert spreadsheet column letters to a 1-based index (`A` = 1, `AA` = 27).
pub fn column_index(letters: &str) -> Option<u32> {
    if letters.is_empty() || letters.len() > 3 {
        return None;
    }
    let mut col = 0u32;
    for ch in letters.chars() {
        if !ch.is_ascii_alphabetic() {
            return None;
        }
        col = col * 26 + (ch.to_ascii_uppercase() as u32 - 'A' as u32 + 1);
    }
    if col > COL_MAX { None } else { Some(col) }
}

/// Inverse of [`column_index`].
pub fn column_letters(mut col: u32) -> String {
    let mut out = Vec::new();
    while col > 0 {
        let rem = (col - 1) % 26;
        out.push(b'A' + rem as u8);
        col = (col - 1) / 26;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}
