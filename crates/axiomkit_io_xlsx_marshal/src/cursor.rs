//! Zero-based grid cursor and A1-style address codec.

use std::fmt;

use crate::spec::EnumAxis;

/// Zero-based `(row, col)` grid position relative to a sheet origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Cursor {
    /// Zero-based row.
    pub row: usize,
    /// Zero-based column.
    pub col: usize,
}

impl Cursor {
    /// Create cursor at `(row, col)`.
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }

    /// Move to `(row, col)`.
    pub fn set(&mut self, row: usize, col: usize) {
        self.row = row;
        self.col = col;
    }

    pub fn set_row(&mut self, row: usize) {
        self.row = row;
    }

    pub fn set_col(&mut self, col: usize) {
        self.col = col;
    }

    pub fn inc_row(&mut self, delta: usize) {
        self.row += delta;
    }

    pub fn inc_col(&mut self, delta: usize) {
        self.col += delta;
    }

    /// Advance along `axis` by `delta`.
    pub fn inc(&mut self, delta: usize, axis: EnumAxis) {
        match axis {
            EnumAxis::Row => self.inc_row(delta),
            EnumAxis::Column => self.inc_col(delta),
        }
    }

    /// Copy advanced along `axis` by `delta`.
    pub fn shifted(self, delta: usize, axis: EnumAxis) -> Self {
        let mut cursor = self;
        cursor.inc(delta, axis);
        cursor
    }

    /// Component along `axis`.
    pub fn get(&self, axis: EnumAxis) -> usize {
        match axis {
            EnumAxis::Row => self.row,
            EnumAxis::Column => self.col,
        }
    }

    /// Component-wise distance from `origin` (saturating at zero).
    pub fn diff(&self, origin: &Cursor) -> Cursor {
        Cursor {
            row: self.row.saturating_sub(origin.row),
            col: self.col.saturating_sub(origin.col),
        }
    }

    /// A1-style address, e.g. `(0, 27)` -> `AB1`.
    pub fn to_address(&self) -> String {
        format!("{}{}", self.column_letters(), self.row + 1)
    }

    /// Column letters of this cursor.
    pub fn column_letters(&self) -> String {
        encode_column_letters(self.col)
    }

    /// Parse an A1-style address; `None` on malformed text or row zero.
    pub fn from_address(address: &str) -> Option<Cursor> {
        let c_address = address.trim();
        let n_idx_digit = c_address.find(|c: char| c.is_ascii_digit())?;
        let (c_letters, c_digits) = c_address.split_at(n_idx_digit);
        let n_row = c_digits.parse::<usize>().ok()?.checked_sub(1)?;
        Some(Cursor::new(n_row, decode_column_letters(c_letters)?))
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_address())
    }
}

/// Render zero-based column index as bijective base-26 letters.
pub fn encode_column_letters(col: usize) -> String {
    let mut l_chars = Vec::new();
    let mut n_rest = col + 1;
    while n_rest > 0 {
        let n_digit = (n_rest - 1) % 26;
        l_chars.push(char::from(b'A' + n_digit as u8));
        n_rest = (n_rest - 1) / 26;
    }
    l_chars.iter().rev().collect()
}

/// Parse bijective base-26 letters back to a zero-based column index.
pub fn decode_column_letters(letters: &str) -> Option<usize> {
    if letters.is_empty() {
        return None;
    }
    let mut n_value = 0usize;
    for c in letters.chars() {
        if !c.is_ascii_alphabetic() {
            return None;
        }
        let n_digit = (c.to_ascii_uppercase() as u8 - b'A') as usize + 1;
        n_value = n_value.checked_mul(26)?.checked_add(n_digit)?;
    }
    Some(n_value - 1)
}
