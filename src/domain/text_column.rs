// ============================================================
// Layer 3 — TextColumn
// ============================================================
// A batch of strings laid out as N rows × 1 column. The embedder
// takes exactly this shape: one string per row, one column.

/// `[rows, 1]` column of strings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextColumn {
    rows: Vec<String>,
}

impl TextColumn {
    pub fn new(rows: Vec<String>) -> Self {
        Self { rows }
    }

    /// Always `[len, 1]`.
    pub fn shape(&self) -> [usize; 2] {
        [self.rows.len(), 1]
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Drop the singleton column dimension.
    pub fn squeeze(&self) -> &[String] {
        &self.rows
    }

    pub fn row(&self, index: usize) -> Option<&str> {
        self.rows.get(index).map(String::as_str)
    }

    /// Contiguous sub-column `[start, start + len)`, clamped to the column.
    pub fn slice(&self, start: usize, len: usize) -> TextColumn {
        let start = start.min(self.rows.len());
        let end = (start + len).min(self.rows.len());
        TextColumn::new(self.rows[start..end].to_vec())
    }
}

impl FromIterator<String> for TextColumn {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        TextColumn::new(iter.into_iter().collect())
    }
}
