// ============================================================
// TABULAR LOADER
// ============================================================
// Decoded rows -> header + header-aligned raw rows

use tracing::{debug, warn};

use crate::domain::error::{AppError, Result};
use crate::domain::{Header, HeaderCollisionPolicy, HeaderLayout, RawCell, RawDocument, RawRow};
use crate::infrastructure::tabular::{decode, DecodedTable, SourceDocument};

pub struct TabularLoader {
    collisions: HeaderCollisionPolicy,
}

impl TabularLoader {
    pub fn new(collisions: HeaderCollisionPolicy) -> Self {
        Self { collisions }
    }

    /// Decode and shape a document. Pure over the already-read bytes.
    pub fn load(&self, source: &SourceDocument) -> Result<RawDocument> {
        let table = decode(source)?;
        let document = self.from_table(table)?;

        debug!(
            source = %source.name,
            rows = document.rows.len(),
            columns = document.header.len(),
            "Document loaded"
        );
        Ok(document)
    }

    pub fn from_table(&self, table: DecodedTable) -> Result<RawDocument> {
        match table {
            DecodedTable::Grid(rows) => self.from_grid(rows),
            DecodedTable::Keyed { keys, rows } => self.from_keyed(keys, rows),
        }
    }

    fn from_grid(&self, rows: Vec<Vec<RawCell>>) -> Result<RawDocument> {
        let mut rows = rows
            .into_iter()
            .map(RawRow)
            .filter(|row| !row.is_blank());

        let header_row = rows.next().ok_or(AppError::EmptyDocument)?;
        let layout = Header::from_cells(header_row.cells(), self.collisions);

        Ok(align_rows(layout, rows))
    }

    fn from_keyed(&self, keys: Vec<String>, rows: Vec<Vec<RawCell>>) -> Result<RawDocument> {
        let rows: Vec<RawRow> = rows
            .into_iter()
            .map(RawRow)
            .filter(|row| !row.is_blank())
            .collect();

        if rows.is_empty() || keys.is_empty() {
            return Err(AppError::EmptyDocument);
        }

        let labels: Vec<Option<String>> = keys
            .into_iter()
            .map(|key| Some(key).filter(|key| !key.trim().is_empty()))
            .collect();
        let layout = Header::from_labels(&labels, self.collisions);

        Ok(align_rows(layout, rows.into_iter()))
    }
}

impl Default for TabularLoader {
    fn default() -> Self {
        Self::new(HeaderCollisionPolicy::Suffix)
    }
}

/// Pad short rows, drop cells past the header, and route each source
/// column to its header slot
fn align_rows(layout: HeaderLayout, rows: impl Iterator<Item = RawRow>) -> RawDocument {
    let HeaderLayout { header, targets } = layout;
    let width = header.len();

    let rows = rows
        .enumerate()
        .map(|(index, row)| {
            let mut cells = row.0;
            if cells.len() > targets.len() {
                let extra = cells.len() - targets.len();
                if cells[targets.len()..].iter().any(|cell| !cell.is_blank()) {
                    warn!(row = index, dropped = extra, "Row is wider than the header, extra cells dropped");
                }
                cells.truncate(targets.len());
            }

            let mut aligned = vec![RawCell::Blank; width];
            // Later columns win when several map to one slot
            for (column, cell) in cells.into_iter().enumerate() {
                aligned[targets[column]] = cell;
            }
            RawRow(aligned)
        })
        .collect();

    RawDocument { header, rows }
}
