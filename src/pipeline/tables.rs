//! Table detection and formatting.
//!
//! A table is a run of consecutive lines whose text is split into spans by
//! wide horizontal gaps, with the spans of every row starting at the same
//! few x positions. Those positions become the columns; the run is rendered
//! as a GFM pipe table with the first row as header.

use super::layout::TextLine;

/// Span left edges within this many font sizes of a column belong to it.
const COLUMN_TOLERANCE_EM: f32 = 1.5;
/// Prose laid out in two columns is not a table; tables hold short cells.
const MAX_CELL_CHARS: usize = 40;

/// Cluster the span left edges of `rows` into column positions, left to right.
fn column_positions(rows: &[&TextLine], tolerance: f32) -> Vec<f32> {
    let mut lefts: Vec<f32> = rows
        .iter()
        .flat_map(|row| row.spans.iter().map(|s| s.left))
        .collect();
    lefts.sort_by(|a, b| a.total_cmp(b));

    let mut columns = Vec::new();
    let mut cluster: Vec<f32> = Vec::new();
    for x in lefts {
        if let Some(center) = mean(&cluster) {
            if x - center > tolerance {
                columns.push(center);
                cluster.clear();
            }
        }
        cluster.push(x);
    }
    if let Some(center) = mean(&cluster) {
        columns.push(center);
    }
    columns
}

fn mean(values: &[f32]) -> Option<f32> {
    (!values.is_empty()).then(|| values.iter().sum::<f32>() / values.len() as f32)
}

fn column_index(columns: &[f32], x: f32, tolerance: f32) -> Option<usize> {
    columns
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| (x - **a).abs().total_cmp(&(x - **b).abs()))
        .filter(|(_, col)| (x - **col).abs() <= tolerance)
        .map(|(idx, _)| idx)
}

/// Lay `rows` out as a grid of cells, or `None` when they do not line up
/// as a table.
///
/// Every row needs at least two spans, each landing in its own column, and
/// every column must be filled in at least half of the rows.
pub fn detect_table(rows: &[&TextLine]) -> Option<Vec<Vec<String>>> {
    if rows.len() < 2 || rows.iter().any(|r| r.spans.len() < 2) {
        return None;
    }
    let size = rows
        .iter()
        .map(|r| r.font_size)
        .fold(0.0_f32, f32::max)
        .max(4.0);
    let tolerance = size * COLUMN_TOLERANCE_EM;

    let columns = column_positions(rows, tolerance);
    if columns.len() < 2 {
        return None;
    }

    let mut cells = Vec::with_capacity(rows.len());
    let mut filled = vec![0usize; columns.len()];
    for row in rows {
        let mut cells_row = vec![String::new(); columns.len()];
        for span in &row.spans {
            let col = column_index(&columns, span.left, tolerance)?;
            if !cells_row[col].is_empty() {
                return None;
            }
            cells_row[col] = span.text.trim().to_string();
            filled[col] += 1;
        }
        cells.push(cells_row);
    }

    if filled.iter().any(|&n| n * 2 < rows.len()) {
        return None;
    }

    let cell_count = cells.iter().flatten().filter(|c| !c.is_empty()).count();
    let long = cells
        .iter()
        .flatten()
        .filter(|c| c.chars().count() > MAX_CELL_CHARS)
        .count();
    if long * 2 > cell_count {
        return None;
    }

    Some(cells)
}

/// Render cells as a pipe table, columns padded to a common width.
pub fn table_to_markdown(cells: &[Vec<String>]) -> String {
    let Some(header) = cells.first() else {
        return String::new();
    };
    let escaped: Vec<Vec<String>> = cells
        .iter()
        .map(|row| row.iter().map(|c| c.replace('|', "\\|")).collect())
        .collect();

    let widths: Vec<usize> = (0..header.len())
        .map(|col| {
            escaped
                .iter()
                .map(|row| row.get(col).map_or(0, |c| c.chars().count()))
                .max()
                .unwrap_or(0)
                .max(3)
        })
        .collect();

    let mut lines = Vec::with_capacity(escaped.len() + 1);
    for (idx, row) in escaped.iter().enumerate() {
        let mut line = String::from("|");
        for (cell, width) in row.iter().zip(&widths) {
            line.push_str(&format!(" {cell:width$} |"));
        }
        lines.push(line);

        if idx == 0 {
            let mut sep = String::from("|");
            for width in &widths {
                sep.push_str(&format!(" {} |", "-".repeat(*width)));
            }
            lines.push(sep);
        }
    }
    lines.join("\n")
}
