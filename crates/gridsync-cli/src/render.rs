use std::fmt::Write as _;

use colored::Colorize;
use gridsync_client::{CellMap, Coordinate, GridBounds, SyncStats};

/// Terminal columns per cell for a given cell pixel size.
pub fn cell_columns(cell_size: u32) -> usize {
    (cell_size as usize / 25).clamp(1, 8)
}

/// Paint `cells` row by row as truecolor blocks. Cells missing from the
/// snapshot are left blank.
pub fn paint_grid(cells: &CellMap, bounds: GridBounds, columns: usize) -> String {
    let blank = " ".repeat(columns);
    let mut out = String::with_capacity(bounds.cell_count() * (columns + 20));
    for y in 0..bounds.height {
        for x in 0..bounds.width {
            match cells.get(&Coordinate::new(x, y)) {
                Some(cell) => {
                    let _ = write!(out, "{}", blank.on_truecolor(cell.r, cell.g, cell.b));
                }
                None => out.push_str(&blank),
            }
        }
        out.push('\n');
    }
    out
}

pub fn stats_panel(stats: &SyncStats) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} {}", "CONFLICTS :".bold(), stats.conflicts);
    let _ = writeln!(out, "{} {}", "HASH :".bold(), stats.digest.cyan());
    let _ = writeln!(out, "{} {}", "TOT CB :".bold(), stats.total_confirmations);
    let _ = writeln!(out, "{} {:.1}", "CB/s :".bold(), stats.confirmations_per_sec);
    let _ = writeln!(out, "{} {:.1}", "SPS :".bold(), stats.sends_per_sec);
    let _ = writeln!(out, "{} {}", "CHANGES :".bold(), stats.changes);
    out
}

/// Title line: kept channel, object id and phase.
pub fn title(label: &str, object_id: &str, stats: &SyncStats) -> String {
    let label = if label.is_empty() { "view" } else { label };
    format!("{} - {} [{}]", label.yellow().bold(), object_id, stats.phase)
}
