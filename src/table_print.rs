use crate::cell::Cell;
use crate::merge::PeriodTable;
use crate::table::{render_cell, WideTable};

const EMPTY_CELL: &str = "·";

/// Print a table as an aligned grid
pub fn print_table(table: &WideTable) {
    print!("{}", render_table(table, ""));
}

/// Print one grid per period, headed by the period name
pub fn print_period_tables(tables: &[PeriodTable]) {
    for (i, period) in tables.iter().enumerate() {
        println!("{}", period.period);
        print!("{}", render_table(&period.table, "  "));
        if i < tables.len() - 1 {
            println!();
        }
    }
}

fn cell_text(column: &str, cell: &Cell) -> String {
    match cell {
        Cell::Null => EMPTY_CELL.to_string(), // middle dot for absent periods
        other => render_cell(column, other),
    }
}

/// Render header, rule and rows. Numbers are right aligned, text left aligned.
pub fn render_table(table: &WideTable, indent: &str) -> String {
    let header = table.columns();
    let body: Vec<Vec<String>> = table
        .rows()
        .iter()
        .map(|row| header.iter().zip(row).map(|(column, cell)| cell_text(column, cell)).collect())
        .collect();

    let widths: Vec<usize> = (0..header.len())
        .map(|col| {
            body.iter()
                .map(|row| row[col].chars().count())
                .chain(std::iter::once(header[col].chars().count()))
                .max()
                .unwrap_or(1)
        })
        .collect();

    let mut out = String::new();
    push_line(&mut out, indent, header.iter().map(|s| s.as_str()), &widths, |_| false);

    out.push_str(indent);
    for (col, width) in widths.iter().enumerate() {
        out.push_str(&"─".repeat(*width));
        if col < widths.len() - 1 {
            out.push_str("─┼─");
        }
    }
    out.push('\n');

    for (row, cells) in table.rows().iter().zip(body.iter()) {
        push_line(&mut out, indent, cells.iter().map(|s| s.as_str()), &widths, |col| {
            matches!(row[col], Cell::Int(_) | Cell::Float(_))
        });
    }
    out
}

fn push_line<'a>(
    out: &mut String,
    indent: &str,
    cells: impl Iterator<Item = &'a str>,
    widths: &[usize],
    right_align: impl Fn(usize) -> bool,
) {
    out.push_str(indent);
    for (col, text) in cells.enumerate() {
        let pad = widths[col].saturating_sub(text.chars().count());
        if right_align(col) {
            out.push_str(&" ".repeat(pad));
            out.push_str(text);
        } else {
            out.push_str(text);
            // no trailing spaces on the last column
            if col < widths.len() - 1 {
                out.push_str(&" ".repeat(pad));
            }
        }
        if col < widths.len() - 1 {
            out.push_str(" │ ");
        }
    }
    out.push('\n');
}
