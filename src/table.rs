use crate::{cell::Cell, period::columns, PerfError};
use serde_json::{Map, Value};
use std::io::Write;

/// Rows of cells under named columns; the shape every query result takes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WideTable {
    columns: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl WideTable {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Cell>>) -> Self {
        Self { columns, rows }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub(crate) fn rows_mut(&mut self) -> &mut Vec<Vec<Cell>> {
        &mut self.rows
    }

    pub fn into_parts(self) -> (Vec<String>, Vec<Vec<Cell>>) {
        (self.columns, self.rows)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn position(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }

    pub fn get(&self, row: usize, column: &str) -> Option<&Cell> {
        let position = self.position(column)?;
        self.rows.get(row).map(|r| &r[position])
    }

    /// The row of one employee, by canonical identifier.
    pub fn row_for(&self, identifier: &str) -> Option<&[Cell]> {
        let position = self.position(columns::ECODE)?;
        self.rows
            .iter()
            .find(|row| row[position].to_string() == identifier)
            .map(|row| row.as_slice())
    }

    /// Header row then one record per row; nulls become empty fields.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<(), PerfError> {
        let mut out = csv::Writer::from_writer(writer);
        out.write_record(&self.columns)?;
        for row in &self.rows {
            out.write_record(self.columns.iter().zip(row).map(|(column, cell)| render_cell(column, cell)))?;
        }
        out.flush()?;
        Ok(())
    }

    /// One JSON object per row, keys in column order.
    pub fn to_json(&self) -> Value {
        Value::Array(
            self.rows
                .iter()
                .map(|row| {
                    let record: Map<String, Value> = self
                        .columns
                        .iter()
                        .zip(row)
                        .map(|(column, cell)| (column.clone(), cell_json(cell)))
                        .collect();
                    Value::Object(record)
                })
                .collect(),
        )
    }
}

/// Text form of a cell under `column`. Conversion percentages always carry
/// one decimal digit, so `25.0` stays `25.0`.
pub fn render_cell(column: &str, cell: &Cell) -> String {
    match cell {
        Cell::Float(v) if column.ends_with(columns::CONVERSION) => format!("{:.1}", v),
        other => other.to_string(),
    }
}

fn cell_json(cell: &Cell) -> Value {
    match cell {
        Cell::Null => Value::Null,
        Cell::Int(v) => Value::from(*v),
        Cell::Float(v) => Value::from(*v),
        Cell::Text(s) => Value::from(s.as_str()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> WideTable {
        WideTable::new(
            vec!["Ecode".into(), "Ageing".into(), "June_Con.%".into()],
            vec![
                vec![Cell::text("E1"), Cell::text("0-3 M"), Cell::Float(86.8)],
                vec![Cell::text("E2"), Cell::Null, Cell::Null],
            ],
        )
    }

    #[test]
    fn test_lookup_by_identifier_and_column() {
        let table = sample();
        assert_eq!(table.get(0, "June_Con.%"), Some(&Cell::Float(86.8)));
        assert_eq!(table.get(5, "Ecode"), None);
        assert_eq!(table.row_for("E2").map(|r| r[1].clone()), Some(Cell::Null));
    }

    #[test]
    fn test_csv_writes_nulls_as_empty() {
        let mut buffer = Vec::new();
        sample().write_csv(&mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        assert_eq!(text, "Ecode,Ageing,June_Con.%\nE1,0-3 M,86.8\nE2,,\n");
    }

    #[test]
    fn test_csv_keeps_one_decimal_on_whole_percentages() {
        let table = WideTable::new(
            vec!["Ecode".into(), "June_APE".into(), "June_Con.%".into(), "Con.%".into()],
            vec![vec![Cell::text("E1"), Cell::Int(100), Cell::Float(25.0), Cell::Float(0.0)]],
        );
        let mut buffer = Vec::new();
        table.write_csv(&mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        assert_eq!(text, "Ecode,June_APE,June_Con.%,Con.%\nE1,100,25.0,0.0\n");
        assert_eq!(render_cell("June_APE", &Cell::Float(25.0)), "25");
    }

    #[test]
    fn test_json_keeps_column_order() {
        let json = sample().to_json();
        assert_eq!(
            serde_json::to_string(&json).unwrap(),
            r#"[{"Ecode":"E1","Ageing":"0-3 M","June_Con.%":86.8},{"Ecode":"E2","Ageing":null,"June_Con.%":null}]"#
        );
    }
}
