use std::path::Path;

use comfy_table::{Cell, Table};

use crate::columns::SheetType;
use crate::error::Result;
use crate::importer::relevant_sheet_names;

pub fn run(cost: &Path) -> Result<()> {
    let names = relevant_sheet_names(cost)?;
    if names.is_empty() {
        println!("No Listing, Display or affiliate sheets in {}", cost.display());
        return Ok(());
    }
    println!("{}", format_sheets(&names));
    Ok(())
}

pub fn format_sheets(names: &[String]) -> String {
    let mut table = Table::new();
    table.set_header(vec!["Sheet", "Type", "Date column", "Labels"]);
    for name in names {
        let sheet_type = SheetType::from_sheet_name(name);
        let labels: Vec<&str> = sheet_type.columns().iter().map(|(label, _)| *label).collect();
        table.add_row(vec![
            Cell::new(name),
            Cell::new(sheet_type),
            Cell::new(sheet_type.date_offset()),
            Cell::new(labels.join(", ")),
        ]);
    }
    table.to_string()
}
