use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

/// Creates a new `comfy_table::Table` with standard styling.
pub fn new_styled_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

/// Creates a styled header cell for a table.
pub fn header_cell(text: &str) -> Cell {
    Cell::new(text)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

/// Right-aligned numeric cell.
pub fn rate_cell(text: String) -> Cell {
    Cell::new(text).set_alignment(CellAlignment::Right)
}

/// Formats a rate with precision scaled to its magnitude, so both satoshi
/// fractions and large fiat quotes stay readable.
pub fn format_rate(rate: f64) -> String {
    if rate < 0.001 {
        format!("{rate:.8}")
    } else if rate < 1.0 {
        format!("{rate:.6}")
    } else if rate < 1000.0 {
        format!("{rate:.4}")
    } else {
        format!("{rate:.2}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_rate_scales_precision() {
        assert_eq!(format_rate(0.0000168), "0.00001680");
        assert_eq!(format_rate(0.85), "0.850000");
        assert_eq!(format_rate(144.2), "144.2000");
        assert_eq!(format_rate(59337.21), "59337.21");
    }
}
