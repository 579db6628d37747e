use crate::grid::Grid;

/// Symbol rows for the grid, top row first.
pub fn drawing(grid: &Grid) -> Vec<Vec<char>> {
    grid.rows()
        .map(|row| row.iter().map(|c| c.symbol()).collect())
        .collect()
}

/// Plain-text frame: one line per row, cells separated by a space.
pub fn render_text(grid: &Grid) -> String {
    let lines: Vec<String> = grid
        .rows()
        .map(|row| {
            let symbols: Vec<String> = row.iter().map(|c| c.symbol().to_string()).collect();
            symbols.join(" ")
        })
        .collect();
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Cell;
    use crate::pos::Pos;

    #[test]
    fn renders_symbols() {
        let mut grid = Grid::new(2);
        grid.set(Pos::new(1, 1), Cell::Head);
        grid.set(Pos::new(1, 2), Cell::Body);
        grid.set(Pos::new(2, 2), Cell::Fruit);

        let rows = drawing(&grid);
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[1], vec!['#', '&', '*', '#']);

        let text = render_text(&grid);
        assert_eq!(text, "# # # #\n# & * #\n#   @ #\n# # # #");
    }
}
