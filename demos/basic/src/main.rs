//! Plays one game of Core with the simplest possible strategy.
//!
//! Run with: `BOAI_USERNAME=... BOAI_PASSWORD=... cargo run -p basic`

use battleofai::prelude::*;

const FREE: &str = "#";

/// Places a stone on the first free cell, scanning row by row.
fn first_free_cell(board: &Board, _symbol: Symbol) -> Option<(usize, usize)> {
    for (x, row) in board.as_array()?.iter().enumerate() {
        for (y, cell) in row.as_array()?.iter().enumerate() {
            if cell.as_str() == Some(FREE) {
                return Some((x, y));
            }
        }
    }
    None
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    battleofai::logging::init();

    let client = Client::new(ClientConfig::from_env())?;
    client.on_turn(None, first_free_cell);

    match client.play(Core, SessionConfig::default())? {
        Some(true) => println!("won"),
        Some(false) => println!("lost"),
        None => println!("no winner"),
    }
    Ok(())
}
