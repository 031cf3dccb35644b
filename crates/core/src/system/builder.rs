// LabWired - Firmware Simulation Platform
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::system::imx23::Imx23Board;
use std::path::Path;
use tracing::info;

/// Builds a board from a chip descriptor path.
/// If no path is provided, returns the built-in i.MX23 board.
pub fn build_board(chip_path: Option<&Path>) -> anyhow::Result<Imx23Board> {
    let board = if let Some(chip_path) = chip_path {
        info!("Loading chip descriptor: {:?}", chip_path);
        let chip = imx23_config::ChipDescriptor::from_file(chip_path)?;
        Imx23Board::from_config(&chip)?
    } else {
        info!("Using default hardware configuration");
        Imx23Board::new()?
    };

    Ok(board)
}
