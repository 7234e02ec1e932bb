use crate::types::{CcResult, DifferentialPick, EventPair};
use std::collections::HashMap;
use std::io::Write;

/// All accepted picks for one event pair
#[derive(Debug, Clone)]
pub struct PairBlock {
    pub pair: EventPair,
    pub picks: Vec<DifferentialPick>,
}

/// Format like `% .4f`: leading space for non-negative values
pub fn format_signed(value: f64) -> String {
    if value.is_sign_negative() {
        format!("{:.4}", value)
    } else {
        format!(" {:.4}", value)
    }
}

/// Collects pair blocks in first-seen order and writes `xcordata.txt`
///
/// A pair seen again replaces its earlier block in place, so its output
/// position is where it was first encountered.
#[derive(Debug, Default)]
pub struct DifferentialTimeAssembler {
    blocks: Vec<PairBlock>,
    positions: HashMap<EventPair, usize>,
    replaced: usize,
}

impl DifferentialTimeAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a block; non-canonical pairs (id_a >= id_b) are ignored.
    /// Returns false when the block was ignored.
    pub fn insert(&mut self, block: PairBlock) -> bool {
        if !block.pair.is_canonical() {
            log::debug!("Skipping symmetric pair {}", block.pair);
            return false;
        }
        match self.positions.get(&block.pair) {
            Some(&pos) => {
                log::debug!("Pair {} seen again, replacing earlier record", block.pair);
                self.blocks[pos] = block;
                self.replaced += 1;
            }
            None => {
                self.positions.insert(block.pair, self.blocks.len());
                self.blocks.push(block);
            }
        }
        true
    }

    pub fn blocks(&self) -> &[PairBlock] {
        &self.blocks
    }

    /// Pairs that overwrote an earlier record of themselves
    pub fn replaced(&self) -> usize {
        self.replaced
    }

    pub fn pick_count(&self) -> usize {
        self.blocks.iter().map(|b| b.picks.len()).sum()
    }

    /// Write every block; empty blocks still get their header line
    pub fn write_to<W: Write>(&self, writer: &mut W) -> CcResult<()> {
        for block in &self.blocks {
            write_block(writer, block)?;
        }
        Ok(())
    }
}

/// `# idA idB 0.000` header, then one line per pick
pub fn write_block<W: Write>(writer: &mut W, block: &PairBlock) -> CcResult<()> {
    writeln!(writer, "# {} {} 0.000", block.pair.id_a, block.pair.id_b)?;
    for pick in &block.picks {
        writeln!(
            writer,
            "{:<4} {} {:.4} {}",
            pick.station,
            format_signed(pick.time),
            pick.quality,
            pick.phase
        )?;
    }
    Ok(())
}
