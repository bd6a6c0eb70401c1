use super::block::Block;
use crate::error::Result;
use crate::persistence::Persistence;

/// Walks the chain from a starting hash back to genesis.
///
/// The walk ends at the first hash the store does not know, which is the empty
/// `prev_hash` of the genesis block. A storage or decode error is yielded once
/// and ends the walk.
pub struct ChainIterator<'a> {
    persistence: &'a dyn Persistence,
    current_hash: Vec<u8>,
    finished: bool,
}

impl<'a> ChainIterator<'a> {
    pub fn new(persistence: &'a dyn Persistence, start: Vec<u8>) -> Self {
        Self {
            persistence,
            current_hash: start,
            finished: false,
        }
    }

    fn advance(&mut self) -> Result<Option<Block>> {
        let serialized = match self.persistence.get_block(&self.current_hash)? {
            Some(serialized) => serialized,
            None => return Ok(None),
        };
        let block = Block::deserialize(&serialized)?;
        self.current_hash = block.prev_hash.clone();
        Ok(Some(block))
    }
}

impl Iterator for ChainIterator<'_> {
    type Item = Result<Block>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        match self.advance() {
            Ok(Some(block)) => Some(Ok(block)),
            Ok(None) => {
                self.finished = true;
                None
            }
            Err(e) => {
                self.finished = true;
                Some(Err(e))
            }
        }
    }
}

impl std::iter::FusedIterator for ChainIterator<'_> {}

/// A fixed tip over a store. Reads through one snapshot see one chain even if
/// the ledger is appended to meanwhile.
#[derive(Clone)]
pub struct ChainSnapshot<'a> {
    persistence: &'a dyn Persistence,
    tip: Vec<u8>,
}

impl<'a> ChainSnapshot<'a> {
    pub fn new(persistence: &'a dyn Persistence, tip: Vec<u8>) -> Self {
        Self { persistence, tip }
    }

    pub fn iter(&self) -> ChainIterator<'a> {
        ChainIterator::new(self.persistence, self.tip.clone())
    }
}
