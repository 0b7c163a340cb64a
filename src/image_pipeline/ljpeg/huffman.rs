//! Huffman decode tree built from a JPEG DHT code-length vector.

use super::bit_reader::BitReader;
use super::error::LjpegError;

/// Longest difference a lossless JPEG symbol can announce.
pub const MAX_DIFF_BITS: u8 = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Node {
    /// Child node indices for bit 0 and bit 1; 0 means no code continues there.
    Branch([u16; 2]),
    Leaf(u8),
}

/// Flattened binary decode tree. Node 0 is the root.
#[derive(Debug, Clone)]
pub struct HuffmanTable {
    nodes: Vec<Node>,
}

impl HuffmanTable {
    /// Builds the tree for table `id` from `counts[i]` codes of length `i + 1`
    /// and the symbols in code order.
    ///
    /// Codes are assigned canonically, so a length vector that needs more
    /// codes than fit at some length (and would make one code a prefix of
    /// another) is rejected, as is any symbol above 16.
    pub fn from_dht(id: usize, counts: &[u8; 16], symbols: &[u8]) -> Result<Self, LjpegError> {
        let total: usize = counts.iter().map(|&n| n as usize).sum();
        if total == 0 {
            return Err(LjpegError::BadTable {
                table: id,
                detail: "no codes".into(),
            });
        }
        if symbols.len() < total {
            return Err(LjpegError::BadTable {
                table: id,
                detail: format!("{} codes but only {} symbols", total, symbols.len()),
            });
        }

        let mut table = Self {
            nodes: vec![Node::Branch([0, 0])],
        };
        let mut code = 0u32;
        let mut next_symbol = symbols.iter();
        for (i, &count) in counts.iter().enumerate() {
            let len = i as u32 + 1;
            for _ in 0..count {
                if code >= 1 << len {
                    return Err(LjpegError::BadTable {
                        table: id,
                        detail: format!("too many codes of length {len}"),
                    });
                }
                let symbol = *next_symbol.next().ok_or(LjpegError::BadTable {
                    table: id,
                    detail: "symbol list exhausted".into(),
                })?;
                if symbol > MAX_DIFF_BITS {
                    return Err(LjpegError::BadTable {
                        table: id,
                        detail: format!("symbol {symbol} is outside 0..=16"),
                    });
                }
                table.insert(id, code, len, symbol)?;
                code += 1;
            }
            code <<= 1;
        }
        Ok(table)
    }

    fn insert(&mut self, id: usize, code: u32, len: u32, symbol: u8) -> Result<(), LjpegError> {
        let collision = || LjpegError::BadTable {
            table: id,
            detail: format!("code {code:0width$b} collides with a shorter code", width = len as usize),
        };
        let mut node = 0usize;
        for depth in (0..len).rev() {
            let bit = ((code >> depth) & 1) as usize;
            let Node::Branch(children) = self.nodes[node] else {
                return Err(collision());
            };
            let child = children[bit] as usize;
            if depth == 0 {
                if child != 0 {
                    return Err(collision());
                }
                self.nodes.push(Node::Leaf(symbol));
            } else if child == 0 {
                self.nodes.push(Node::Branch([0, 0]));
            } else {
                node = child;
                continue;
            }
            let index = (self.nodes.len() - 1) as u16;
            if let Node::Branch(children) = &mut self.nodes[node] {
                children[bit] = index;
            }
            node = index as usize;
        }
        Ok(())
    }

    /// Walks the tree from the root one bit at a time and returns the
    /// difference length stored at the leaf.
    #[inline]
    pub fn decode(&self, reader: &mut BitReader<'_>) -> Result<u8, LjpegError> {
        let mut node = 0usize;
        loop {
            match self.nodes[node] {
                Node::Leaf(symbol) => return Ok(symbol),
                Node::Branch(children) => {
                    let next = children[reader.get_bit()?] as usize;
                    if next == 0 {
                        return Err(LjpegError::InvalidCode);
                    }
                    node = next;
                }
            }
        }
    }
}
