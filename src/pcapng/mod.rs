//! Contains the PcapNg parser, reader and writer

pub mod blocks;
pub use blocks::{Block, BlockType, PcapNgBlock, RawBlock};

pub(crate) mod header_group;
pub use header_group::*;

pub(crate) mod reader;
pub use reader::*;

pub(crate) mod writer;
pub use writer::*;
