use std::io::Write;
use walrus::*;

use crate::segment::Offset;
use crate::Error;

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct SegmentInfo {
    /// `None` for a passive segment.
    pub memory: Option<usize>,
    /// `None` for a passive segment or a non-constant offset.
    pub offset: Option<u64>,
    pub size: usize,
    pub zero_bytes: usize,
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct DataInfo {
    pub memories: usize,
    pub size: usize,
    pub zero_bytes: usize,
    pub segments: Vec<SegmentInfo>,
}

pub fn data_info(m: &Module) -> DataInfo {
    let segments: Vec<_> = m
        .data
        .iter()
        .map(|d| {
            let (memory, offset) = match &d.kind {
                DataKind::Active { memory, offset } => {
                    (Some(memory.index()), Offset::from_const_expr(offset).address())
                }
                DataKind::Passive => (None, None),
            };
            SegmentInfo {
                memory,
                offset,
                size: d.value.len(),
                zero_bytes: d.value.iter().filter(|b| **b == 0).count(),
            }
        })
        .collect();
    DataInfo {
        memories: m.memories.iter().count(),
        size: segments.iter().map(|s| s.size).sum(),
        zero_bytes: segments.iter().map(|s| s.zero_bytes).sum(),
        segments,
    }
}

/// Print a summary of the data segments of the Wasm module
pub fn info(m: &Module, output: &mut dyn Write) -> Result<(), Error> {
    let data = data_info(m);
    writeln!(output, "Number of memories: {}", data.memories)?;
    writeln!(output, "Number of data sections: {}", data.segments.len())?;
    writeln!(output, "Size of data sections: {} bytes", data.size)?;
    writeln!(output, "Zero bytes in data sections: {}", data.zero_bytes)?;
    if !data.segments.is_empty() {
        writeln!(output)?;
    }
    for (i, s) in data.segments.iter().enumerate() {
        let location = match (s.memory, s.offset) {
            (None, _) => "passive".to_string(),
            (Some(memory), Some(offset)) => format!("memory {memory} at {offset}"),
            (Some(memory), None) => format!("memory {memory} at dynamic offset"),
        };
        writeln!(
            output,
            "Data section {i}: {location}, {} bytes ({} zero)",
            s.size, s.zero_bytes
        )?;
    }
    Ok(())
}

#[cfg(feature = "serde")]
pub fn info_json(m: &Module, output: &mut dyn Write) -> Result<(), Error> {
    serde_json::to_writer_pretty(&mut *output, &data_info(m))?;
    writeln!(output)?;
    Ok(())
}
