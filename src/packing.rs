use std::ops::Range;
use tracing::{debug, info};
use walrus::*;

use crate::segment::Segment;
use crate::utils::*;
use crate::Error;

/// Smaller than this is not worth it, every new segment costs its own offset and length.
pub const DEFAULT_MIN_SEGMENT: usize = 16;

#[derive(Clone, Copy, Debug)]
pub struct Config {
    /// Zero runs at least this long are dropped by splitting the segment around them.
    pub min_segment: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            min_segment: DEFAULT_MIN_SEGMENT,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct PackStats {
    pub segments_before: usize,
    pub segments_after: usize,
    pub bytes_before: usize,
    pub bytes_after: usize,
    pub memories_skipped: usize,
}

pub fn trim_trailing_zeros(data: &[u8]) -> &[u8] {
    let len = data.iter().rposition(|b| *b != 0).map_or(0, |i| i + 1);
    &data[..len]
}

/// Chunks of `data` worth keeping. `data` is expected to be trimmed already.
///
/// Leading zeros of every chunk are skipped. A zero run shorter than `min_segment`
/// between two data bytes is kept inside the chunk; a longer one ends it.
pub fn split_runs(data: &[u8], min_segment: usize) -> Vec<Range<usize>> {
    let mut chunks = Vec::new();
    let mut start = 0;
    while start < data.len() {
        while start < data.len() && data[start] == 0 {
            start += 1;
        }
        let mut end = start;
        while end < data.len() && data[end] != 0 {
            end += 1;
        }
        // `next - end` is the length of the zero run after the last data byte
        let mut next = end;
        while next < data.len() && next - end < min_segment {
            if data[next] != 0 {
                end = next + 1;
            }
            next += 1;
        }
        if end != start {
            chunks.push(start..end);
        }
        start = next;
    }
    chunks
}

pub fn pack_segment(segment: &Segment, config: &Config) -> Vec<Segment> {
    let data = trim_trailing_zeros(&segment.data);
    if !segment.offset.is_const() {
        return vec![Segment::new(segment.offset.clone(), data.to_vec())];
    }
    let chunks: Option<Vec<_>> = split_runs(data, config.min_segment)
        .into_iter()
        .map(|range| {
            let offset = segment.offset.shifted(range.start)?;
            Some(Segment::new(offset, data[range].to_vec()))
        })
        .collect();
    // a chunk past the top of the address space has no offset; keep the segment whole
    chunks.unwrap_or_else(|| vec![Segment::new(segment.offset.clone(), data.to_vec())])
}

pub fn pack_segments(segments: &[Segment], config: &Config) -> Vec<Segment> {
    segments
        .iter()
        .flat_map(|seg| pack_segment(seg, config))
        .collect()
}

/// Pack the active data segments of every memory in the module.
///
/// A memory is left alone when one of its active segments is named by
/// `memory.init`/`data.drop`, or when two of its constant-offset segments overlap.
pub fn pack_memory(m: &mut Module, config: &Config) -> PackStats {
    let mut stats = PackStats::default();
    let referenced = get_referenced_data_ids(m);
    let memories: Vec<_> = m.memories.iter().map(|mem| mem.id()).collect();
    for memory_id in memories {
        let (ids, segments): (Vec<_>, Vec<_>) =
            get_active_segments(m, memory_id).into_iter().unzip();
        let bytes: usize = segments.iter().map(|s| s.data.len()).sum();
        stats.segments_before += segments.len();
        stats.bytes_before += bytes;
        if ids.iter().any(|id| referenced.contains(id)) {
            debug!(memory = memory_id.index(), "segment used by bulk memory instruction, skipping");
            stats.memories_skipped += 1;
            stats.segments_after += segments.len();
            stats.bytes_after += bytes;
            continue;
        }
        if has_overlap(&segments) {
            debug!(memory = memory_id.index(), "overlapping segments, skipping");
            stats.memories_skipped += 1;
            stats.segments_after += segments.len();
            stats.bytes_after += bytes;
            continue;
        }

        let packed = pack_segments(&segments, config);
        stats.segments_after += packed.len();
        stats.bytes_after += packed.iter().map(|s| s.data.len()).sum::<usize>();

        for id in ids {
            m.data.delete(id);
            m.memories.get_mut(memory_id).data_segments.remove(&id);
        }
        for seg in packed {
            let kind = DataKind::Active {
                memory: memory_id,
                offset: seg.offset.to_const_expr(),
            };
            let id = m.data.add(kind, seg.data);
            m.memories.get_mut(memory_id).data_segments.insert(id);
        }
    }
    info!(
        segments_before = stats.segments_before,
        segments_after = stats.segments_after,
        bytes_before = stats.bytes_before,
        bytes_after = stats.bytes_after,
        "packed data segments"
    );
    stats
}

pub fn pack(wasm: &[u8], config: &Config) -> Result<Vec<u8>, Error> {
    let mut m = parse_wasm(wasm, true)?;
    pack_memory(&mut m, config);
    Ok(m.emit_wasm())
}
