use std::collections::HashSet;
use std::path::Path;
use walrus::ir::*;
use walrus::*;

use crate::segment::{Offset, Segment};
use crate::Error;

pub fn parse_wasm(wasm: &[u8], keep_name_section: bool) -> Result<Module, Error> {
    let mut config = ModuleConfig::new();
    config.generate_name_section(keep_name_section);
    config.generate_producers_section(false);
    config
        .parse(wasm)
        .map_err(|e| Error::WasmParse(e.to_string()))
}

pub fn parse_wasm_file<P: AsRef<Path>>(file: P, keep_name_section: bool) -> Result<Module, Error> {
    let wasm = std::fs::read(file)?;
    parse_wasm(&wasm, keep_name_section)
}

/// Active data segments written into `memory`, in module order.
pub fn get_active_segments(m: &Module, memory: MemoryId) -> Vec<(DataId, Segment)> {
    m.data
        .iter()
        .filter_map(|d| match &d.kind {
            DataKind::Active {
                memory: data_memory_id,
                offset,
            } if *data_memory_id == memory => Some((
                d.id(),
                Segment::new(Offset::from_const_expr(offset), d.value.clone()),
            )),
            _ => None,
        })
        .collect()
}

struct DataRefs(HashSet<DataId>);
impl<'instr> Visitor<'instr> for DataRefs {
    fn visit_instr(&mut self, instr: &'instr Instr, _: &'instr InstrLocId) {
        match instr {
            Instr::MemoryInit(MemoryInit { data, .. }) | Instr::DataDrop(DataDrop { data, .. }) => {
                self.0.insert(*data);
            }
            _ => {}
        }
    }
}

/// Data segments named by `memory.init` or `data.drop` in any local function.
pub fn get_referenced_data_ids(m: &Module) -> HashSet<DataId> {
    let mut refs = DataRefs(HashSet::new());
    for (_, func) in m.funcs.iter_local() {
        dfs_in_order(&mut refs, func, func.entry_block());
    }
    refs.0
}

/// True if any two constant-offset segments write to a common address.
pub fn has_overlap(segments: &[Segment]) -> bool {
    let mut ranges: Vec<_> = segments
        .iter()
        .filter_map(Segment::range)
        .filter(|r| !r.is_empty())
        .collect();
    ranges.sort_by_key(|r| r.start);
    ranges.windows(2).any(|w| w[1].start < w[0].end)
}
