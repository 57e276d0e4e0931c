//! Hand-encoded Wasm modules for exercising the packer against walrus.

use crate::segment::Segment;

fn uleb(out: &mut Vec<u8>, mut v: u64) {
    loop {
        let byte = (v & 0x7f) as u8;
        v >>= 7;
        if v == 0 {
            out.push(byte);
            return;
        }
        out.push(byte | 0x80);
    }
}

fn sleb(out: &mut Vec<u8>, mut v: i64) {
    loop {
        let byte = (v & 0x7f) as u8;
        v >>= 7;
        let done = (v == 0 && byte & 0x40 == 0) || (v == -1 && byte & 0x40 != 0);
        if done {
            out.push(byte);
            return;
        }
        out.push(byte | 0x80);
    }
}

fn section(out: &mut Vec<u8>, id: u8, payload: &[u8]) {
    out.push(id);
    uleb(out, payload.len() as u64);
    out.extend_from_slice(payload);
}

enum Placement {
    Const(i64),
    /// `global.get` of the imported `env.base`.
    Global,
    Passive,
}

pub(crate) struct ModuleBuilder {
    memory: bool,
    memory64: bool,
    drop_data: Option<u32>,
    segments: Vec<(Placement, Vec<u8>)>,
}

impl ModuleBuilder {
    pub fn new() -> Self {
        ModuleBuilder {
            memory: true,
            memory64: false,
            drop_data: None,
            segments: Vec::new(),
        }
    }

    pub fn without_memory() -> Self {
        ModuleBuilder {
            memory: false,
            ..Self::new()
        }
    }

    /// Declares a 64-bit memory; constant offsets become `i64.const`.
    pub fn memory64() -> Self {
        ModuleBuilder {
            memory64: true,
            ..Self::new()
        }
    }

    pub fn segment(mut self, offset: i64, data: &[u8]) -> Self {
        self.segments.push((Placement::Const(offset), data.to_vec()));
        self
    }

    pub fn dynamic_segment(mut self, data: &[u8]) -> Self {
        self.segments.push((Placement::Global, data.to_vec()));
        self
    }

    pub fn passive_segment(mut self, data: &[u8]) -> Self {
        self.segments.push((Placement::Passive, data.to_vec()));
        self
    }

    /// Adds a function executing `data.drop` on segment `index`.
    pub fn drop_data(mut self, index: u32) -> Self {
        self.drop_data = Some(index);
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut out = b"\0asm".to_vec();
        out.extend_from_slice(&[1, 0, 0, 0]);
        if !self.memory {
            return out;
        }
        if self.drop_data.is_some() {
            section(&mut out, 1, &[1, 0x60, 0, 0]);
        }
        if self
            .segments
            .iter()
            .any(|(placement, _)| matches!(placement, Placement::Global))
        {
            let mut imports = vec![1];
            imports.push(3);
            imports.extend_from_slice(b"env");
            imports.push(4);
            imports.extend_from_slice(b"base");
            let index_type = if self.memory64 { 0x7e } else { 0x7f };
            imports.extend_from_slice(&[0x03, index_type, 0x00]);
            section(&mut out, 2, &imports);
        }
        if self.drop_data.is_some() {
            section(&mut out, 3, &[1, 0]);
        }
        let limits = if self.memory64 { 0x04 } else { 0x00 };
        section(&mut out, 5, &[1, limits, 1]);
        if let Some(index) = self.drop_data {
            let mut count = Vec::new();
            uleb(&mut count, self.segments.len() as u64);
            section(&mut out, 12, &count);
            let mut body = vec![0x00, 0xfc, 0x09];
            uleb(&mut body, index as u64);
            body.push(0x0b);
            let mut code = vec![1];
            uleb(&mut code, body.len() as u64);
            code.extend_from_slice(&body);
            section(&mut out, 10, &code);
        }
        let mut data = Vec::new();
        uleb(&mut data, self.segments.len() as u64);
        for (placement, bytes) in self.segments.iter() {
            match placement {
                Placement::Const(offset) => {
                    data.push(0x00);
                    data.push(if self.memory64 { 0x42 } else { 0x41 });
                    sleb(&mut data, *offset);
                    data.push(0x0b);
                }
                Placement::Global => data.extend_from_slice(&[0x00, 0x23, 0x00, 0x0b]),
                Placement::Passive => data.push(0x01),
            }
            uleb(&mut data, bytes.len() as u64);
            data.extend_from_slice(bytes);
        }
        section(&mut out, 11, &data);
        out
    }
}

/// Memory contents after writing constant-offset `segments` into `size` zero bytes.
pub(crate) fn memory_image(segments: &[Segment], size: usize) -> Vec<u8> {
    let mut memory = vec![0; size];
    for seg in segments {
        let start = seg.offset.address().expect("constant offset") as usize;
        memory[start..start + seg.data.len()].copy_from_slice(&seg.data);
    }
    memory
}
