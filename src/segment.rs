use walrus::ir::Value;
use walrus::ConstExpr;

/// Where a data segment is written when the module is instantiated.
#[derive(Clone, Debug)]
pub enum Offset {
    I32(i32),
    /// Offset of a segment targeting a 64-bit memory.
    I64(i64),
    /// Any offset that is not a literal, e.g. `global.get $base`.
    Dynamic(ConstExpr),
}

impl Offset {
    pub fn from_const_expr(expr: &ConstExpr) -> Self {
        match expr {
            ConstExpr::Value(Value::I32(v)) => Offset::I32(*v),
            ConstExpr::Value(Value::I64(v)) => Offset::I64(*v),
            other => Offset::Dynamic(other.clone()),
        }
    }

    pub fn to_const_expr(&self) -> ConstExpr {
        match self {
            Offset::I32(v) => ConstExpr::Value(Value::I32(*v)),
            Offset::I64(v) => ConstExpr::Value(Value::I64(*v)),
            Offset::Dynamic(expr) => expr.clone(),
        }
    }

    pub fn is_const(&self) -> bool {
        !matches!(self, Offset::Dynamic(_))
    }

    /// The constant offset as an unsigned address.
    pub fn address(&self) -> Option<u64> {
        match self {
            Offset::I32(v) => Some(*v as u32 as u64),
            Offset::I64(v) => Some(*v as u64),
            Offset::Dynamic(_) => None,
        }
    }

    /// Offset `delta` bytes past this one, as an unsigned address in the offset's
    /// own width. `None` for a dynamic offset or when the address overflows.
    pub fn shifted(&self, delta: usize) -> Option<Offset> {
        match self {
            Offset::I32(v) => {
                let delta = u32::try_from(delta).ok()?;
                Some(Offset::I32((*v as u32).checked_add(delta)? as i32))
            }
            Offset::I64(v) => {
                let delta = u64::try_from(delta).ok()?;
                Some(Offset::I64((*v as u64).checked_add(delta)? as i64))
            }
            Offset::Dynamic(_) => None,
        }
    }
}

fn value_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::I32(a), Value::I32(b)) => a == b,
        (Value::I64(a), Value::I64(b)) => a == b,
        (Value::F32(a), Value::F32(b)) => a.to_bits() == b.to_bits(),
        (Value::F64(a), Value::F64(b)) => a.to_bits() == b.to_bits(),
        (Value::V128(a), Value::V128(b)) => a == b,
        _ => false,
    }
}

fn const_expr_eq(a: &ConstExpr, b: &ConstExpr) -> bool {
    match (a, b) {
        (ConstExpr::Value(a), ConstExpr::Value(b)) => value_eq(a, b),
        (ConstExpr::Global(a), ConstExpr::Global(b)) => a == b,
        (ConstExpr::RefFunc(a), ConstExpr::RefFunc(b)) => a == b,
        (ConstExpr::RefNull(a), ConstExpr::RefNull(b)) => a == b,
        _ => false,
    }
}

impl PartialEq for Offset {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Offset::I32(a), Offset::I32(b)) => a == b,
            (Offset::I64(a), Offset::I64(b)) => a == b,
            (Offset::Dynamic(a), Offset::Dynamic(b)) => const_expr_eq(a, b),
            _ => false,
        }
    }
}

impl std::fmt::Display for Offset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.address() {
            Some(addr) => write!(f, "{addr}"),
            None => write!(f, "dynamic"),
        }
    }
}

/// An active data segment: `data` is copied to `offset` at instantiation.
#[derive(Clone, Debug, PartialEq)]
pub struct Segment {
    pub offset: Offset,
    pub data: Vec<u8>,
}

impl Segment {
    pub fn new(offset: Offset, data: Vec<u8>) -> Self {
        Segment { offset, data }
    }

    /// Address range `[start, end)` covered by a constant-offset segment.
    /// The end may lie past the top of a 64-bit address space.
    pub fn range(&self) -> Option<std::ops::Range<u128>> {
        let start = self.offset.address()? as u128;
        Some(start..start + self.data.len() as u128)
    }
}
