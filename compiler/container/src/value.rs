/// A single runtime value.
///
/// String values hold an index into the owning string table rather than the
/// text itself. Values are plain copies; there is no aliasing between stack
/// slots and variable bindings.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Value {
    Int(i32),
    Float(f32),
    Bool(bool),
    Str(u16),
}

impl Default for Value {
    fn default() -> Self {
        Value::Int(0)
    }
}

impl Value {
    /// True for the int and float cases, which participate in arithmetic.
    pub fn is_numeric(self) -> bool {
        matches!(self, Value::Int(_) | Value::Float(_))
    }

    /// Numeric widening used by mixed int/float arithmetic.
    /// Non-numeric values widen to zero.
    pub fn as_f32(self) -> f32 {
        match self {
            Value::Int(v) => v as f32,
            Value::Float(v) => v,
            Value::Bool(_) | Value::Str(_) => 0.0,
        }
    }

    /// The type tag used by state dumps.
    pub fn type_name(self) -> &'static str {
        match self {
            Value::Int(_) => "INT",
            Value::Float(_) => "FLOAT",
            Value::Bool(_) => "BOOL",
            Value::Str(_) => "STRING",
        }
    }
}
