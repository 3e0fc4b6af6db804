// ============ Model capability traits (crate-internal) ============

pub(crate) mod capabilities;

// ============ Model implementations ============

pub(crate) mod llama3_2;
pub(crate) mod modernbert;
pub(crate) mod qwen3;

// Public size enums (for builder entry points and type annotations)
pub use llama3_2::{Llama3_2, Llama3_2Size};
pub use modernbert::ModernBertSize;
pub use qwen3::{Qwen3, Qwen3Size};
