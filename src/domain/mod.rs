// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust types that describe the sentiment task itself:
// what a labelled row is, how raw label values map onto the
// classifier's output classes, and what a prediction carries.
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO file I/O or network calls
//   - Only plain Rust structs, enums, and traits
//
// Reference: Rust Book §5 (Structs), §10 (Traits)

// A labelled row of the corpus and the label space built from it
pub mod record;

// The output of classifying one text
pub mod prediction;

// Core abstractions (traits) that other layers implement
pub mod traits;
