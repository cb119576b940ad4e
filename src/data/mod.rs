/// Data layer: table types, loading, and validation.
///
/// Architecture:
/// ```text
///  .parquet / .json / .csv        arrow RecordBatch
///        │                               │
///        ▼                               │
///   ┌──────────┐                         │
///   │  loader   │  parse file ───────────┤
///   └──────────┘                         ▼
///                                  ┌──────────┐
///                                  │  Frame    │  named columns, aligned rows
///                                  └──────────┘
///                                        │
///                                        ▼
///                                  ┌──────────┐
///                                  │ validate  │  numeric / factor checks
///                                  └──────────┘
/// ```

pub mod loader;
pub mod model;
pub mod validate;
