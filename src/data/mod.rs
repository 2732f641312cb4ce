/// Data layer: schema resolution, typed datasets and loading.
///
/// Architecture:
/// ```text
///  path / rows / JSON
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  classify input → DataSource
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  schema   │  overrides + width → Vec<Attribute>
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  builder  │  type every cell → immutable Dataset
///   └──────────┘
/// ```
///
/// File paths skip schema and builder here; the engine parses them.

pub mod builder;
pub mod loader;
pub mod model;
pub mod schema;
