/// Data layer: archive decoding, IDX parsing, loading, and filtering.
///
/// Architecture:
/// ```text
///  t10k-labels-idx1-ubyte.gz   t10k-images-idx3-ubyte.gz
///        │                           │
///        ▼                           ▼
///   ┌──────────┐               ┌──────────┐
///   │ archive  │  gunzip       │ archive  │
///   └──────────┘               └──────────┘
///        │                           │
///        ▼                           ▼
///   ┌──────────┐               ┌──────────┐
///   │   idx    │  labels       │   idx    │  feature vectors
///   └──────────┘               └──────────┘
///        └──────────┬────────────────┘
///                   ▼
///             ┌──────────┐
///             │  loader   │  count alignment, limit → Dataset
///             └──────────┘
///                   │
///                   ▼
///             ┌──────────┐
///             │  filter   │  visible labels → filtered indices
///             └──────────┘
/// ```

pub mod archive;
pub mod filter;
pub mod idx;
pub mod loader;
pub mod model;
