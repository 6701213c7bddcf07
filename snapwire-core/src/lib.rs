/*!
# Snapwire Core

Self-describing binary codec for nested key/value documents, plus a
directory-backed snapshot store built on it.

- Compact length prefixes with an escape range for control markers
- A bijective type registry mapping value kinds to one-byte wire ids
- Scalar payloads written as text and zlib-compressed when that helps
- Best-effort decoding that keeps the readable prefix of a damaged container
- Timestamp-named snapshot files with nearest-time lookup and pruning

## Architecture

[`Writer`] and [`Reader`] walk a value tree, consulting the
[`TypeRegistry`] for each value's wire id and handing the value bytes to the
handler for its [`ValueKind`]. [`Codec`] owns a registry and a
[`CompressionAdapter`] and is what most callers use. [`SnapshotStore`] adds
file naming, lookup, and pruning on top.

## Usage

```rust,no_run
use snapwire_core::{Mapping, SnapshotStore, StoreConfig, Value};

let store = SnapshotStore::open(StoreConfig::with_dir("./snapshot"))?;

let mut doc = Mapping::new();
doc.insert("a".to_string(), Value::from(1));
store.dump(&doc)?;

let restored = store.load(None)?;
assert_eq!(restored, doc);
# Ok::<(), snapwire_core::SnapwireError>(())
```
*/

pub mod codec;
pub mod compression;
pub mod config;
pub mod error;
pub mod framing;
mod handlers;
pub mod observability;
pub mod reader;
pub mod registry;
pub mod snapshot;
pub mod value;
pub mod writer;

pub use codec::Codec;
pub use compression::{CompressionAdapter, NoCompression, ZlibCompressor};
pub use config::{CompressionSetting, StoreConfig};
pub use error::{BindingKey, Result, SnapwireError};
pub use framing::Marker;
pub use observability::init_observability;
pub use reader::Reader;
pub use registry::{TypeBinding, TypeRegistry};
pub use snapshot::{SnapshotFile, SnapshotStore};
pub use value::{Mapping, Value, ValueKind};
pub use writer::Writer;

#[cfg(feature = "metrics")]
pub use observability::SnapwireMetrics;
