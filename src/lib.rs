pub mod config;
pub mod containers;
pub mod dispatch;
pub mod error;
pub mod external;
pub mod io_support;
pub mod tree;
pub mod xfs;

pub use config::{BuildConfig, DiskSize, ImageFormat, NetworkConfig};
pub use dispatch::build;
pub use error::BuildError;
pub use external::{Logger, PackageReader, Progress};
pub use tree::{FileTree, Node, NodeId, NodeKind};
