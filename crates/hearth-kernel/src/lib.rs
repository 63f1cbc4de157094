//! Application-kernel lifecycle: bootstrap, reload, plugin composition, and
//! managed configuration for a long-running host.

pub mod bus;
pub mod codec;
pub mod composer;
pub mod config;
pub mod context;
pub mod error;
pub mod lifecycle;
pub mod logging;
pub mod modules;
pub mod paths;
pub mod restart;
pub mod store;
pub mod stub;
pub mod system_info;
pub mod transport;
pub mod watch;
pub mod write_guard;

#[cfg(any(feature = "test-fixtures", test))]
pub mod fixtures;

pub use bus::{KernelNotification, NotificationBus, NotificationKind, NotificationListener};
pub use codec::DocumentCodec;
pub use config::{HostOptions, ServerConfiguration};
pub use context::KernelContext;
pub use error::KernelError;
pub use lifecycle::{LifecycleBuilder, LifecycleController, LifecycleHooks};
pub use modules::{ComposedParts, ModuleRegistry, RestService, ServerPlugin, WebSocketListener};
pub use paths::ApplicationPaths;
pub use restart::{RestartCoordinator, RestartHost};
pub use store::{ConfigStore, LoadOutcome, load_round_trip};
pub use system_info::SystemInfoSnapshot;
pub use transport::{TransportManager, TransportRegistry};
pub use watch::DirectoryWatcher;
pub use write_guard::{FileWriteGuard, ItemRef, ItemRepository};
