pub mod cache;
pub mod http;
pub mod memory;
pub mod session;
pub mod watcher;

pub use cache::{CachedAgent, FallbackCache, FlushReport};
pub use http::HttpAgentClient;
pub use memory::MemoryRepository;
pub use session::{EditorSession, SaveOutcome};
pub use watcher::{ExecutionWatcher, WatchHandle};
