pub mod files;
pub mod preferences;
pub mod session_log;
pub mod store;

pub use files::{
    atomic_write, ensure_dir, get_data_dir, init_local_data_dir, read_file, JsonFileStore,
    DATA_DIR_NAME, STORE_FILE_NAME,
};
pub use preferences::{
    load_completion_popup, load_filter, save_completion_popup, save_filter,
    CompletionPopupPreference, COMPLETION_POPUP_KEY,
};
pub use session_log::{SessionLogStore, LOGS_KEY};
pub use store::{KeyValueStore, MemoryStore, StoreChange};
