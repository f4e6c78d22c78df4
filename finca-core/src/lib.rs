pub mod collection;
pub mod config;
pub mod editor;
pub mod error;
pub mod kv;
pub mod models;
pub mod recovery;
pub mod relations;
pub mod roles;
pub mod session;

// Re-export commonly used types
pub use collection::{remove_at, upsert_at, CollectionStore, LoadOutcome, LoadStatus};
pub use config::{get_config_dir, get_config_path, AppConfig};
pub use editor::{CollectionEditor, EditorState};
pub use error::{AuthError, FincaError, KvError};
pub use kv::{
    create_backend, BackendType, FileBackend, KeyValueStore, MemoryBackend, SqliteBackend,
};
pub use models::{
    CollectionKey, Crop, CropForm, Farm, Plot, Record, Role, User, Variety, AREA_UNITS,
    DEFAULT_PLOT_AREA_UNIT, FARM_AREA_UNITS, PREDEFINED_ROLES, RICE_TYPES,
};
pub use recovery::{request_password_reset, RecoveryTicket};
pub use relations::{
    apply_farm_rename, cascade_farm_rename, crops_for_plot, dangling_crop_plots,
    dangling_references, filter_by_foreign_key, plots_for_farm, FarmRename, SoftReference,
};
pub use roles::{next_role_name, RoleForm};
pub use session::{LoginResponse, Session, SessionClient};
