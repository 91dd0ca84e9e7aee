pub mod ai;
pub mod api;
pub mod context;
pub mod error;
pub mod image;
pub mod mru;
pub mod plugin;
pub mod preview;
pub mod query;
pub mod result;
pub mod settings;

pub use ai::{ChatStreamDataType, ChatStreamFunc, Conversation, ConversationRole};
pub use api::PublicAPI;
pub use context::Context;
pub use error::PluginError;
pub use image::{WoxImage, WoxImageType};
pub use mru::{MRUData, MRURestoreFunc};
pub use plugin::{Plugin, PluginInitParams};
pub use preview::{WoxPreview, WoxPreviewType};
pub use query::{ChangeQueryParam, Query, QueryEnv, QueryType, Selection, SelectionType};
pub use result::{
    ActionContext, ActionFunc, QueryResult, RefreshFunc, RefreshableResult, ResultAction,
    ResultTail, ResultTailType, UpdatableResult, UpdatableResultAction,
};
pub use settings::{
    DeepLinkFunc, DynamicSettingFunc, MetadataCommand, PluginSettingDefinitionItem,
    PluginSettingDefinitionType, SettingChangedFunc, UnloadFunc,
};
