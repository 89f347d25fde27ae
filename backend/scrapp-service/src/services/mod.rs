/// Business logic layer
pub mod accounts;
pub mod chat;
pub mod classifier;
pub mod label_catalog;
pub mod preprocess;
pub mod trash_model;

pub use accounts::AccountService;
pub use chat::{ChatProvider, DisposalChatService, GeminiClient};
pub use classifier::{ClassificationResult, ClassificationService};
pub use trash_model::{OnnxTrashModel, TrashModel};
