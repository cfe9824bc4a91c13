pub mod dispatch;
pub mod model;
pub mod registry;
pub mod session;
pub mod system_prompt;
pub mod tools;
pub mod validator;

pub use dispatch::{DispatchLoop, DispatchSettings, TurnOutcome, UnknownToolPolicy};
pub use model::{GenaiConversation, ModelConversation, ModelReply};
pub use registry::ToolRegistry;
pub use session::{ConversationSession, ToolCallRequest, ToolCallResult, Turn};
pub use tools::ToolExecutor;
pub use validator::{check_call, ToolInvocation};
