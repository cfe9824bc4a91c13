pub mod callback_listener;
pub mod credentials;
pub mod flow;
pub mod secret_channel;

pub use callback_listener::{CallbackHandle, CallbackListener};
pub use credentials::{OAuthClientConfig, OAuthToken};
pub use flow::{AuthorizationFlow, FlowSettings, FlowState};
pub use secret_channel::{secret_channel, ChannelOutcome, SecretPublisher, SecretWaiter};
