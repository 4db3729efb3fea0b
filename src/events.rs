// Event types for async communication

use crate::api::ApiError;

#[derive(Debug)]
pub enum AppEvent {
    /// A chat request finished, with the reply or the reason it failed
    ReplyReceived(Result<String, ApiError>),
    /// A clear request finished
    ClearFinished(Result<(), ApiError>),
}
