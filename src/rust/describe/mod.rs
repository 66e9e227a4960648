//! Sign descriptions: a remote chat completion backend and a local template
//! generator that needs no network.

mod chat;
mod templates;

pub use chat::{ChatCompletionClient, DescriptionError};
pub use templates::{
    describe_sign, describe_sign_now, is_unrecognized, speed_limit, SignCategory,
    UNRECOGNIZED_DESCRIPTION,
};
