//! Wire-level pieces of the remote protocol: hex helpers, the `$…#cc`
//! framing codec, thread-id syntax, and typed stop replies.

pub mod frame;
pub mod hex;
pub mod stop_reply;
pub mod thread_id;
