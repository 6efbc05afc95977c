//! Operation contexts handed from an open call to the stream it creates.

mod op;
mod read;

pub use op::OpContext;
pub use read::{ReadOpContext, ReadOpContextBuilder};
