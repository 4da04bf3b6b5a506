mod push;

pub use push::{finish, push};
