mod schema;
mod validate;

pub use schema::*;
pub use validate::*;
