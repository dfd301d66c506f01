pub mod form;
pub mod product;
pub mod user;

pub use form::{slugify, FormField, FormSchema, FormSubmission};
pub use product::{Dashboard, Product, Sale};
pub use user::User;
