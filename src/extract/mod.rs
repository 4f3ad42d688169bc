pub mod fields;
pub mod page;
pub mod selectors;
pub mod validate;

pub use fields::RawListing;
pub use page::SearchPage;
pub use validate::Validator;
