pub mod books;
pub mod setup;

pub use books::{BookImagesRow, BookRepository, BookRepositoryTrait};
pub use setup::setup_database;
