pub mod category;
pub mod department;
pub mod token;

pub use category::CategoryRepository;
pub use department::DepartmentRepository;
pub use token::TokenRepository;
