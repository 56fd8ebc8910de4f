//! Database entities

pub mod department;
pub mod employee;

pub use department::Entity as Department;
pub use employee::Entity as Employee;

pub mod prelude {
    pub use super::department::Entity as Department;
    pub use super::employee::Entity as Employee;
}
