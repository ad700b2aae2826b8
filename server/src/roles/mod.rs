pub mod assignment;
pub mod crud;
pub mod permissions;
pub mod seed;
