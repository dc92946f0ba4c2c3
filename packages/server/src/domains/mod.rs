// Business domains
pub mod epub;
