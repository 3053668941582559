pub mod backing;
