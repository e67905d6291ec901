pub mod request;
pub mod rest;
