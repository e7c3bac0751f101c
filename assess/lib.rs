#![deny(unused_variables)]
#![deny(dead_code)]
#![deny(unused_imports)]

pub mod features;
pub mod form;
pub mod handle;
pub mod model;
pub mod panels;
pub mod render;
