pub mod element_ref;

pub use element_ref::{ElementRef, same_object};
