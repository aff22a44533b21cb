mod link;

pub use link::interpret;
