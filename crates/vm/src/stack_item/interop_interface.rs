//! Opaque host handle carried on the stack.

/// An opaque blob owned by the host. The VM never interprets the bytes;
/// two handles are equal only when they are the same allocation.
#[derive(Debug, PartialEq, Eq)]
pub struct InteropInterface {
    data: Box<[u8]>,
}

impl InteropInterface {
    pub fn new(data: impl Into<Box<[u8]>>) -> Self {
        Self { data: data.into() }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }
}
