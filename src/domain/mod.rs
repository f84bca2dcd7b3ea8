//! Domain layer: strong types with validation and invariants (no I/O).

mod validation;
mod value;

pub use validation::ValidationError;
pub use value::{
    CountryCode, MessageText, PhoneNumber, SEGMENT_FIRST, SEGMENT_NEXT, segment_count,
};
