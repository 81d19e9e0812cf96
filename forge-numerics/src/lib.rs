//! Symbolic numerals and frames for the ForgeNumerics-S interchange format.
//!
//! Values travel as runs of trit glyphs (see [`numeral`]) grouped into
//! self-delimiting [`frame::Frame`]s made of an ordered header and an ordered
//! payload. The crate is pure: no I/O, no global state, every function is
//! safe to call from any number of threads.
//!
//! ```
//! use forge_numerics::frame::{Frame, canonicalize, parse, serialize};
//! use forge_numerics::numeral::NumeralToken;
//!
//! let frame = Frame::new()
//!     .with_header("TYPE", "VECTOR")
//!     .with_payload(NumeralToken::from(42u64))
//!     .with_payload(NumeralToken::from(9u64));
//! let text = serialize(&frame);
//! assert_eq!(text, "≛[TYPE][VECTOR]⁝⦙⊙⊙⊗⊗Φ⊙⋅⊙⊙⊗⊙⊙∎");
//! assert_eq!(parse(&text).unwrap(), frame);
//! assert_eq!(canonicalize(&text).unwrap(), text);
//! ```
#![allow(clippy::manual_is_multiple_of)]

pub mod frame;
pub mod numeral;
pub mod utils;

pub use frame::{Frame, Token, canonicalize, is_canonical, parse, serialize};
pub use numeral::{NumeralToken, NumeralValue, Profile, decode_profile, encode_profile};
pub use utils::{ForgeError, ForgeResult};
