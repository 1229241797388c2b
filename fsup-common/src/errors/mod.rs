//! Extended-code catalog for the fsup step handler.
//!
//! Every failure outcome carries a stable numeric extended code the
//! out-of-band controller can read back from the `errorState` stamp.
//!
//! # Code ranges
//!
//! | Range      | Phase       |
//! |------------|-------------|
//! | E001-E099  | Common      |
//! | E100-E199  | Download    |
//! | E200-E299  | Install     |
//! | E300-E399  | Apply       |
//! | E400-E499  | Cancel      |
//! | E500-E599  | IsInstalled |

pub mod catalog;

pub use catalog::{ErrorCategory, ExtendedCode};
