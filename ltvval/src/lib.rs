#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]
#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]
#![cfg_attr(not(feature = "std"), no_std)]

pub mod builder;
pub mod environment;
pub mod ltv;
pub mod model;
pub mod revocation;
pub mod source;
pub mod util;

extern crate alloc;

// order of pub use statements below is intended to assure the list emitted by cargo doc on the main
// index.html page is in alphabetical order.
pub use crate::builder::*;
pub use crate::environment::*;
pub use crate::ltv::*;
pub use crate::model::*;
pub use crate::revocation::*;
pub use crate::{source::*, util::*};
